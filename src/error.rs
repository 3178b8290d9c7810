//! Error types for the Smart Storage CSI plugin
//!
//! Provides structured error types for the bootstrap layer: Kubernetes
//! config resolution, client construction, driver assembly and the
//! server host.

use std::fmt;
use thiserror::Error;

/// Kind of Kubernetes client handle being built
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientKind {
    /// Typed clientset
    Typed,
    /// Dynamic (untyped) client
    Dynamic,
}

impl fmt::Display for ClientKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientKind::Typed => write!(f, "failed to get kubernetes clientset"),
            ClientKind::Dynamic => write!(f, "failed to get dynamic client"),
        }
    }
}

/// Unified error type for the plugin
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Internal Errors
    // =========================================================================
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    // =========================================================================
    // Kubernetes Config Errors
    // =========================================================================
    #[error(
        "failed to get kubernetes config: missing ENV: atleast one should be set: {{{master_key}}} or {{{config_key}}}"
    )]
    ConfigMissing {
        master_key: String,
        config_key: String,
    },

    #[error("{context}: {source}")]
    Resolution {
        context: String,
        #[source]
        source: Box<Error>,
    },

    #[error("failed to get kubernetes config: {operation}: nil client was provided")]
    NilReceiver { operation: String },

    #[error("In-cluster config error: {0}")]
    InClusterConfig(#[from] kube::config::InClusterError),

    #[error("Kubeconfig error: {0}")]
    Kubeconfig(#[from] kube::config::KubeconfigError),

    #[error("Invalid master address {address}: {reason}")]
    InvalidMasterAddress { address: String, reason: String },

    // =========================================================================
    // Kubernetes Client Errors
    // =========================================================================
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    #[error(
        "{kind}: failed to build client from resolved config: IsInCluster {{{in_cluster}}}: KubeConfigPath {{{kubeconfig_path}}}: {source}"
    )]
    ClientConstruction {
        kind: ClientKind,
        in_cluster: bool,
        kubeconfig_path: String,
        #[source]
        source: Box<Error>,
    },

    // =========================================================================
    // Driver Errors
    // =========================================================================
    #[error("Failed to construct {handler} handler: {reason}")]
    HandlerConstruction { handler: String, reason: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // =========================================================================
    // Server Errors
    // =========================================================================
    #[error("Invalid endpoint {endpoint}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("Server error: {0}")]
    Server(String),

    // =========================================================================
    // Parse / IO Errors
    // =========================================================================
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Wrap this error with one layer of call-site context
    pub fn context(self, context: impl Into<String>) -> Self {
        Error::Resolution {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Check if this error stems from startup configuration rather than
    /// from a collaborator failing at runtime
    pub fn is_configuration(&self) -> bool {
        match self {
            Error::Configuration(_)
            | Error::ConfigMissing { .. }
            | Error::NilReceiver { .. }
            | Error::InvalidMasterAddress { .. }
            | Error::InvalidEndpoint { .. }
            | Error::Kubeconfig(_)
            | Error::InClusterConfig(_) => true,
            Error::Resolution { source, .. } | Error::ClientConstruction { source, .. } => {
                source.is_configuration()
            }
            _ => false,
        }
    }
}

/// Result type alias for the plugin
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_missing_names_both_keys() {
        let err = Error::ConfigMissing {
            master_key: "SMART_STORAGE_K8S_MASTER".into(),
            config_key: "SMART_STORAGE_KUBE_CONFIG".into(),
        };
        assert_eq!(
            err.to_string(),
            "failed to get kubernetes config: missing ENV: atleast one should be set: \
             {SMART_STORAGE_K8S_MASTER} or {SMART_STORAGE_KUBE_CONFIG}"
        );
    }

    #[test]
    fn test_client_kind_prefix() {
        let err = Error::ClientConstruction {
            kind: ClientKind::Typed,
            in_cluster: false,
            kubeconfig_path: "/etc/kube/config".into(),
            source: Box::new(Error::Internal("no runtime".into())),
        };
        assert_eq!(
            err.to_string(),
            "failed to get kubernetes clientset: failed to build client from resolved config: \
             IsInCluster {false}: KubeConfigPath {/etc/kube/config}: Internal error: no runtime"
        );

        let err = Error::Configuration("boom".into()).context(format!(
            "{}: failed to get kubernetes config",
            ClientKind::Dynamic
        ));
        assert_eq!(
            err.to_string(),
            "failed to get dynamic client: failed to get kubernetes config: Configuration error: boom"
        );
    }

    #[test]
    fn test_is_configuration() {
        assert!(Error::Configuration("bad".into()).is_configuration());
        assert!(Error::Configuration("bad".into())
            .context("resolving")
            .is_configuration());
        assert!(!Error::Server("down".into()).is_configuration());
        assert!(!Error::HandlerConstruction {
            handler: "node".into(),
            reason: "nope".into(),
        }
        .is_configuration());
    }
}
