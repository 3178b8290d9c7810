//! Plugin configuration and role

use crate::kubernetes::KubeClient;
use std::fmt;

/// Canonical name this driver registers with Kubernetes
pub const DRIVER_NAME: &str = "csi.storage.billyronks.io";

/// Default CSI endpoint
pub const DEFAULT_ENDPOINT: &str = "unix:///var/lib/csi/sockets/pluginproxy/csi.sock";

// =============================================================================
// Plugin Role
// =============================================================================

/// Operating mode of the plugin process
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PluginRole {
    /// Cluster-wide volume orchestration
    Controller,
    /// Per-host volume duties
    Node,
    /// Any other value; the driver serves identity only
    Unrecognized(String),
}

impl From<&str> for PluginRole {
    fn from(value: &str) -> Self {
        match value.trim() {
            "controller" => PluginRole::Controller,
            "node" => PluginRole::Node,
            other => PluginRole::Unrecognized(other.to_string()),
        }
    }
}

impl fmt::Display for PluginRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PluginRole::Controller => write!(f, "controller"),
            PluginRole::Node => write!(f, "node"),
            PluginRole::Unrecognized(value) => write!(f, "{}", value),
        }
    }
}

// =============================================================================
// Plugin Configuration
// =============================================================================

/// Configuration for the CSI plugin
#[derive(Debug, Clone)]
pub struct PluginConfig {
    /// Name reported in plugin info
    pub driver_name: String,
    /// Vendor version reported in plugin info
    pub version: String,
    /// Endpoint the server host listens on
    pub endpoint: String,
    /// Identifier of the node this process runs on
    pub node_id: String,
    /// Controller or node
    pub role: PluginRole,
    /// Resolve Kubernetes config from the pod's service account
    pub in_cluster: bool,
    /// Explicit kubeconfig path, overriding every other source
    pub kubeconfig_path: Option<String>,
    /// Volume limit advertised by the node service, 0 for unlimited
    pub max_volumes_per_node: i64,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            driver_name: DRIVER_NAME.to_string(),
            version: crate::VERSION.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            node_id: String::new(),
            role: PluginRole::Unrecognized(String::new()),
            in_cluster: false,
            kubeconfig_path: None,
            max_volumes_per_node: 0,
        }
    }
}

impl PluginConfig {
    /// Kubernetes client configured from this plugin's options
    pub fn kube_client(&self) -> KubeClient {
        let mut builder = KubeClient::builder();
        if self.in_cluster {
            builder = builder.in_cluster();
        }
        if let Some(path) = &self.kubeconfig_path {
            builder = builder.kubeconfig_path(path.clone());
        }
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_from_str() {
        assert_eq!(PluginRole::from("controller"), PluginRole::Controller);
        assert_eq!(PluginRole::from(" node "), PluginRole::Node);
        assert_eq!(
            PluginRole::from("Controller"),
            PluginRole::Unrecognized("Controller".into())
        );
        assert_eq!(PluginRole::from(""), PluginRole::Unrecognized(String::new()));
    }

    #[test]
    fn test_role_display_round_trips() {
        for role in ["controller", "node", "unexpected-value"] {
            assert_eq!(PluginRole::from(role).to_string(), role);
        }
    }

    #[test]
    fn test_default_config() {
        let config = PluginConfig::default();
        assert_eq!(config.driver_name, "csi.storage.billyronks.io");
        assert!(config.endpoint.starts_with("unix://"));
        assert!(!config.in_cluster);
    }

    #[test]
    fn test_kube_client_options() {
        let config = PluginConfig {
            in_cluster: true,
            kubeconfig_path: Some("/etc/kube/config".into()),
            ..Default::default()
        };
        let kube = config.kube_client();
        assert!(kube.is_in_cluster());
        assert_eq!(kube.kubeconfig_path(), "/etc/kube/config");

        let kube = PluginConfig::default().kube_client();
        assert!(!kube.is_in_cluster());
        assert_eq!(kube.kubeconfig_path(), "");
    }
}
