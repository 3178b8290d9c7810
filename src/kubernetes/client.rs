//! Kubernetes Client
//!
//! Decides how to reach the Kubernetes API server and turns that decision
//! into client handles.
//!
//! Resolution priority for [`KubeClient::config`]:
//!
//! 1. `in_cluster` flag set: in-cluster discovery, nothing else consulted
//! 2. either environment override non-blank: build from the overrides
//! 3. otherwise: in-cluster discovery as the default
//!
//! [`KubeClient::config_for_path_or_default`] puts an explicit kubeconfig
//! path ahead of all three.

use super::discovery::{
    ClientFactory, ConfigDiscoverer, DynamicClient, KubeClientFactory, KubeConfigDiscoverer,
};
use super::env::{EnvLookup, ProcessEnv, KUBE_CONFIG_ENV_KEY, K8S_MASTER_IP_ENV_KEY};
use crate::error::{ClientKind, Error, Result};
use kube::{Client, Config};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

// =============================================================================
// Client
// =============================================================================

/// Resolves Kubernetes configs and builds client handles
///
/// Stateless: every call re-resolves and re-constructs.
#[derive(Clone)]
pub struct KubeClient {
    in_cluster: bool,
    kubeconfig_path: String,
    discoverer: Arc<dyn ConfigDiscoverer>,
    env: Arc<dyn EnvLookup>,
    clients: Arc<dyn ClientFactory>,
}

impl fmt::Debug for KubeClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KubeClient")
            .field("in_cluster", &self.in_cluster)
            .field("kubeconfig_path", &self.kubeconfig_path)
            .finish_non_exhaustive()
    }
}

impl Default for KubeClient {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl KubeClient {
    /// Client with production dependencies and no options set
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> KubeClientBuilder {
        KubeClientBuilder::default()
    }

    pub fn is_in_cluster(&self) -> bool {
        self.in_cluster
    }

    pub fn kubeconfig_path(&self) -> &str {
        &self.kubeconfig_path
    }

    /// Resolve a config by flag, then environment, then in-cluster default
    pub async fn config(&self) -> Result<Config> {
        if self.in_cluster {
            debug!("Resolving kubernetes config: in-cluster flag set");
            return self.discoverer.in_cluster_config().await;
        }

        if !self.env.get(K8S_MASTER_IP_ENV_KEY).trim().is_empty()
            || !self.env.get(KUBE_CONFIG_ENV_KEY).trim().is_empty()
        {
            debug!("Resolving kubernetes config: environment overrides");
            return self.config_from_env().await;
        }

        debug!("Resolving kubernetes config: defaulting to in-cluster");
        self.discoverer.in_cluster_config().await
    }

    /// Build a config strictly from a kubeconfig path
    pub async fn config_for_path(&self, kubeconfig_path: &str) -> Result<Config> {
        self.discoverer
            .build_config_from_flags("", kubeconfig_path)
            .await
    }

    /// Explicit kubeconfig path if one was given, otherwise [`Self::config`]
    pub async fn config_for_path_or_default(&self) -> Result<Config> {
        if !self.kubeconfig_path.trim().is_empty() {
            debug!("Resolving kubernetes config: explicit path {}", self.kubeconfig_path);
            return self.config_for_path(&self.kubeconfig_path).await;
        }
        self.config().await
    }

    async fn config_from_env(&self) -> Result<Config> {
        // Re-read both keys; the environment may have changed since the
        // caller's check.
        let master = self.env.get(K8S_MASTER_IP_ENV_KEY);
        let kubeconfig = self.env.get(KUBE_CONFIG_ENV_KEY);
        if master.trim().is_empty() && kubeconfig.trim().is_empty() {
            return Err(Error::ConfigMissing {
                master_key: K8S_MASTER_IP_ENV_KEY.to_string(),
                config_key: KUBE_CONFIG_ENV_KEY.to_string(),
            });
        }
        self.discoverer
            .build_config_from_flags(&master, &kubeconfig)
            .await
    }

    /// Typed Kubernetes client
    pub async fn clientset(&self) -> Result<Client> {
        let config = self.resolve_for(ClientKind::Typed).await?;
        self.clients
            .typed(config)
            .map_err(|e| self.construction_error(ClientKind::Typed, e))
    }

    /// Dynamic Kubernetes client for arbitrary resource kinds
    pub async fn dynamic(&self) -> Result<DynamicClient> {
        let config = self.resolve_for(ClientKind::Dynamic).await?;
        self.clients
            .dynamic(config)
            .map_err(|e| self.construction_error(ClientKind::Dynamic, e))
    }

    fn construction_error(&self, kind: ClientKind, source: Error) -> Error {
        Error::ClientConstruction {
            kind,
            in_cluster: self.in_cluster,
            kubeconfig_path: self.kubeconfig_path.clone(),
            source: Box::new(source),
        }
    }

    async fn resolve_for(&self, kind: ClientKind) -> Result<Config> {
        self.config_for_path_or_default().await.map_err(|e| {
            e.context(format!(
                "{}: failed to get kubernetes config: IsInCluster {{{}}}: KubeConfigPath {{{}}}",
                kind, self.in_cluster, self.kubeconfig_path
            ))
        })
    }
}

/// Resolve a config from a possibly absent client
pub async fn get_config(client: Option<&KubeClient>) -> Result<Config> {
    match client {
        Some(client) => client.config_for_path_or_default().await,
        None => Err(Error::NilReceiver {
            operation: "get_config".to_string(),
        }),
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Builder for [`KubeClient`]
///
/// Options may be applied in any order; for the same option the last call
/// wins. Dependencies left unset are filled with the production
/// implementations once, in [`KubeClientBuilder::build`].
#[derive(Default)]
pub struct KubeClientBuilder {
    in_cluster: bool,
    kubeconfig_path: String,
    discoverer: Option<Arc<dyn ConfigDiscoverer>>,
    env: Option<Arc<dyn EnvLookup>>,
    clients: Option<Arc<dyn ClientFactory>>,
}

impl KubeClientBuilder {
    /// Point the client at the cluster it runs in
    pub fn in_cluster(mut self) -> Self {
        self.in_cluster = true;
        self
    }

    pub fn kubeconfig_path(mut self, path: impl Into<String>) -> Self {
        self.kubeconfig_path = path.into();
        self
    }

    pub fn discoverer(mut self, discoverer: Arc<dyn ConfigDiscoverer>) -> Self {
        self.discoverer = Some(discoverer);
        self
    }

    pub fn env(mut self, env: Arc<dyn EnvLookup>) -> Self {
        self.env = Some(env);
        self
    }

    pub fn client_factory(mut self, clients: Arc<dyn ClientFactory>) -> Self {
        self.clients = Some(clients);
        self
    }

    pub fn build(self) -> KubeClient {
        KubeClient {
            in_cluster: self.in_cluster,
            kubeconfig_path: self.kubeconfig_path,
            discoverer: self
                .discoverer
                .unwrap_or_else(|| Arc::new(KubeConfigDiscoverer)),
            env: self.env.unwrap_or_else(|| Arc::new(ProcessEnv)),
            clients: self.clients.unwrap_or_else(|| Arc::new(KubeClientFactory)),
        }
    }
}
