//! Config discovery and client construction ports
//!
//! The resolver never talks to the filesystem or the API server directly;
//! it goes through these ports so resolution can be exercised without a
//! live cluster.

use crate::error::{Error, Result};
use async_trait::async_trait;
use kube::api::{Api, DynamicObject};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::discovery::ApiResource;
use kube::{Client, Config};
use tracing::{debug, warn};

// =============================================================================
// Config Discovery
// =============================================================================

/// Port for obtaining a Kubernetes config
#[async_trait]
pub trait ConfigDiscoverer: Send + Sync {
    /// Config from the mounted service account of the current pod
    async fn in_cluster_config(&self) -> Result<Config>;

    /// Config from a master address and/or kubeconfig path. Either may be
    /// empty; a kubeconfig path is loaded first and the master address,
    /// when present, overrides its cluster URL.
    async fn build_config_from_flags(&self, master_url: &str, kubeconfig_path: &str)
        -> Result<Config>;
}

/// Production discoverer backed by `kube::Config`
#[derive(Debug, Clone, Copy, Default)]
pub struct KubeConfigDiscoverer;

#[async_trait]
impl ConfigDiscoverer for KubeConfigDiscoverer {
    async fn in_cluster_config(&self) -> Result<Config> {
        Ok(Config::incluster()?)
    }

    async fn build_config_from_flags(
        &self,
        master_url: &str,
        kubeconfig_path: &str,
    ) -> Result<Config> {
        let master_url = master_url.trim();
        let kubeconfig_path = kubeconfig_path.trim();

        if master_url.is_empty() && kubeconfig_path.is_empty() {
            warn!("Neither kubeconfig path nor master address was specified, using in-cluster config");
            match Config::incluster() {
                Ok(config) => return Ok(config),
                Err(e) => warn!("In-cluster config unavailable: {}", e),
            }
            return Config::infer().await.map_err(|e| {
                Error::Configuration(format!("failed to infer kubernetes config: {}", e))
            });
        }

        if kubeconfig_path.is_empty() {
            debug!("Building kubernetes config for master {}", master_url);
            return Ok(Config::new(parse_master_url(master_url, false)?));
        }

        debug!("Loading kubeconfig from {}", kubeconfig_path);
        let kubeconfig = Kubeconfig::read_from(kubeconfig_path)?;
        let mut config =
            Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default()).await?;
        if !master_url.is_empty() {
            config.cluster_url = parse_master_url(master_url, has_tls(&config))?;
        }
        Ok(config)
    }
}

/// Whether the config carries any TLS material
fn has_tls(config: &Config) -> bool {
    config.root_cert.is_some()
        || config.accept_invalid_certs
        || config.auth_info.client_certificate.is_some()
        || config.auth_info.client_certificate_data.is_some()
}

/// Parse a master address. A bare host gets https only when the config
/// it lands in carries TLS material, plain http otherwise.
fn parse_master_url(address: &str, tls: bool) -> Result<hyper::Uri> {
    let url = if address.contains("://") {
        address.to_string()
    } else if tls {
        format!("https://{}", address)
    } else {
        format!("http://{}", address)
    };
    url.parse::<hyper::Uri>()
        .map_err(|e| Error::InvalidMasterAddress {
            address: address.to_string(),
            reason: e.to_string(),
        })
}

// =============================================================================
// Client Construction
// =============================================================================

/// Dynamic client able to address any resource kind at runtime
#[derive(Clone)]
pub struct DynamicClient {
    client: Client,
}

impl DynamicClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Cluster-scoped API for the given resource
    pub fn resource(&self, resource: &ApiResource) -> Api<DynamicObject> {
        Api::all_with(self.client.clone(), resource)
    }

    /// Namespaced API for the given resource
    pub fn namespaced_resource(
        &self,
        resource: &ApiResource,
        namespace: &str,
    ) -> Api<DynamicObject> {
        Api::namespaced_with(self.client.clone(), namespace, resource)
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}

/// Port for turning a resolved config into client handles
pub trait ClientFactory: Send + Sync {
    fn typed(&self, config: Config) -> Result<Client>;

    fn dynamic(&self, config: Config) -> Result<DynamicClient>;
}

/// Production factory backed by `kube::Client`
#[derive(Debug, Clone, Copy, Default)]
pub struct KubeClientFactory;

impl ClientFactory for KubeClientFactory {
    fn typed(&self, config: Config) -> Result<Client> {
        Ok(Client::try_from(config)?)
    }

    fn dynamic(&self, config: Config) -> Result<DynamicClient> {
        Ok(DynamicClient::new(Client::try_from(config)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::io::Write;

    const KUBECONFIG: &str = r#"
apiVersion: v1
kind: Config
clusters:
- name: test
  cluster:
    server: https://10.0.0.9:6443
contexts:
- name: test
  context:
    cluster: test
    user: test
current-context: test
users:
- name: test
  user:
    token: test-token
"#;

    fn kubeconfig_file() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(KUBECONFIG.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_parse_master_url_adds_scheme() {
        let uri = parse_master_url("10.0.0.5", false).unwrap();
        assert_eq!(uri.scheme_str(), Some("http"));
        assert_eq!(uri.host(), Some("10.0.0.5"));

        let uri = parse_master_url("10.0.0.5", true).unwrap();
        assert_eq!(uri.scheme_str(), Some("https"));

        let uri = parse_master_url("http://10.0.0.5:8080", true).unwrap();
        assert_eq!(uri.scheme_str(), Some("http"));
        assert_eq!(uri.port_u16(), Some(8080));
    }

    #[test]
    fn test_parse_master_url_rejects_garbage() {
        assert_matches!(
            parse_master_url("https://bad host", false),
            Err(Error::InvalidMasterAddress { .. })
        );
    }

    #[tokio::test]
    async fn test_flags_master_only() {
        let config = KubeConfigDiscoverer
            .build_config_from_flags("10.0.0.5", "")
            .await
            .unwrap();
        assert_eq!(config.cluster_url.host(), Some("10.0.0.5"));
        assert_eq!(config.cluster_url.scheme_str(), Some("http"));
    }

    #[tokio::test]
    async fn test_flags_kubeconfig_path() {
        let file = kubeconfig_file();
        let path = file.path().to_str().unwrap();

        let config = KubeConfigDiscoverer
            .build_config_from_flags("", path)
            .await
            .unwrap();
        assert_eq!(config.cluster_url.host(), Some("10.0.0.9"));
        assert_eq!(config.cluster_url.port_u16(), Some(6443));
    }

    #[tokio::test]
    async fn test_flags_master_overrides_kubeconfig() {
        let file = kubeconfig_file();
        let path = file.path().to_str().unwrap();

        let config = KubeConfigDiscoverer
            .build_config_from_flags("https://10.0.0.5:6443", path)
            .await
            .unwrap();
        assert_eq!(config.cluster_url.host(), Some("10.0.0.5"));

        // token-only kubeconfig has no TLS material
        let config = KubeConfigDiscoverer
            .build_config_from_flags("10.0.0.5:6443", path)
            .await
            .unwrap();
        assert_eq!(config.cluster_url.scheme_str(), Some("http"));
    }

    #[tokio::test]
    async fn test_flags_bare_master_keeps_tls_from_kubeconfig() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(
            KUBECONFIG
                .replace(
                    "server: https://10.0.0.9:6443",
                    "server: https://10.0.0.9:6443\n    insecure-skip-tls-verify: true",
                )
                .as_bytes(),
        )
        .unwrap();
        let path = file.path().to_str().unwrap();

        let config = KubeConfigDiscoverer
            .build_config_from_flags("10.0.0.5:6443", path)
            .await
            .unwrap();
        assert_eq!(config.cluster_url.scheme_str(), Some("https"));
        assert_eq!(config.cluster_url.host(), Some("10.0.0.5"));
    }

    #[tokio::test]
    async fn test_flags_missing_kubeconfig_file() {
        let result = KubeConfigDiscoverer
            .build_config_from_flags("", "/nonexistent/smart-storage/kubeconfig")
            .await;
        assert_matches!(result, Err(Error::Kubeconfig(_)));
    }

    #[tokio::test]
    async fn test_client_factory_builds_without_connecting() {
        let config = Config::new("http://127.0.0.1:6443".parse().unwrap());
        assert!(KubeClientFactory.typed(config.clone()).is_ok());
        let dynamic = KubeClientFactory.dynamic(config).unwrap();
        assert_eq!(dynamic.client().default_namespace(), "default");
    }
}
