//! Environment lookup for Kubernetes connection overrides

use std::fmt;

/// Name of an environment variable consulted during config resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EnvKey(&'static str);

impl EnvKey {
    pub const fn new(key: &'static str) -> Self {
        Self(key)
    }

    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for EnvKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Kubernetes master address override
pub const K8S_MASTER_IP_ENV_KEY: EnvKey = EnvKey::new("SMART_STORAGE_K8S_MASTER");

/// Kubeconfig path override
pub const KUBE_CONFIG_ENV_KEY: EnvKey = EnvKey::new("SMART_STORAGE_KUBE_CONFIG");

/// Port for reading configuration keys from the environment
pub trait EnvLookup: Send + Sync {
    /// Value of `key`, or an empty string when unset
    fn get(&self, key: EnvKey) -> String;
}

/// Reads from the process environment
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvLookup for ProcessEnv {
    fn get(&self, key: EnvKey) -> String {
        std::env::var(key.as_str()).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_key_is_empty() {
        let key = EnvKey::new("SMART_STORAGE_TEST_SURELY_UNSET_KEY");
        assert_eq!(ProcessEnv.get(key), "");
    }

    #[test]
    fn test_key_display() {
        assert_eq!(K8S_MASTER_IP_ENV_KEY.to_string(), "SMART_STORAGE_K8S_MASTER");
        assert_eq!(KUBE_CONFIG_ENV_KEY.as_str(), "SMART_STORAGE_KUBE_CONFIG");
    }
}
