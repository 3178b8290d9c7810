//! Identity service
//!
//! Common to controller and node plugins: registration, capability
//! negotiation and probing.

use super::capabilities::ACCESS_MODES_VERSION;
use super::DriverContext;
use crate::domain::ports::{IdentityService, PluginCapability, PluginInfo, ProbeResponse};
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Identity handler bound to a driver
pub struct IdentityServer {
    context: Arc<DriverContext>,
}

impl IdentityServer {
    pub fn new(context: Arc<DriverContext>) -> Result<Self> {
        if context.config.driver_name.trim().is_empty() {
            return Err(Error::HandlerConstruction {
                handler: "identity".to_string(),
                reason: "driver name is empty".to_string(),
            });
        }
        Ok(Self { context })
    }
}

#[async_trait]
impl IdentityService for IdentityServer {
    async fn get_plugin_info(&self) -> Result<PluginInfo> {
        let mut manifest = BTreeMap::new();
        manifest.insert("role".to_string(), self.context.config.role.to_string());
        manifest.insert(
            "access_modes_version".to_string(),
            ACCESS_MODES_VERSION.to_string(),
        );

        Ok(PluginInfo {
            name: self.context.config.driver_name.clone(),
            vendor_version: self.context.config.version.clone(),
            manifest,
        })
    }

    async fn get_plugin_capabilities(&self) -> Result<Vec<PluginCapability>> {
        Ok(vec![PluginCapability::ControllerService])
    }

    async fn probe(&self) -> Result<ProbeResponse> {
        // Ready once a typed client can be built; nothing is sent to the API server
        match self.context.kube.clientset().await {
            Ok(_) => {
                debug!("Probe succeeded");
                Ok(ProbeResponse { ready: true })
            }
            Err(e) => {
                warn!("Probe failed: {}", e);
                Ok(ProbeResponse { ready: false })
            }
        }
    }
}
