//! Controller service

use super::DriverContext;
use crate::domain::ports::{AccessMode, ControllerCapability, ControllerService, ValidationResult};
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// Controller RPCs this plugin advertises
pub const CONTROLLER_CAPABILITIES: &[ControllerCapability] = &[
    ControllerCapability::CreateDeleteVolume,
    ControllerCapability::ExpandVolume,
];

/// Controller handler bound to a driver
pub struct ControllerServer {
    context: Arc<DriverContext>,
}

impl ControllerServer {
    pub fn new(context: Arc<DriverContext>) -> Result<Self> {
        Ok(Self { context })
    }
}

#[async_trait]
impl ControllerService for ControllerServer {
    async fn controller_get_capabilities(&self) -> Result<Vec<ControllerCapability>> {
        Ok(CONTROLLER_CAPABILITIES.to_vec())
    }

    async fn validate_volume_capabilities(
        &self,
        volume_id: &str,
        modes: &[AccessMode],
    ) -> Result<ValidationResult> {
        if volume_id.trim().is_empty() {
            return Err(Error::InvalidArgument("volume id is missing".to_string()));
        }
        if modes.is_empty() {
            return Err(Error::InvalidArgument(format!(
                "no volume capabilities given for volume {}",
                volume_id
            )));
        }

        if let Some(unsupported) = modes
            .iter()
            .find(|mode| !self.context.access_modes.contains(mode))
        {
            return Ok(ValidationResult {
                confirmed: None,
                message: format!("unsupported access mode: {}", unsupported),
            });
        }

        Ok(ValidationResult {
            confirmed: Some(modes.to_vec()),
            message: String::new(),
        })
    }
}
