//! Node service

use super::DriverContext;
use crate::domain::ports::{NodeCapability, NodeInfo, NodeService};
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// Node RPCs this plugin advertises
pub const NODE_CAPABILITIES: &[NodeCapability] = &[
    NodeCapability::StageUnstageVolume,
    NodeCapability::GetVolumeStats,
];

/// Node handler bound to a driver
pub struct NodeServer {
    context: Arc<DriverContext>,
}

impl NodeServer {
    /// Fails when no node id is configured; the controller side cannot
    /// place volumes on an anonymous node.
    pub fn new(context: Arc<DriverContext>) -> Result<Self> {
        if context.config.node_id.trim().is_empty() {
            return Err(Error::HandlerConstruction {
                handler: "node".to_string(),
                reason: "node id is empty".to_string(),
            });
        }
        Ok(Self { context })
    }
}

#[async_trait]
impl NodeService for NodeServer {
    async fn node_get_info(&self) -> Result<NodeInfo> {
        Ok(NodeInfo {
            node_id: self.context.config.node_id.clone(),
            max_volumes_per_node: self.context.config.max_volumes_per_node,
        })
    }

    async fn node_get_capabilities(&self) -> Result<Vec<NodeCapability>> {
        Ok(NODE_CAPABILITIES.to_vec())
    }
}
