//! Domain Ports - Core trait definitions for the CSI plugin
//!
//! These traits define the boundaries between the bootstrap layer and the
//! protocol handlers / transport it wires together. Adapters implement
//! these traits to provide concrete functionality.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

// =============================================================================
// Access Modes
// =============================================================================

/// Volume access modes as understood by the CSI protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccessMode {
    Unknown,
    SingleNodeWriter,
    SingleNodeReaderOnly,
    MultiNodeReaderOnly,
    MultiNodeSingleWriter,
    MultiNodeMultiWriter,
}

impl std::fmt::Display for AccessMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccessMode::Unknown => write!(f, "UNKNOWN"),
            AccessMode::SingleNodeWriter => write!(f, "SINGLE_NODE_WRITER"),
            AccessMode::SingleNodeReaderOnly => write!(f, "SINGLE_NODE_READER_ONLY"),
            AccessMode::MultiNodeReaderOnly => write!(f, "MULTI_NODE_READER_ONLY"),
            AccessMode::MultiNodeSingleWriter => write!(f, "MULTI_NODE_SINGLE_WRITER"),
            AccessMode::MultiNodeMultiWriter => write!(f, "MULTI_NODE_MULTI_WRITER"),
        }
    }
}

// =============================================================================
// Identity Types
// =============================================================================

/// Plugin name and version reported during registration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginInfo {
    pub name: String,
    pub vendor_version: String,
    #[serde(default)]
    pub manifest: BTreeMap<String, String>,
}

/// Plugin-level capabilities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PluginCapability {
    ControllerService,
    VolumeAccessibilityConstraints,
}

/// Result of a readiness probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeResponse {
    pub ready: bool,
}

// =============================================================================
// Controller / Node Types
// =============================================================================

/// Controller RPC capabilities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControllerCapability {
    CreateDeleteVolume,
    PublishUnpublishVolume,
    ExpandVolume,
}

/// Node RPC capabilities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeCapability {
    StageUnstageVolume,
    ExpandVolume,
    GetVolumeStats,
}

/// Outcome of validating requested access modes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// Requested modes, echoed back only when every one is supported
    pub confirmed: Option<Vec<AccessMode>>,
    pub message: String,
}

/// Node identity reported to the controller side
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeInfo {
    pub node_id: String,
    pub max_volumes_per_node: i64,
}

// =============================================================================
// Handler Ports
// =============================================================================

/// Role-independent identity service: registration, capabilities, probing
#[async_trait]
pub trait IdentityService: Send + Sync {
    async fn get_plugin_info(&self) -> Result<PluginInfo>;

    async fn get_plugin_capabilities(&self) -> Result<Vec<PluginCapability>>;

    async fn probe(&self) -> Result<ProbeResponse>;
}

/// Cluster-wide controller service
#[async_trait]
pub trait ControllerService: Send + Sync {
    async fn controller_get_capabilities(&self) -> Result<Vec<ControllerCapability>>;

    async fn validate_volume_capabilities(
        &self,
        volume_id: &str,
        modes: &[AccessMode],
    ) -> Result<ValidationResult>;
}

/// Per-host node service
#[async_trait]
pub trait NodeService: Send + Sync {
    async fn node_get_info(&self) -> Result<NodeInfo>;

    async fn node_get_capabilities(&self) -> Result<Vec<NodeCapability>>;
}

pub type IdentityServiceRef = Arc<dyn IdentityService>;
pub type ControllerServiceRef = Arc<dyn ControllerService>;
pub type NodeServiceRef = Arc<dyn NodeService>;

// =============================================================================
// Server Host Port
// =============================================================================

/// Handlers a server host exposes; absent handlers are simply not served
#[derive(Clone)]
pub struct HandlerSet {
    pub identity: IdentityServiceRef,
    pub controller: Option<ControllerServiceRef>,
    pub node: Option<NodeServiceRef>,
}

/// Non-blocking server that serves a handler set on an endpoint
#[async_trait]
pub trait ServerHost: Send + Sync {
    /// Bind the endpoint and start serving. Returns once the listener is up.
    async fn start(&self, endpoint: &str, handlers: HandlerSet) -> Result<()>;

    /// Block until the server terminates
    async fn wait(&self) -> Result<()>;

    /// Request a graceful shutdown
    fn stop(&self);
}
