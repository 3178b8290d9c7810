//! CSI Driver Module
//!
//! Assembles the protocol handlers a plugin process exposes. The role
//! decides which handlers are live:
//!
//! - controller: identity + controller
//! - node: identity + node
//! - anything else: identity only
//!
//! The assembled set is fixed for the lifetime of the process.

pub mod capabilities;
pub mod config;
pub mod controller;
pub mod identity;
pub mod node;

pub use capabilities::*;
pub use config::*;
pub use controller::*;
pub use identity::*;
pub use node::*;

use crate::domain::ports::{
    AccessMode, ControllerServiceRef, HandlerSet, IdentityServiceRef, NodeServiceRef, ServerHost,
};
use crate::error::Result;
use crate::kubernetes::KubeClient;
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

// =============================================================================
// Driver Context
// =============================================================================

/// State shared by every handler of a driver
#[derive(Debug)]
pub struct DriverContext {
    pub config: PluginConfig,
    /// Advertised access modes
    pub access_modes: Vec<AccessMode>,
    /// Kubernetes client for downstream handler logic
    pub kube: KubeClient,
}

// =============================================================================
// Handler Factory
// =============================================================================

/// Port for constructing the protocol handlers
///
/// Any error aborts driver assembly.
pub trait HandlerFactory: Send + Sync {
    fn identity(&self, context: &Arc<DriverContext>) -> Result<IdentityServiceRef>;

    fn controller(&self, context: &Arc<DriverContext>) -> Result<ControllerServiceRef>;

    fn node(&self, context: &Arc<DriverContext>) -> Result<NodeServiceRef>;
}

/// Builds the handlers shipped with this crate
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultHandlerFactory;

impl HandlerFactory for DefaultHandlerFactory {
    fn identity(&self, context: &Arc<DriverContext>) -> Result<IdentityServiceRef> {
        Ok(Arc::new(IdentityServer::new(context.clone())?))
    }

    fn controller(&self, context: &Arc<DriverContext>) -> Result<ControllerServiceRef> {
        Ok(Arc::new(ControllerServer::new(context.clone())?))
    }

    fn node(&self, context: &Arc<DriverContext>) -> Result<NodeServiceRef> {
        Ok(Arc::new(NodeServer::new(context.clone())?))
    }
}

// =============================================================================
// CSI Driver
// =============================================================================

/// Assembled handler bundle for one plugin process
pub struct CsiDriver {
    context: Arc<DriverContext>,
    identity: IdentityServiceRef,
    controller: Option<ControllerServiceRef>,
    node: Option<NodeServiceRef>,
}

impl fmt::Debug for CsiDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CsiDriver")
            .field("driver_name", &self.context.config.driver_name)
            .field("role", &self.context.config.role)
            .field("controller", &self.controller.is_some())
            .field("node", &self.node.is_some())
            .finish_non_exhaustive()
    }
}

impl CsiDriver {
    /// Assemble with the default handlers and a client built from `config`
    pub fn new(config: PluginConfig) -> Result<Self> {
        let kube = config.kube_client();
        Self::assemble(config, kube, &DefaultHandlerFactory)
    }

    /// Assemble the handler bundle for `config.role`
    pub fn assemble(
        config: PluginConfig,
        kube: KubeClient,
        factory: &dyn HandlerFactory,
    ) -> Result<Self> {
        let access_modes = volume_access_modes();
        let context = Arc::new(DriverContext {
            config,
            access_modes,
            kube,
        });

        let mut controller = None;
        let mut node = None;
        match &context.config.role {
            PluginRole::Controller => {
                info!("Enabling controller service");
                controller = Some(factory.controller(&context)?);
            }
            PluginRole::Node => {
                info!("Enabling node service for node {}", context.config.node_id);
                node = Some(factory.node(&context)?);
            }
            PluginRole::Unrecognized(role) => {
                warn!(
                    "Unrecognized plugin role {:?}, serving identity only",
                    role
                );
            }
        }

        // Identity is role-independent: registration, capabilities and probes
        let identity = factory.identity(&context)?;

        Ok(Self {
            context,
            identity,
            controller,
            node,
        })
    }

    pub fn config(&self) -> &PluginConfig {
        &self.context.config
    }

    pub fn access_modes(&self) -> &[AccessMode] {
        &self.context.access_modes
    }

    pub fn identity(&self) -> &IdentityServiceRef {
        &self.identity
    }

    pub fn controller(&self) -> Option<&ControllerServiceRef> {
        self.controller.as_ref()
    }

    pub fn node(&self) -> Option<&NodeServiceRef> {
        self.node.as_ref()
    }

    /// Handlers to hand to a server host
    pub fn handlers(&self) -> HandlerSet {
        HandlerSet {
            identity: self.identity.clone(),
            controller: self.controller.clone(),
            node: self.node.clone(),
        }
    }

    /// Serve on the configured endpoint until the host terminates
    pub async fn run(&self, host: &dyn ServerHost) -> Result<()> {
        self.run_on(host, &self.context.config.endpoint).await
    }

    /// Serve on `endpoint` until the host terminates
    pub async fn run_on(&self, host: &dyn ServerHost, endpoint: &str) -> Result<()> {
        info!("Starting {} on {}", self.context.config.driver_name, endpoint);
        host.start(endpoint, self.handlers()).await?;
        host.wait().await
    }
}
