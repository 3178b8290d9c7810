//! Smart Storage CSI - Plugin Bootstrap
//!
//! Bootstrap layer of the Smart Storage CSI plugin: decides how to reach the
//! Kubernetes control plane and assembles the CSI handlers a plugin process
//! serves for its role.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                        Plugin Process                             │
//! ├───────────────────────────────────────────────────────────────────┤
//! │  ┌──────────────────┐     ┌──────────────────────────────────┐    │
//! │  │   KubeClient     │     │           CsiDriver              │    │
//! │  │  flag > env >    │────▶│  identity (always)               │    │
//! │  │  in-cluster      │     │  controller | node (by role)     │    │
//! │  └──────────────────┘     └────────────────┬─────────────────┘    │
//! │                                            │                      │
//! │                               ┌────────────┴─────────────┐        │
//! │                               │   NonBlockingServer      │        │
//! │                               │   (unix:// | tcp://)     │        │
//! │                               └──────────────────────────┘        │
//! └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`kubernetes`]: Kubernetes config resolution and client handles
//! - [`driver`]: Role-based handler assembly
//! - [`server`]: Server host for the assembled handlers
//! - [`domain`]: Handler and server-host ports
//! - [`error`]: Error types and handling

pub mod domain;
pub mod driver;
pub mod error;
pub mod kubernetes;
pub mod server;

// Re-export commonly used types
pub use domain::ports::{
    AccessMode, ControllerService, HandlerSet, IdentityService, NodeService, ServerHost,
};

pub use driver::{
    CsiDriver, DefaultHandlerFactory, DriverContext, HandlerFactory, PluginConfig, PluginRole,
    DRIVER_NAME,
};

pub use error::{ClientKind, Error, Result};

pub use kubernetes::{
    get_config, ClientFactory, ConfigDiscoverer, DynamicClient, EnvKey, EnvLookup, KubeClient,
    KubeClientBuilder, KUBE_CONFIG_ENV_KEY, K8S_MASTER_IP_ENV_KEY,
};

pub use server::{parse_endpoint, Endpoint, NonBlockingServer};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
