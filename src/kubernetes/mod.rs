//! Kubernetes Module
//!
//! Resolves how to reach the Kubernetes control plane and builds the typed
//! and dynamic client handles used by downstream handlers.

pub mod client;
pub mod discovery;
pub mod env;

pub use client::*;
pub use discovery::*;
pub use env::*;
