//! Server Host Module
//!
//! Serves an assembled handler set on a unix or tcp endpoint.

pub mod endpoint;
pub mod nonblocking;

pub use endpoint::*;
pub use nonblocking::*;
