//! Domain layer - Port definitions
//!
//! This module defines the handler and server-host traits that adapters
//! implement, following hexagonal architecture principles.

pub mod ports;

pub use ports::*;
