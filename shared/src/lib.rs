//! Shared types and models for the PropMaster real-estate platform
//!
//! This crate contains the access model and the records shared between the
//! backend, the browser bundle (via WASM), and other components of the system.

pub mod access;
pub mod models;
pub mod types;
pub mod validation;

pub use access::*;
pub use models::*;
pub use types::*;
pub use validation::*;
