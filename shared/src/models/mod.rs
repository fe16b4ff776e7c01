//! Domain models for the PropMaster platform

pub mod account;
pub mod archive;
pub mod finance;
pub mod property;
pub mod share;

pub use account::*;
pub use archive::*;
pub use finance::*;
pub use property::*;
pub use share::*;
