//! Request middleware

pub mod auth;
pub mod session_cache;

pub use auth::{auth_middleware, CurrentSession};
pub use session_cache::SessionCache;
