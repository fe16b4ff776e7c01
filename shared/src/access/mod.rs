//! Role-based access model
//!
//! - [`roles`]: the role table and the `can` predicates
//! - [`identity`]: which role an account acts with
//! - [`guard`]: the accept/reject decision every protected route makes

pub mod guard;
pub mod identity;
pub mod roles;

pub use guard::{authenticate, authorize, AccessDenied, Capability, Grant};
pub use identity::{AccessPolicy, SessionUser};
pub use roles::{Action, ParseActionError, ParseRoleError, Role, RoleTable, RoleTableBuilder};
