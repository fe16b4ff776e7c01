//! HTTP handlers for the PropMaster platform

pub mod archive;
pub mod auth;
pub mod finance;
pub mod health;
pub mod property;
pub mod share;
pub mod user;

pub use archive::{bulk_update, get_archive_stats, list_archived};
pub use auth::{get_session, sign_in_callback};
pub use finance::{
    create_finance, delete_finance, export_finances, get_finance, list_finances, update_finance,
};
pub use health::health_check;
pub use property::{
    create_property, delete_property, get_property, list_properties, update_property,
};
pub use share::{create_share, list_shares, revoke_share, view_shared_property};
pub use user::{list_users, update_user};
