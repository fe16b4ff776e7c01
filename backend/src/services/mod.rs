//! Business logic services for the PropMaster platform

pub mod account;
pub mod archive;
pub mod auth;
pub mod finance;
pub mod property;
pub mod share;

pub use account::AccountService;
pub use archive::ArchiveService;
pub use auth::AuthService;
pub use finance::FinanceService;
pub use property::PropertyService;
pub use share::ShareService;
