//! Auth module: user registration, credential checks and token resolution.
//!
//! Users live here; sessions are delegated to a [`crate::session::SessionStore`]
//! so this module never locks both maps at once.

pub mod domain;
pub mod errors;
pub mod memory;
pub mod password;
pub mod store;

pub use domain::User;
pub use errors::AuthError;
pub use memory::InMemoryUserStore;
pub use password::PasswordHasher;
pub use store::UserStore;
