//! Session module: opaque bearer tokens mapped to session records.
//!
//! The store owns token issuance, lazy expiry on lookup, and the idle-timeout
//! garbage collection driven by [`sweeper`].

pub mod domain;
pub mod errors;
pub mod memory;
pub mod store;
pub mod sweeper;

pub use domain::Session;
pub use errors::SessionError;
pub use memory::InMemorySessionStore;
pub use store::SessionStore;
