//! Concurrent in-memory stores behind the task API.
//! - `session`: opaque tokens, lazy expiry and idle-timeout GC.
//! - `auth`: users and credentials; sessions are delegated to `session`.
//! - `tasks`: task records plus the worker pool that completes them.

pub mod auth;
pub mod metrics;
pub mod session;
pub mod tasks;
