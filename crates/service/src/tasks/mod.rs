//! Task module: status/result records for asynchronous work.
//!
//! [`TaskStore`] owns the records; [`worker::TaskWorkerPool`] plays the
//! producer that completes them in the background.

pub mod domain;
pub mod errors;
pub mod id_gen;
pub mod memory;
pub mod store;
pub mod worker;

pub use domain::{Task, TaskStatus};
pub use errors::TaskError;
pub use id_gen::{IdGenerator, UuidGenerator};
pub use memory::InMemoryTaskStore;
pub use store::TaskStore;
pub use worker::{SimulatedProcessor, TaskProcessor, TaskQueue, TaskWorkerPool};
