//! # aoistore-worker
//!
//! Background execution of imports, updates and exports. Jobs are rows in
//! the `jobs` table; [`JobQueue`] enqueues and claims them, [`WorkerRunner`]
//! polls and dispatches through [`JobExecutor`] to the handlers in
//! [`jobs`].

pub mod executor;
pub mod handle;
pub mod jobs;
pub mod queue;
pub mod runner;

pub use executor::{JobExecutionError, JobExecutor, JobHandler};
pub use handle::JobHandle;
pub use jobs::default_executor;
pub use queue::JobQueue;
pub use runner::WorkerRunner;
