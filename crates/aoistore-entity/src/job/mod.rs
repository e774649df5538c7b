//! Background job domain entities.

pub mod model;
pub mod payload;
pub mod status;

pub use model::{CreateJob, Job};
pub use payload::JobPayload;
pub use status::JobStatus;
