//! Core traits defined in `aoistore-core` and implemented by other crates.

pub mod clock;
pub mod storage;

pub use clock::{epoch_seconds, Clock, ManualClock, SystemClock};
pub use storage::{StorageObjectMeta, StorageProvider, StoredContent};
