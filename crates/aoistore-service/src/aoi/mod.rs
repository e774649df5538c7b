//! AOI creation, validation and pour point matching.

pub mod matcher;
pub mod service;

pub use matcher::{GeometryMatcher, NearestPourPointMatcher, POURPOINT_BUFFER_M};
pub use service::{AoiService, CreateAoiRequest};
