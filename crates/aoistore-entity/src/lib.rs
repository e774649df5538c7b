//! # aoistore-entity
//!
//! Domain entity models for the AOI content store. Every struct in this
//! crate represents a database table row or a domain value object. All
//! entities derive `Debug`, `Clone`, `Serialize`, `Deserialize`, and database
//! entities additionally derive `sqlx::FromRow`.

pub mod aoi;
pub mod directory;
pub mod file;
pub mod job;
pub mod node;
