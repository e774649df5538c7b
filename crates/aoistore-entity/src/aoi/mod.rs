//! Area of Interest domain entities.

pub mod model;
pub mod pourpoint;

pub use model::{Aoi, CreateAoi, make_short_name};
pub use pourpoint::{CreatePourPoint, GeoPoint, PourPoint};
