//! Pour point entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A hydrological reference point shared by one or more AOIs.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PourPoint {
    /// Unique pour point identifier.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Longitude in decimal degrees.
    pub longitude: f64,
    /// Latitude in decimal degrees.
    pub latitude: f64,
    /// Boundary of the first AOI matched to this point.
    pub boundary: Option<String>,
    /// External station identifier.
    pub awdb_id: Option<String>,
    /// When the point was recorded.
    pub created_at: DateTime<Utc>,
}

impl PourPoint {
    /// Location as a [`GeoPoint`].
    pub fn location(&self) -> GeoPoint {
        GeoPoint {
            longitude: self.longitude,
            latitude: self.latitude,
        }
    }
}

/// Data required to record a new pour point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePourPoint {
    /// Display name.
    pub name: String,
    /// Location.
    pub location: GeoPoint,
    /// Boundary to attach.
    pub boundary: Option<String>,
    /// External station identifier.
    pub awdb_id: Option<String>,
}

/// A WGS84 coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Longitude in decimal degrees.
    pub longitude: f64,
    /// Latitude in decimal degrees.
    pub latitude: f64,
}

impl GeoPoint {
    /// Mean Earth radius in meters.
    const EARTH_RADIUS_M: f64 = 6_371_008.8;

    /// Great-circle distance to `other` in meters.
    pub fn distance_m(&self, other: &GeoPoint) -> f64 {
        let (lat1, lat2) = (self.latitude.to_radians(), other.latitude.to_radians());
        let dlat = lat2 - lat1;
        let dlon = (other.longitude - self.longitude).to_radians();
        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        2.0 * Self::EARTH_RADIUS_M * a.sqrt().asin()
    }
}
