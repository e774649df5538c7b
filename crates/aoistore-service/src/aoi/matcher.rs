//! Pour point association for new AOIs.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use aoistore_core::result::AppResult;
use aoistore_core::traits::Clock;
use aoistore_database::repositories::AoiRepository;
use aoistore_entity::aoi::{CreatePourPoint, GeoPoint, PourPoint};

/// Search radius around a pour point, in metres.
pub const POURPOINT_BUFFER_M: f64 = 100.0;

/// Associates an AOI's outlet with a reference pour point.
#[async_trait]
pub trait GeometryMatcher: Send + Sync + fmt::Debug {
    /// Returns the reference point for `point`, creating one if needed.
    async fn match_point(&self, point: GeoPoint, boundary: Option<&str>) -> AppResult<PourPoint>;
}

/// Reuses the nearest stored pour point within a buffer, otherwise stores
/// the given point.
#[derive(Debug, Clone)]
pub struct NearestPourPointMatcher {
    /// AOI repository (owns the pour point table).
    aois: Arc<AoiRepository>,
    /// Clock for new rows.
    clock: Arc<dyn Clock>,
    /// Search radius in metres.
    buffer_m: f64,
}

impl NearestPourPointMatcher {
    /// Creates a matcher with the default buffer.
    pub fn new(aois: Arc<AoiRepository>, clock: Arc<dyn Clock>) -> Self {
        Self {
            aois,
            clock,
            buffer_m: POURPOINT_BUFFER_M,
        }
    }

    /// Overrides the search radius.
    pub fn with_buffer(mut self, buffer_m: f64) -> Self {
        self.buffer_m = buffer_m;
        self
    }
}

#[async_trait]
impl GeometryMatcher for NearestPourPointMatcher {
    async fn match_point(&self, point: GeoPoint, boundary: Option<&str>) -> AppResult<PourPoint> {
        let nearest = self
            .aois
            .find_all_pourpoints()
            .await?
            .into_iter()
            .map(|p| (p.location().distance_m(&point), p))
            .filter(|(d, _)| *d <= self.buffer_m)
            .min_by(|(a, _), (b, _)| a.total_cmp(b));

        if let Some((distance, mut existing)) = nearest {
            if existing.boundary.is_none() {
                if let Some(boundary) = boundary {
                    self.aois.fill_pourpoint_boundary(existing.id, boundary).await?;
                    existing.boundary = Some(boundary.to_string());
                }
            }
            info!(pourpoint_id = %existing.id, distance_m = distance, "Matched existing pour point");
            return Ok(existing);
        }

        let created = self
            .aois
            .create_pourpoint(
                &CreatePourPoint {
                    name: format!("{:.5},{:.5}", point.longitude, point.latitude),
                    location: point,
                    boundary: boundary.map(String::from),
                    awdb_id: None,
                },
                self.clock.now(),
            )
            .await?;
        info!(pourpoint_id = %created.id, "Created pour point");
        Ok(created)
    }
}
