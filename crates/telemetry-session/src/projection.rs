//! Mapping of track-local coordinates onto latitude/longitude.

use serde::{Deserialize, Serialize};

const EARTH_RADIUS_M: f64 = 6_378_137.0;

/// Converts planar world coordinates (metres) into geodetic degrees.
pub trait CoordinateProjection: Send {
    /// `east` and `north` are metres from the projection origin.
    /// Returns `(latitude, longitude)`.
    fn convert(&self, east: f64, north: f64) -> (f64, f64);
}

/// Projection origin in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GeoOrigin {
    pub latitude: f64,
    pub longitude: f64,
}

/// Equirectangular projection around a fixed origin.
///
/// Accurate to well under a metre over the extent of a race track.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Equirectangular {
    origin: GeoOrigin,
    metres_per_deg_long: f64,
}

impl Equirectangular {
    pub fn new(origin: GeoOrigin) -> Self {
        // Arc length of one degree along the origin's parallel.
        let metres_per_deg_long = (EARTH_RADIUS_M * origin.latitude.to_radians().cos()).to_radians();
        Self {
            origin,
            metres_per_deg_long,
        }
    }

    pub fn origin(&self) -> GeoOrigin {
        self.origin
    }
}

impl Default for Equirectangular {
    fn default() -> Self {
        Self::new(GeoOrigin::default())
    }
}

impl CoordinateProjection for Equirectangular {
    fn convert(&self, east: f64, north: f64) -> (f64, f64) {
        let metres_per_deg_lat = EARTH_RADIUS_M.to_radians();
        let lat = self.origin.latitude + north / metres_per_deg_lat;
        let long = if self.metres_per_deg_long.abs() > f64::EPSILON {
            self.origin.longitude + east / self.metres_per_deg_long
        } else {
            self.origin.longitude
        };
        (lat, long)
    }
}
