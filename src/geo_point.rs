use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::EsError;

/// Latitude/longitude pair as stored in a `geo_point` field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn from_lat_lon(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Object form, `{"lat": .., "lon": ..}`.
    pub fn source(&self) -> Value {
        json!({ "lat": self.lat, "lon": self.lon })
    }
}

/// Parses the `"lat,lon"` string form.
impl FromStr for GeoPoint {
    type Err = EsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || EsError::InvalidGeoPoint(s.to_string());
        let (lat, lon) = s.split_once(',').ok_or_else(invalid)?;
        let lat = lat.trim().parse::<f64>().map_err(|_| invalid())?;
        let lon = lon.trim().parse::<f64>().map_err(|_| invalid())?;
        Ok(Self { lat, lon })
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.lat, self.lon)
    }
}
