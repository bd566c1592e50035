use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::EARTH_RADIUS_KM;

/// A WGS84 position as sent by browsers and map SDKs.
#[derive(Debug, Default, PartialEq, Copy, Clone, Serialize, Deserialize)]
pub struct LatLng {
  pub lat: f64,
  pub lng: f64,
}

impl LatLng {
  #[must_use]
  pub fn new(lat: f64, lng: f64) -> Self {
    Self { lat, lng }
  }

  #[must_use]
  pub fn is_finite(&self) -> bool {
    self.lat.is_finite() && self.lng.is_finite()
  }

  /// Great-circle distance to `other` in kilometers.
  #[must_use]
  pub fn distance_km(&self, other: &LatLng) -> f64 {
    distance_km(self.lat, self.lng, other.lat, other.lng)
  }

  /// Exact position equality, used to match addresses by their coordinate.
  #[must_use]
  pub fn same_position(&self, other: &LatLng) -> bool {
    self.lat.to_bits() == other.lat.to_bits() && self.lng.to_bits() == other.lng.to_bits()
  }
}

impl Display for LatLng {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{},{}", self.lat, self.lng)
  }
}

/// Haversine distance between two points in kilometers.
#[must_use]
pub fn distance_km(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
  let d_lat = (lat2 - lat1).to_radians();
  let d_lng = (lng2 - lng1).to_radians();
  let a = f64::sin(d_lat / 2.0) * f64::sin(d_lat / 2.0)
    + f64::cos(lat1.to_radians())
      * f64::cos(lat2.to_radians())
      * f64::sin(d_lng / 2.0)
      * f64::sin(d_lng / 2.0);
  let c = 2.0 * f64::atan2(a.sqrt(), (1.0 - a).sqrt());
  EARTH_RADIUS_KM * c
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LocationError {
  #[error("Parameters not provided")]
  Missing,
  #[error("Invalid parameters")]
  Invalid,
}

/// Parses the `"{lat},{lng}"` path segment of the location based endpoints.
///
/// A missing half or a literal `NaN` (what browsers send for an unknown position) counts as
/// missing, anything else that is not a finite number as invalid.
impl FromStr for LatLng {
  type Err = LocationError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let mut parts = s.split(',');
    let lat = parts.next().map(str::trim).unwrap_or_default();
    let lng = parts.next().map(str::trim).unwrap_or_default();

    if lat.is_empty() || lat == "NaN" || lng.is_empty() || lng == "NaN" {
      return Err(LocationError::Missing);
    }
    if parts.next().is_some() {
      return Err(LocationError::Invalid);
    }

    let coord = LatLng {
      lat: lat.parse().map_err(|_| LocationError::Invalid)?,
      lng: lng.parse().map_err(|_| LocationError::Invalid)?,
    };
    if coord.is_finite() {
      Ok(coord)
    } else {
      Err(LocationError::Invalid)
    }
  }
}

#[cfg(test)]
mod tests {
  use assert_approx_eq::assert_approx_eq;

  use super::*;

  #[test]
  fn distance_to_itself_is_zero() {
    for (lat, lng) in [(0., 0.), (-23.55, -46.63), (89.9, 179.9), (-90., -180.)] {
      assert_approx_eq!(distance_km(lat, lng, lat, lng), 0.0);
    }
  }

  #[test]
  fn distance_is_symmetric() {
    let sao_paulo = LatLng::new(-23.5505, -46.6333);
    let recife = LatLng::new(-8.0476, -34.877);
    assert_approx_eq!(
      sao_paulo.distance_km(&recife),
      recife.distance_km(&sao_paulo),
      1e-9
    );
  }

  #[test]
  fn known_distance() {
    // One degree of latitude on the 6371 km sphere.
    assert_approx_eq!(distance_km(0., 0., 1., 0.), 111.194_926_6, 1e-6);
    let berlin = LatLng::new(52.5200, 13.4050);
    let paris = LatLng::new(48.8566, 2.3522);
    assert!((berlin.distance_km(&paris) - 877.5).abs() < 1.0);
  }

  #[test]
  fn parse_location() {
    assert_eq!(
      "-14.4, -51.3".parse::<LatLng>(),
      Ok(LatLng::new(-14.4, -51.3))
    );
    assert_eq!("".parse::<LatLng>(), Err(LocationError::Missing));
    assert_eq!("12.0".parse::<LatLng>(), Err(LocationError::Missing));
    assert_eq!("NaN,NaN".parse::<LatLng>(), Err(LocationError::Missing));
    assert_eq!("12.0,".parse::<LatLng>(), Err(LocationError::Missing));
    assert_eq!("abc,1".parse::<LatLng>(), Err(LocationError::Invalid));
    assert_eq!("1,2,3".parse::<LatLng>(), Err(LocationError::Invalid));
    assert_eq!("inf,2".parse::<LatLng>(), Err(LocationError::Invalid));
  }

  #[test]
  fn display_round_trips_through_parse() {
    let coord = LatLng::new(-8.05, -34.9);
    assert_eq!(coord.to_string().parse::<LatLng>(), Ok(coord));
  }
}
