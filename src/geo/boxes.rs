use serde::{Deserialize, Serialize};

use super::{EARTH_RADIUS_KM, LatLng};

/// Radius used to look for suggestions around the user.
pub const NEARBY_RADIUS_M: f64 = 1_500.;
/// Radius used to bias searches towards a region.
pub const BIAS_RADIUS_M: f64 = 10_000.;
/// Radius used to fit the map around a single place.
pub const PLACE_FIT_RADIUS_M: f64 = 250.;

/// A lat/lng aligned rectangle, the literal map SDKs use for viewports.
#[derive(Debug, PartialEq, Copy, Clone, Serialize, Deserialize)]
pub struct BoundingBox {
  pub north: f64,
  pub south: f64,
  pub east: f64,
  pub west: f64,
}

impl BoundingBox {
  #[must_use]
  pub fn new(north: f64, south: f64, east: f64, west: f64) -> Self {
    Self {
      north,
      south,
      east,
      west,
    }
  }

  /// The box whose edges lie `radius_m` meters from `(lat, lng)` along the four cardinal
  /// bearings on the sphere.
  ///
  /// Latitudes are clamped at the poles. Longitudes are not wrapped, so a box crossing the
  /// antimeridian has an `east` above 180 or a `west` below -180.
  #[must_use]
  pub fn around(lat: f64, lng: f64, radius_m: f64) -> Self {
    let north = destination(lat, lng, 0., radius_m);
    let east = destination(lat, lng, 90., radius_m);
    let south = destination(lat, lng, 180., radius_m);
    let west = destination(lat, lng, 270., radius_m);
    Self {
      north: north.lat.min(90.),
      south: south.lat.max(-90.),
      east: east.lng,
      west: west.lng,
    }
  }

  /// Inclusive on all four edges.
  #[must_use]
  pub fn contains(&self, coord: &LatLng) -> bool {
    self.south <= coord.lat
      && coord.lat <= self.north
      && self.west <= coord.lng
      && coord.lng <= self.east
  }

  /// Four finite edges with `north` not below `south`.
  #[must_use]
  pub fn is_valid(&self) -> bool {
    self.north.is_finite()
      && self.south.is_finite()
      && self.east.is_finite()
      && self.west.is_finite()
      && self.north >= self.south
  }

  #[must_use]
  pub fn center(&self) -> LatLng {
    LatLng::new(
      f64::midpoint(self.north, self.south),
      f64::midpoint(self.east, self.west),
    )
  }

  /// Builds a box from raw query values.
  ///
  /// Browsers send these percent-encoded twice, so each value is decoded once more before
  /// parsing. Returns `None` unless all four values are finite numbers.
  #[must_use]
  pub fn from_params(
    north: Option<&str>,
    south: Option<&str>,
    east: Option<&str>,
    west: Option<&str>,
  ) -> Option<Self> {
    let bbox = Self {
      north: parse_param(north?)?,
      south: parse_param(south?)?,
      east: parse_param(east?)?,
      west: parse_param(west?)?,
    };
    bbox.is_valid().then_some(bbox)
  }
}

fn parse_param(raw: &str) -> Option<f64> {
  let decoded = urlencoding::decode(raw).ok()?;
  decoded.trim().parse::<f64>().ok()
}

/// Destination point after travelling `distance_m` from `(lat, lng)` along `bearing_deg`.
fn destination(lat: f64, lng: f64, bearing_deg: f64, distance_m: f64) -> LatLng {
  let delta = distance_m / 1000. / EARTH_RADIUS_KM;
  let theta = bearing_deg.to_radians();
  let phi1 = lat.to_radians();
  let lambda1 = lng.to_radians();

  // Straight north/south is a pure latitude offset, which also keeps the pole clamp exact.
  if bearing_deg == 0. || bearing_deg == 180. {
    let phi2 = if bearing_deg == 0. {
      phi1 + delta
    } else {
      phi1 - delta
    };
    return LatLng::new(phi2.to_degrees(), lng);
  }

  let phi2 = (phi1.sin() * delta.cos() + phi1.cos() * delta.sin() * theta.cos()).asin();
  let lambda2 = lambda1
    + f64::atan2(
      theta.sin() * delta.sin() * phi1.cos(),
      delta.cos() - phi1.sin() * phi2.sin(),
    );
  LatLng::new(phi2.to_degrees(), lambda2.to_degrees())
}
