mod boxes;
mod coords;

/// Bounding boxes around points and viewports.
pub use boxes::*;
/// Coordinates and great-circle distances.
pub use coords::*;

/// Mean earth radius used by every spherical computation in this crate.
pub const EARTH_RADIUS_KM: f64 = 6371.0;
