use serde::{Deserialize, Serialize};

use crate::{
  geo::{BoundingBox, LatLng},
  history::{SavedOverlay, Snapshot},
};

/// Shape of an administrator curated area.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Region {
  #[serde(rename_all = "camelCase")]
  Circle { center: LatLng, radius_m: f64 },
  Rectangle { bounds: BoundingBox },
}

impl Region {
  #[must_use]
  pub fn contains(&self, coord: &LatLng) -> bool {
    match self {
      Region::Circle { center, radius_m } => center.distance_km(coord) * 1000. <= *radius_m,
      Region::Rectangle { bounds } => bounds.contains(coord),
    }
  }

  /// The viewport that fits the whole region.
  #[must_use]
  pub fn bounding_box(&self) -> BoundingBox {
    match self {
      Region::Circle { center, radius_m } => BoundingBox::around(center.lat, center.lng, *radius_m),
      Region::Rectangle { bounds } => *bounds,
    }
  }

  /// Regions can only be drawn as circles or rectangles, markers have no area.
  #[must_use]
  pub fn from_snapshot(snapshot: &Snapshot) -> Option<Self> {
    match *snapshot {
      Snapshot::Marker { .. } => None,
      Snapshot::Circle { center, radius } => Some(Region::Circle {
        center,
        radius_m: radius,
      }),
      Snapshot::Rectangle { bounds } => Some(Region::Rectangle { bounds }),
    }
  }
}

/// A "Centro": a region new places may be registered in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Area {
  pub id: u64,
  pub name: String,
  pub slug: String,
  pub region: Region,
}

impl Area {
  #[must_use]
  pub fn contains(&self, coord: &LatLng) -> bool {
    self.region.contains(coord)
  }
}

/// An area to be created from a confirmed drawing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewArea {
  pub name: String,
  pub region: Region,
}

impl NewArea {
  /// Uses the first circle or rectangle of the drawing.
  #[must_use]
  pub fn from_overlays(name: impl Into<String>, overlays: &[SavedOverlay]) -> Option<Self> {
    let region = overlays
      .iter()
      .find_map(|o| Region::from_snapshot(&o.snapshot))?;
    Some(Self {
      name: name.into(),
      region,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::history::OverlayKind;

  #[test]
  fn circle_contains() {
    let region = Region::Circle {
      center: LatLng::new(-8.05, -34.9),
      radius_m: 1_000.,
    };
    assert!(region.contains(&LatLng::new(-8.05, -34.9)));
    assert!(region.contains(&LatLng::new(-8.055, -34.9)));
    assert!(!region.contains(&LatLng::new(-8.07, -34.9)));

    let bbox = region.bounding_box();
    assert!(bbox.contains(&LatLng::new(-8.055, -34.9)));
  }

  #[test]
  fn area_from_drawing() {
    let overlays = [
      SavedOverlay {
        kind: OverlayKind::Marker,
        snapshot: Snapshot::Marker {
          position: LatLng::new(0., 0.),
        },
      },
      SavedOverlay {
        kind: OverlayKind::Rectangle,
        snapshot: Snapshot::Rectangle {
          bounds: BoundingBox::new(1., -1., 1., -1.),
        },
      },
    ];
    let area = NewArea::from_overlays("Centro", &overlays).unwrap();
    assert_eq!(
      area.region,
      Region::Rectangle {
        bounds: BoundingBox::new(1., -1., 1., -1.)
      }
    );
    assert!(NewArea::from_overlays("Centro", &overlays[..1]).is_none());
  }

  #[test]
  fn region_json_shape() {
    let region: Region =
      serde_json::from_str(r#"{"type":"circle","center":{"lat":1.0,"lng":2.0},"radiusM":30.0}"#)
        .unwrap();
    assert_eq!(
      region,
      Region::Circle {
        center: LatLng::new(1., 2.),
        radius_m: 30.
      }
    );
  }
}
