//! Undo/redo history for overlays drawn on the map.
//!
//! The history is a plain value, [`HistoryState`], changed only through [`reduce`]. Every frame
//! holds, per overlay, a handle to the live map object and a [`Snapshot`] of the geometry it had
//! when the frame was taken, so moving between frames only means re-applying snapshots.

pub mod editor;

use serde::{Deserialize, Serialize};

use crate::geo::{BoundingBox, LatLng};

pub use editor::{GeometryEvent, OverlayCanvas, OverlayEditor, OverlayEvents, SavedOverlay};

/// Identifies a live overlay across frames.
pub type OverlayId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OverlayKind {
  Marker,
  Circle,
  Rectangle,
}

/// The part of an overlay's geometry the user can change by dragging or resizing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Snapshot {
  Marker { position: LatLng },
  Circle { center: LatLng, radius: f64 },
  Rectangle { bounds: BoundingBox },
}

impl Snapshot {
  #[must_use]
  pub fn kind(&self) -> OverlayKind {
    match self {
      Snapshot::Marker { .. } => OverlayKind::Marker,
      Snapshot::Circle { .. } => OverlayKind::Circle,
      Snapshot::Rectangle { .. } => OverlayKind::Rectangle,
    }
  }
}

/// A reference to an overlay living on the map.
///
/// The map collaborator owns the object, the history only keeps clones of the handle.
pub trait OverlayHandle: Clone {
  fn id(&self) -> OverlayId;
  /// Reads the current geometry of the live overlay.
  fn snapshot(&self) -> Snapshot;

  fn kind(&self) -> OverlayKind {
    self.snapshot().kind()
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OverlayRecord<H> {
  pub kind: OverlayKind,
  pub handle: H,
  pub snapshot: Snapshot,
}

impl<H: OverlayHandle> OverlayRecord<H> {
  /// Records the overlay with its geometry as of now.
  #[must_use]
  pub fn capture(handle: H) -> Self {
    let snapshot = handle.snapshot();
    Self {
      kind: snapshot.kind(),
      handle,
      snapshot,
    }
  }
}

pub type Frame<H> = Vec<OverlayRecord<H>>;

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryState<H> {
  pub past: Vec<Frame<H>>,
  pub now: Frame<H>,
  pub future: Vec<Frame<H>>,
}

impl<H> Default for HistoryState<H> {
  fn default() -> Self {
    Self {
      past: Vec::new(),
      now: Vec::new(),
      future: Vec::new(),
    }
  }
}

impl<H> HistoryState<H> {
  #[must_use]
  pub fn can_undo(&self) -> bool {
    !self.past.is_empty()
  }

  #[must_use]
  pub fn can_redo(&self) -> bool {
    !self.future.is_empty()
  }
}

#[derive(Debug, Clone)]
pub enum Transition<H> {
  /// A new overlay finished drawing, with the geometry it was drawn with.
  Add(OverlayRecord<H>),
  /// Any overlay was dragged or resized. Re-captures every overlay of the current frame.
  UpdateAll,
  Undo,
  Redo,
}

impl<H: OverlayHandle> Transition<H> {
  /// Adds the overlay as it is on the map right now.
  #[must_use]
  pub fn add(handle: H) -> Self {
    Transition::Add(OverlayRecord::capture(handle))
  }
}

/// Applies one transition. Undo and redo at the end of their stack return the state unchanged.
#[must_use]
pub fn reduce<H: OverlayHandle>(state: HistoryState<H>, transition: Transition<H>) -> HistoryState<H> {
  let HistoryState {
    mut past,
    now,
    mut future,
  } = state;

  match transition {
    Transition::Add(record) => {
      let mut next = now.clone();
      next.push(record);
      past.push(now);
      HistoryState {
        past,
        now: next,
        future: Vec::new(),
      }
    }
    Transition::UpdateAll => {
      let next = now
        .iter()
        .map(|record| OverlayRecord::capture(record.handle.clone()))
        .collect();
      past.push(now);
      HistoryState {
        past,
        now: next,
        future: Vec::new(),
      }
    }
    Transition::Undo => match past.pop() {
      Some(previous) => {
        future.push(now);
        HistoryState {
          past,
          now: previous,
          future,
        }
      }
      None => HistoryState { past, now, future },
    },
    Transition::Redo => match future.pop() {
      Some(next) => {
        past.push(now);
        HistoryState {
          past,
          now: next,
          future,
        }
      }
      None => HistoryState { past, now, future },
    },
  }
}
