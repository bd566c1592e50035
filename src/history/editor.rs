use std::sync::{
  Arc,
  atomic::{AtomicBool, Ordering},
  mpsc::{Receiver, Sender, channel},
};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::{HistoryState, OverlayHandle, OverlayKind, OverlayRecord, Snapshot, Transition, reduce};

/// Draws the overlays of the current frame on the map.
pub trait OverlayCanvas<H> {
  /// Puts the overlay on the map.
  fn show(&mut self, handle: &H);
  /// Takes the overlay off the map.
  fn hide(&mut self, handle: &H);
  /// Moves or resizes the live overlay to the given geometry.
  fn apply(&mut self, handle: &H, snapshot: &Snapshot);
}

/// Geometry notifications of a single overlay, as the map SDK emits them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryEvent {
  DragStart,
  DragEnd,
  /// Resized or moved without a drag, e.g. through an edit handle.
  Changed,
}

enum EditorEvent<H> {
  Completed(OverlayRecord<H>),
  Changed,
}

#[derive(Default)]
struct Flags {
  replaying: AtomicBool,
  dragging: AtomicBool,
}

/// Sender side for the map listeners. Clone one into every listener closure.
pub struct OverlayEvents<H> {
  sender: Sender<EditorEvent<H>>,
  flags: Arc<Flags>,
}

impl<H> Clone for OverlayEvents<H> {
  fn clone(&self) -> Self {
    Self {
      sender: self.sender.clone(),
      flags: self.flags.clone(),
    }
  }
}

impl<H: OverlayHandle> OverlayEvents<H> {
  /// A new overlay finished drawing. Its geometry is recorded right away, later edits become
  /// steps of their own.
  pub fn overlay_completed(&self, handle: H) {
    let record = OverlayRecord::capture(handle);
    if self.sender.send(EditorEvent::Completed(record)).is_err() {
      debug!("Editor is gone, dropping completed overlay");
    }
  }

  /// Geometry of any overlay changed.
  ///
  /// Changes are not recorded while a drag is in progress, nor while the editor itself is
  /// moving overlays to replay a frame.
  pub fn geometry_changed(&self, event: GeometryEvent) {
    match event {
      GeometryEvent::DragStart => {
        self.flags.dragging.store(true, Ordering::SeqCst);
        return;
      }
      GeometryEvent::DragEnd => self.flags.dragging.store(false, Ordering::SeqCst),
      GeometryEvent::Changed => {}
    }

    if self.flags.replaying.load(Ordering::SeqCst) {
      debug!("Ignoring {event:?} caused by replay");
      return;
    }
    if self.flags.dragging.load(Ordering::SeqCst) {
      return;
    }
    if self.sender.send(EditorEvent::Changed).is_err() {
      debug!("Editor is gone, dropping {event:?}");
    }
  }
}

/// Suspends change notifications until dropped.
struct ReplayGuard {
  flags: Arc<Flags>,
}

impl ReplayGuard {
  fn enter(flags: &Arc<Flags>) -> Self {
    flags.replaying.store(true, Ordering::SeqCst);
    Self {
      flags: flags.clone(),
    }
  }
}

impl Drop for ReplayGuard {
  fn drop(&mut self) {
    self.flags.replaying.store(false, Ordering::SeqCst);
  }
}

/// A confirmed overlay, as stored for reloading later.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SavedOverlay {
  pub kind: OverlayKind,
  pub snapshot: Snapshot,
}

impl SavedOverlay {
  /// Serializes a confirmed drawing for client side storage.
  pub fn to_json(overlays: &[SavedOverlay]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(overlays)
  }

  pub fn from_json(json: &str) -> serde_json::Result<Vec<SavedOverlay>> {
    serde_json::from_str(json)
  }
}

/// Keeps the history of a drawing session and mirrors its current frame onto the map.
pub struct OverlayEditor<H> {
  state: HistoryState<H>,
  events: OverlayEvents<H>,
  receiver: Receiver<EditorEvent<H>>,
  displayed: Vec<H>,
}

impl<H: OverlayHandle> Default for OverlayEditor<H> {
  fn default() -> Self {
    Self::new()
  }
}

impl<H: OverlayHandle> OverlayEditor<H> {
  #[must_use]
  pub fn new() -> Self {
    let (sender, receiver) = channel();
    Self {
      state: HistoryState::default(),
      events: OverlayEvents {
        sender,
        flags: Arc::new(Flags::default()),
      },
      receiver,
      displayed: Vec::new(),
    }
  }

  #[must_use]
  pub fn events(&self) -> OverlayEvents<H> {
    self.events.clone()
  }

  #[must_use]
  pub fn state(&self) -> &HistoryState<H> {
    &self.state
  }

  #[must_use]
  pub fn now(&self) -> &[OverlayRecord<H>] {
    &self.state.now
  }

  pub fn dispatch(&mut self, transition: Transition<H>) {
    let state = std::mem::take(&mut self.state);
    self.state = reduce(state, transition);
  }

  pub fn undo(&mut self) {
    self.dispatch(Transition::Undo);
  }

  pub fn redo(&mut self) {
    self.dispatch(Transition::Redo);
  }

  /// Applies the queued map events to the history. Returns how many were applied.
  pub fn pump(&mut self) -> usize {
    let mut applied = 0;
    while let Ok(event) = self.receiver.try_recv() {
      let transition = match event {
        EditorEvent::Completed(record) => Transition::Add(record),
        EditorEvent::Changed => Transition::UpdateAll,
      };
      self.dispatch(transition);
      applied += 1;
    }
    applied
  }

  /// Mirrors the current frame onto the map.
  ///
  /// Overlays missing from the frame are hidden, new ones shown, and every overlay of the frame
  /// is set to its snapshot. Change notifications triggered meanwhile are dropped.
  pub fn render<C: OverlayCanvas<H>>(&mut self, canvas: &mut C) {
    let _guard = ReplayGuard::enter(&self.events.flags);

    for handle in &self.displayed {
      if !self.state.now.iter().any(|r| r.handle.id() == handle.id()) {
        canvas.hide(handle);
      }
    }
    for record in &self.state.now {
      if !self.displayed.iter().any(|h| h.id() == record.handle.id()) {
        canvas.show(&record.handle);
      }
      if record.handle.kind() != record.kind {
        warn!(
          "Overlay {} changed from {:?} to {:?}, skipping",
          record.handle.id(),
          record.kind,
          record.handle.kind()
        );
        continue;
      }
      canvas.apply(&record.handle, &record.snapshot);
    }

    self.displayed = self.state.now.iter().map(|r| r.handle.clone()).collect();
  }

  /// Flattens the current frame for storage once the user confirms the drawing.
  #[must_use]
  pub fn saved_overlays(&self) -> Vec<SavedOverlay> {
    self
      .state
      .now
      .iter()
      .map(|r| SavedOverlay {
        kind: r.kind,
        snapshot: r.snapshot,
      })
      .collect()
  }
}
