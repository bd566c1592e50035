use std::{cell::RefCell, collections::HashMap, rc::Rc};

use vouali::{
  area::NewArea,
  geo::LatLng,
  history::{
    GeometryEvent, OverlayCanvas, OverlayEditor, OverlayEvents, OverlayHandle, OverlayId,
    SavedOverlay, Snapshot,
  },
  store::{
    MemoryStore, RegistrationError,
    memory::{NewAddress, NewPlace, NewUser},
  },
};

#[derive(Clone)]
struct Shape {
  id: OverlayId,
  geometry: Rc<RefCell<Snapshot>>,
}

impl Shape {
  fn new(id: OverlayId, snapshot: Snapshot) -> Self {
    Self {
      id,
      geometry: Rc::new(RefCell::new(snapshot)),
    }
  }
}

impl OverlayHandle for Shape {
  fn id(&self) -> OverlayId {
    self.id
  }

  fn snapshot(&self) -> Snapshot {
    *self.geometry.borrow()
  }
}

/// Behaves like a map SDK: moving an overlay programmatically fires its change listener.
struct Map {
  events: OverlayEvents<Shape>,
  visible: HashMap<OverlayId, Shape>,
}

impl Map {
  fn new(events: OverlayEvents<Shape>) -> Self {
    Self {
      events,
      visible: HashMap::new(),
    }
  }

  fn draw(&mut self, shape: &Shape) {
    self.visible.insert(shape.id, shape.clone());
    self.events.overlay_completed(shape.clone());
  }

  fn drag(&mut self, shape: &Shape, to: &[Snapshot]) {
    self.events.geometry_changed(GeometryEvent::DragStart);
    for snapshot in to {
      *shape.geometry.borrow_mut() = *snapshot;
      self.events.geometry_changed(GeometryEvent::Changed);
    }
    self.events.geometry_changed(GeometryEvent::DragEnd);
  }

  fn resize(&mut self, shape: &Shape, snapshot: Snapshot) {
    *shape.geometry.borrow_mut() = snapshot;
    self.events.geometry_changed(GeometryEvent::Changed);
  }
}

impl OverlayCanvas<Shape> for Map {
  fn show(&mut self, handle: &Shape) {
    self.visible.insert(handle.id, handle.clone());
  }

  fn hide(&mut self, handle: &Shape) {
    self.visible.remove(&handle.id);
  }

  fn apply(&mut self, handle: &Shape, snapshot: &Snapshot) {
    *handle.geometry.borrow_mut() = *snapshot;
    self.events.geometry_changed(GeometryEvent::Changed);
  }
}

fn marker(lat: f64, lng: f64) -> Snapshot {
  Snapshot::Marker {
    position: LatLng::new(lat, lng),
  }
}

fn circle(lat: f64, lng: f64, radius: f64) -> Snapshot {
  Snapshot::Circle {
    center: LatLng::new(lat, lng),
    radius,
  }
}

#[test]
fn a_drag_is_one_undo_step() {
  let mut editor = OverlayEditor::new();
  let mut map = Map::new(editor.events());

  let pin = Shape::new(1, marker(-8.05, -34.9));
  map.draw(&pin);
  map.drag(
    &pin,
    &[
      marker(-8.06, -34.9),
      marker(-8.07, -34.9),
      marker(-8.08, -34.9),
    ],
  );
  assert_eq!(editor.pump(), 2);
  assert_eq!(editor.now()[0].snapshot, marker(-8.08, -34.9));

  editor.undo();
  editor.render(&mut map);
  assert_eq!(pin.snapshot(), marker(-8.05, -34.9));
  // Moving the pin back does not count as an edit.
  assert_eq!(editor.pump(), 0);
  assert!(editor.state().can_redo());

  editor.redo();
  editor.render(&mut map);
  assert_eq!(pin.snapshot(), marker(-8.08, -34.9));
  assert_eq!(editor.pump(), 0);
}

#[test]
fn undo_hides_and_redo_shows() {
  let mut editor = OverlayEditor::new();
  let mut map = Map::new(editor.events());

  let a = Shape::new(1, marker(0., 0.));
  let b = Shape::new(2, circle(1., 1., 300.));
  map.draw(&a);
  map.draw(&b);
  editor.pump();
  editor.render(&mut map);

  editor.undo();
  editor.render(&mut map);
  assert!(map.visible.contains_key(&1));
  assert!(!map.visible.contains_key(&2));
  assert_eq!(editor.state().past.len(), 1);
  assert!(editor.state().past[0].is_empty());
  assert_eq!(editor.state().future.len(), 1);

  editor.redo();
  editor.render(&mut map);
  assert!(map.visible.contains_key(&2));
  assert!(!editor.state().can_redo());

  editor.undo();
  editor.undo();
  editor.render(&mut map);
  assert!(map.visible.is_empty());
  // Nothing left to undo.
  editor.undo();
  assert!(editor.now().is_empty());
  assert!(!editor.state().can_undo());
}

#[test]
fn editing_after_undo_drops_the_redo_frames() {
  let mut editor = OverlayEditor::new();
  let mut map = Map::new(editor.events());

  let area = Shape::new(1, circle(-8.06, -34.88, 500.));
  map.draw(&area);
  editor.pump();
  editor.render(&mut map);
  map.resize(&area, circle(-8.06, -34.88, 800.));
  editor.pump();

  editor.undo();
  editor.render(&mut map);
  assert_eq!(area.snapshot(), circle(-8.06, -34.88, 500.));
  assert!(editor.state().can_redo());

  map.resize(&area, circle(-8.06, -34.88, 1_000.));
  editor.pump();
  assert!(!editor.state().can_redo());
  assert_eq!(editor.now()[0].snapshot, circle(-8.06, -34.88, 1_000.));
}

#[test]
fn a_confirmed_drawing_becomes_an_area() {
  let mut editor = OverlayEditor::new();
  let mut map = Map::new(editor.events());

  map.draw(&Shape::new(1, marker(-8.06, -34.88)));
  let zone = Shape::new(2, circle(-8.06, -34.88, 500.));
  map.draw(&zone);
  map.resize(&zone, circle(-8.06, -34.88, 1_000.));
  editor.pump();

  let json = SavedOverlay::to_json(&editor.saved_overlays()).unwrap();
  let saved = SavedOverlay::from_json(&json).unwrap();
  assert_eq!(saved.len(), 2);

  let store = MemoryStore::default();
  let area = store
    .register_area(NewArea::from_overlays("Bairro do Recife", &saved).unwrap())
    .unwrap();
  assert_eq!(area.slug, "bairro-do-recife");

  let place = |lat: f64, lng: f64| NewPlace {
    name: "Livraria".to_string(),
    aliases: Vec::new(),
    social_links: Vec::new(),
    lat,
    lng,
    address: NewAddress {
      formatted_text: "Rua do Bom Jesus, 1".to_string(),
      lat,
      lng,
      bounds: None,
    },
    owner: NewUser {
      email: "livraria@vouali.com.br".to_string(),
      name: None,
    },
  };
  // About 700 m south of the center.
  assert!(store.register_place(place(-8.0663, -34.88)).is_ok());
  assert_eq!(
    store.register_place(place(-8.08, -34.88)),
    Err(RegistrationError::OutsideAreas)
  );
}
