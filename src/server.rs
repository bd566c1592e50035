use std::{net::SocketAddr, path::PathBuf, sync::Arc};

use axum::{
  Json, Router,
  extract::{Path, Query, State},
  http::StatusCode,
  routing::{get, post},
};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use tower_http::trace::{self, TraceLayer};

use crate::{
  area::Area,
  error::ApiError,
  geo::{BoundingBox, LatLng},
  search::{SearchError, SearchOptions, SearchRanker, SearchResult},
  store::{AddressPin, LocationDetail, LocationStore, MemoryStore, NewPlace, Place},
};

/// Most address pins returned for one viewport.
pub const MAX_PINS: usize = 100;

#[derive(Clone)]
pub struct AppState {
  store: Arc<dyn LocationStore>,
  ranker: SearchRanker,
  registry: Option<Registry>,
  defaults: SearchOptions,
}

#[derive(Clone)]
struct Registry {
  store: Arc<MemoryStore>,
  data_file: Option<PathBuf>,
  /// Held while saving, so that saves neither interleave nor land out of order.
  saving: Arc<tokio::sync::Mutex<()>>,
}

impl AppState {
  /// A read-only service over any store.
  #[must_use]
  pub fn new(store: Arc<dyn LocationStore>, quota: usize) -> Self {
    Self {
      ranker: SearchRanker::new(store.clone()).with_quota(quota),
      store,
      registry: None,
      defaults: SearchOptions::default(),
    }
  }

  /// A service that also accepts new places, saving the dataset to `data_file` after each one.
  #[must_use]
  pub fn with_registry(store: Arc<MemoryStore>, quota: usize, data_file: Option<PathBuf>) -> Self {
    Self {
      registry: Some(Registry {
        store: store.clone(),
        data_file,
        saving: Arc::default(),
      }),
      ..Self::new(store, quota)
    }
  }

  /// Options used when a request leaves `sd`/`cd` out.
  #[must_use]
  pub fn with_defaults(mut self, defaults: SearchOptions) -> Self {
    self.defaults = defaults;
    self
  }
}

/// Viewport query values as the browser sends them.
#[derive(Debug, Default, Deserialize)]
pub struct BoundsParams {
  north: Option<String>,
  south: Option<String>,
  east: Option<String>,
  west: Option<String>,
}

impl BoundsParams {
  fn bounds(&self) -> Option<BoundingBox> {
    BoundingBox::from_params(
      self.north.as_deref(),
      self.south.as_deref(),
      self.east.as_deref(),
      self.west.as_deref(),
    )
  }
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
  q: Option<String>,
  sd: Option<String>,
  cd: Option<String>,
  #[serde(flatten)]
  bounds: BoundsParams,
}

fn flag(value: Option<&str>, default: bool) -> bool {
  value.map_or(default, |v| matches!(v, "true" | "1"))
}

impl SearchParams {
  fn options(&self, defaults: SearchOptions) -> SearchOptions {
    SearchOptions {
      sort_by_distance: flag(self.sd.as_deref(), defaults.sort_by_distance),
      include_distance: flag(self.cd.as_deref(), defaults.include_distance),
    }
  }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResponse {
  pub query: String,
  pub data: Vec<SearchResult>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DataResponse<T> {
  pub data: T,
}

async fn search(
  State(state): State<AppState>,
  Path(location): Path<String>,
  Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, ApiError> {
  let origin: LatLng = location.parse()?;
  let query = params.q.as_deref().ok_or(SearchError::InvalidQuery)?;
  let data = state
    .ranker
    .search(
      query,
      origin,
      params.bounds.bounds(),
      params.options(state.defaults),
    )
    .await?;
  Ok(Json(SearchResponse {
    query: query.to_string(),
    data,
  }))
}

async fn places(
  State(state): State<AppState>,
  Path(location): Path<String>,
  Query(params): Query<BoundsParams>,
) -> Result<Json<DataResponse<Vec<AddressPin>>>, ApiError> {
  let origin: LatLng = location.parse()?;
  let bounds = params.bounds().ok_or(ApiError::NoPlaces)?;
  let addresses = state
    .store
    .address_pins(&bounds, &origin, MAX_PINS)
    .await
    .inspect_err(|e| warn!("Address pin query on '{}' failed: {e:#}", state.store.name()))
    .unwrap_or_default();
  Ok(Json(DataResponse {
    data: AddressPin::layout(addresses),
  }))
}

/// A numeric key is tried as an address id first, anything else is a place slug.
async fn location(
  State(state): State<AppState>,
  Path(key): Path<String>,
) -> Result<Json<DataResponse<LocationDetail>>, ApiError> {
  let store = &state.store;
  if let Ok(id) = key.parse::<u64>() {
    let address = store
      .address_by_id(id)
      .await
      .inspect_err(|e| warn!("Address lookup on '{}' failed: {e:#}", store.name()))
      .ok()
      .flatten();
    if let Some(address) = address {
      return Ok(Json(DataResponse {
        data: LocationDetail::Address(address),
      }));
    }
  }

  let place = store
    .place_by_slug(&key)
    .await
    .inspect_err(|e| warn!("Place lookup on '{}' failed: {e:#}", store.name()))
    .ok()
    .flatten()
    .ok_or(ApiError::NoLocation)?;
  Ok(Json(DataResponse {
    data: LocationDetail::Place(place),
  }))
}

async fn area(
  State(state): State<AppState>,
  Path(id_or_slug): Path<String>,
) -> Result<Json<DataResponse<Area>>, ApiError> {
  let area = state
    .store
    .area(&id_or_slug)
    .await
    .inspect_err(|e| warn!("Area lookup on '{}' failed: {e:#}", state.store.name()))
    .ok()
    .flatten()
    .ok_or(ApiError::NoArea)?;
  Ok(Json(DataResponse { data: area }))
}

async fn register_place(
  State(state): State<AppState>,
  Json(new): Json<NewPlace>,
) -> Result<(StatusCode, Json<DataResponse<Place>>), ApiError> {
  let registry = state.registry.ok_or(ApiError::ReadOnly)?;
  let place = registry.store.register_place(new)?;
  if let Some(path) = registry.data_file {
    // The dataset is read after taking the lock, so the last save always holds every place.
    let _saving = registry.saving.lock().await;
    let store = registry.store.clone();
    match tokio::task::spawn_blocking(move || store.save(&path)).await {
      Ok(Ok(())) => {}
      Ok(Err(e)) => warn!("Failed to save the dataset: {e:#}"),
      Err(e) => warn!("Saving the dataset did not finish: {e}"),
    }
  }
  Ok((StatusCode::CREATED, Json(DataResponse { data: place })))
}

async fn healthcheck() {}

pub fn router(state: AppState) -> Router {
  Router::new()
    .route("/api/search/{location}", get(search))
    .route("/api/places/{location}", get(places))
    .route("/api/places", post(register_place))
    .route("/api/locations/{key}", get(location))
    .route("/api/areas/{id_or_slug}", get(area))
    .route("/healthcheck", get(healthcheck))
    .with_state(state)
    .layer(
      TraceLayer::new_for_http()
        .make_span_with(trace::DefaultMakeSpan::new().level(tracing::Level::INFO))
        .on_response(trace::DefaultOnResponse::new().level(tracing::Level::INFO)),
    )
}

async fn shutdown_signal() {
  let ctrl_c = async {
    let _ = tokio::signal::ctrl_c()
      .await
      .inspect_err(|e| warn!("Failed to listen for Ctrl+C: {e}"));
  };

  #[cfg(unix)]
  let terminate = async {
    match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
      Ok(mut signal) => {
        signal.recv().await;
      }
      Err(e) => {
        warn!("Failed to install signal handler: {e}");
        std::future::pending::<()>().await;
      }
    }
  };

  #[cfg(not(unix))]
  let terminate = std::future::pending::<()>();

  tokio::select! {
      () = ctrl_c => {},
      () = terminate => {},
  }
  info!("Shutting down");
}

/// Serves the API until Ctrl+C or SIGTERM.
pub async fn serve(addr: SocketAddr, state: AppState) -> anyhow::Result<()> {
  let listener = tokio::net::TcpListener::bind(addr).await?;
  info!("Listening on {}", listener.local_addr()?);
  axum::serve(listener, router(state))
    .with_graceful_shutdown(shutdown_signal())
    .await?;
  Ok(())
}
