use std::{fmt::Display, sync::Arc};

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
  geo::{BoundingBox, LatLng},
  store::{AddressCandidate, CandidateFilter, LocationStore, PlaceCandidate},
  text::has_alphanumeric,
};

/// Query value asking for suggestions around the user instead of a text match.
pub const INITIAL_SUGGESTIONS: &str = "*";
/// Default number of suggestions returned by a search.
pub const MAX_SUGGESTIONS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResultKind {
  Address,
  Place,
}

/// A search suggestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
  pub id: u64,
  pub kind: ResultKind,
  pub display_name: String,
  pub lat: f64,
  pub lng: f64,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub distance_km: Option<f64>,
}

impl Display for SearchResult {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self.distance_km {
      Some(km) => write!(f, "{} ({km:.1} km)", self.display_name),
      None => write!(f, "{}", self.display_name),
    }
  }
}

impl From<PlaceCandidate> for SearchResult {
  fn from(place: PlaceCandidate) -> Self {
    Self {
      id: place.id,
      kind: ResultKind::Place,
      display_name: place.name,
      lat: place.lat,
      lng: place.lng,
      distance_km: None,
    }
  }
}

impl From<AddressCandidate> for SearchResult {
  fn from(address: AddressCandidate) -> Self {
    Self {
      id: address.id,
      kind: ResultKind::Address,
      display_name: address.formatted_text,
      lat: address.lat,
      lng: address.lng,
      distance_km: None,
    }
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchOptions {
  pub sort_by_distance: bool,
  pub include_distance: bool,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SearchError {
  #[error("No search found")]
  InvalidQuery,
  #[error("No search found")]
  InvalidBoundingBox,
}

/// What a search matches against.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchMode {
  Text(String),
  Geo(BoundingBox),
}

impl SearchMode {
  /// An empty query or [`INITIAL_SUGGESTIONS`] asks for everything inside `viewport`, any other
  /// query must have a letter or digit.
  pub fn resolve(query: &str, viewport: Option<BoundingBox>) -> Result<Self, SearchError> {
    let query = query.trim();
    if query.is_empty() || query == INITIAL_SUGGESTIONS {
      return match viewport {
        Some(bbox) if bbox.is_valid() => Ok(SearchMode::Geo(bbox)),
        _ => Err(SearchError::InvalidBoundingBox),
      };
    }
    if !has_alphanumeric(query) {
      return Err(SearchError::InvalidQuery);
    }
    Ok(SearchMode::Text(query.to_string()))
  }

  fn filter(&self) -> CandidateFilter {
    match self {
      SearchMode::Text(query) => CandidateFilter::Text(query.clone()),
      SearchMode::Geo(bbox) => CandidateFilter::Within(*bbox),
    }
  }
}

/// Blends places and addresses from a [`LocationStore`] into a bounded list of suggestions.
#[derive(Clone)]
pub struct SearchRanker {
  store: Arc<dyn LocationStore>,
  quota: usize,
}

impl SearchRanker {
  #[must_use]
  pub fn new(store: Arc<dyn LocationStore>) -> Self {
    Self {
      store,
      quota: MAX_SUGGESTIONS,
    }
  }

  #[must_use]
  pub fn with_quota(mut self, quota: usize) -> Self {
    self.quota = quota;
    self
  }

  #[must_use]
  pub fn quota(&self) -> usize {
    self.quota
  }

  /// Places come first, addresses fill up the remaining slots.
  ///
  /// A failing store query counts as no results for that kind.
  pub async fn search(
    &self,
    query: &str,
    origin: LatLng,
    viewport: Option<BoundingBox>,
    options: SearchOptions,
  ) -> Result<Vec<SearchResult>, SearchError> {
    let mode = SearchMode::resolve(query, viewport)?;
    let filter = mode.filter();
    debug!("Searching {} with {mode:?}", self.store.name());

    let places = self
      .store
      .find_places(&filter, self.quota)
      .await
      .inspect_err(|e| warn!("Place query on '{}' failed: {e}", self.store.name()))
      .unwrap_or_default();

    let remaining = self.quota.saturating_sub(places.len());
    let addresses = if remaining > 0 {
      self
        .store
        .find_addresses(&filter, remaining)
        .await
        .inspect_err(|e| warn!("Address query on '{}' failed: {e}", self.store.name()))
        .unwrap_or_default()
    } else {
      Vec::new()
    };

    debug!(
      "Search returned {} places and {} addresses",
      places.len(),
      addresses.len()
    );
    Ok(rank(places, addresses, origin, options, self.quota))
  }
}

/// Concatenates places and addresses, then applies distances and ordering.
///
/// Sorting is stable, so places stay ahead of addresses at the same distance.
#[must_use]
pub fn rank(
  places: Vec<PlaceCandidate>,
  addresses: Vec<AddressCandidate>,
  origin: LatLng,
  options: SearchOptions,
  quota: usize,
) -> Vec<SearchResult> {
  let mut results: Vec<SearchResult> = places
    .into_iter()
    .map(SearchResult::from)
    .chain(addresses.into_iter().map(SearchResult::from))
    .take(quota)
    .collect();

  if options.include_distance {
    for result in &mut results {
      result.distance_km = Some(origin.distance_km(&LatLng::new(result.lat, result.lng)));
    }
  }

  if options.sort_by_distance && options.include_distance {
    results.sort_by(|a, b| match (a.distance_km, b.distance_km) {
      (Some(a), Some(b)) => a.total_cmp(&b),
      _ => std::cmp::Ordering::Equal,
    });
  }

  results
}
