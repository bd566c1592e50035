use std::{
  path::{Path, PathBuf},
  sync::{PoisonError, RwLock},
};

use anyhow::{Context, Result};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{
  Address, AddressCandidate, AddressDetail, AddressPlaces, CandidateFilter, Dataset,
  LocationStore, Place, PlaceCandidate, PlaceDetail, PlacePin, SocialLink, User,
};
use crate::{
  area::{Area, NewArea},
  geo::{BoundingBox, LatLng},
  text::{contains_ignore_case, has_alphanumeric, is_email, unique_slug},
};

/// Most aliases a place can be registered with.
pub const MAX_ALIASES: usize = 5;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistrationError {
  #[error("The name needs at least one letter or digit")]
  InvalidName,
  #[error("At most {} aliases are allowed", MAX_ALIASES)]
  TooManyAliases,
  #[error("The owner needs a valid email")]
  InvalidOwner,
  #[error("The location is outside of every registered area")]
  OutsideAreas,
  #[error("No identifiers left")]
  IdsExhausted,
}

/// The person registering a place, as known to the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
  pub email: String,
  #[serde(default)]
  pub name: Option<String>,
}

/// The address submitted together with a new place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAddress {
  pub formatted_text: String,
  pub lat: f64,
  pub lng: f64,
  #[serde(default)]
  pub bounds: Option<BoundingBox>,
}

/// The place registration form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPlace {
  pub name: String,
  #[serde(default)]
  pub aliases: Vec<String>,
  #[serde(default)]
  pub social_links: Vec<SocialLink>,
  pub lat: f64,
  pub lng: f64,
  pub address: NewAddress,
  pub owner: NewUser,
}

/// Keeps a [`Dataset`] in memory. Queries see entities in insertion order.
#[derive(Debug, Default)]
pub struct MemoryStore {
  dataset: RwLock<Dataset>,
}

impl MemoryStore {
  #[must_use]
  pub fn new(dataset: Dataset) -> Self {
    Self {
      dataset: RwLock::new(dataset),
    }
  }

  /// Reads a JSON dataset.
  pub fn load(path: &Path) -> Result<Self> {
    let content = std::fs::read_to_string(path)
      .with_context(|| format!("Failed to read dataset {}", path.display()))?;
    let dataset: Dataset = serde_json::from_str(&content)
      .with_context(|| format!("Failed to parse dataset {}", path.display()))?;
    info!(
      "Loaded {} places, {} addresses and {} areas from {}",
      dataset.places.len(),
      dataset.addresses.len(),
      dataset.areas.len(),
      path.display()
    );
    Ok(Self::new(dataset))
  }

  /// Writes the dataset next to `path` and moves it over the old file, so readers never see a
  /// partial write. Concurrent saves to the same path must be serialized by the caller.
  pub fn save(&self, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(&self.dataset())?;
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    std::fs::write(&tmp, json).with_context(|| format!("Failed to write {}", tmp.display()))?;
    std::fs::rename(&tmp, path).with_context(|| format!("Failed to replace {}", path.display()))
  }

  /// A copy of the current content.
  #[must_use]
  pub fn dataset(&self) -> Dataset {
    self
      .dataset
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .clone()
  }

  /// Registers a published place owned by `new.owner`, creating its address unless one exists
  /// at that position and the owner unless one exists with that email.
  ///
  /// Nothing is stored when the registration fails.
  pub fn register_place(&self, new: NewPlace) -> Result<Place, RegistrationError> {
    if !has_alphanumeric(&new.name) {
      return Err(RegistrationError::InvalidName);
    }
    let aliases: Vec<String> = new
      .aliases
      .into_iter()
      .map(|a| a.trim().to_string())
      .filter(|a| !a.is_empty())
      .collect();
    if aliases.len() > MAX_ALIASES {
      return Err(RegistrationError::TooManyAliases);
    }
    let email = new.owner.email.trim();
    if !is_email(email) {
      return Err(RegistrationError::InvalidOwner);
    }

    let mut dataset = self.dataset.write().unwrap_or_else(PoisonError::into_inner);

    let position = LatLng::new(new.lat, new.lng);
    if !dataset.areas.is_empty() && !dataset.areas.iter().any(|a| a.contains(&position)) {
      return Err(RegistrationError::OutsideAreas);
    }

    let address_position = LatLng::new(new.address.lat, new.address.lng);
    let existing_address = dataset
      .addresses
      .iter()
      .find(|a| a.position().same_position(&address_position))
      .map(|a| a.id);
    let existing_owner = dataset.users.iter().find(|u| u.email == email).map(|u| u.id);

    // Every id is taken before anything is stored.
    let id = next_id(dataset.places.iter().map(|p| p.id))?;
    let address_id =
      existing_address.map_or_else(|| next_id(dataset.addresses.iter().map(|a| a.id)), Ok)?;
    let owner_id = existing_owner.map_or_else(|| next_id(dataset.users.iter().map(|u| u.id)), Ok)?;

    if existing_address.is_none() {
      debug!("Creating address {address_id} for '{}'", new.address.formatted_text);
      dataset.addresses.push(Address {
        id: address_id,
        formatted_text: new.address.formatted_text,
        lat: new.address.lat,
        lng: new.address.lng,
        bounds: new.address.bounds,
      });
    }
    if existing_owner.is_none() {
      debug!("Creating user {owner_id}");
      dataset.users.push(User {
        id: owner_id,
        email: email.to_string(),
        name: new.owner.name,
      });
    }

    let slug = unique_slug(&new.name, &format!("local-{id}"), |s| {
      dataset.places.iter().any(|p| p.slug == s)
    });
    let place = Place {
      id,
      name: new.name,
      slug,
      aliases,
      social_links: new.social_links,
      lat: new.lat,
      lng: new.lng,
      published: true,
      address_id,
      owner_id: Some(owner_id),
    };
    info!("Registered place {} '{}'", place.id, place.slug);
    dataset.places.push(place.clone());
    Ok(place)
  }

  /// Adds a curated area.
  pub fn register_area(&self, new: NewArea) -> Result<Area, RegistrationError> {
    if !has_alphanumeric(&new.name) {
      return Err(RegistrationError::InvalidName);
    }

    let mut dataset = self.dataset.write().unwrap_or_else(PoisonError::into_inner);
    let id = next_id(dataset.areas.iter().map(|a| a.id))?;
    let area = Area {
      id,
      slug: unique_slug(&new.name, &format!("centro-{id}"), |s| {
        dataset.areas.iter().any(|a| a.slug == s)
      }),
      name: new.name,
      region: new.region,
    };
    info!("Registered area {} '{}'", area.id, area.slug);
    dataset.areas.push(area.clone());
    Ok(area)
  }
}

fn next_id(ids: impl Iterator<Item = u64>) -> Result<u64, RegistrationError> {
  ids
    .max()
    .map_or(Some(1), |id| id.checked_add(1))
    .ok_or(RegistrationError::IdsExhausted)
}

fn place_matches(place: &Place, filter: &CandidateFilter) -> bool {
  match filter {
    CandidateFilter::Text(query) => {
      contains_ignore_case(&place.name, query)
        || contains_ignore_case(&place.slug, query)
        || place.aliases.iter().any(|a| contains_ignore_case(a, query))
    }
    CandidateFilter::Within(bounds) => bounds.contains(&place.position()),
  }
}

fn address_matches(address: &Address, filter: &CandidateFilter) -> bool {
  match filter {
    CandidateFilter::Text(query) => contains_ignore_case(&address.formatted_text, query),
    CandidateFilter::Within(bounds) => bounds.contains(&address.position()),
  }
}

fn published_at<'a>(dataset: &'a Dataset, address: &Address) -> impl Iterator<Item = &'a Place> {
  let id = address.id;
  dataset
    .places
    .iter()
    .filter(move |p| p.published && p.address_id == id)
}

#[async_trait::async_trait]
impl LocationStore for MemoryStore {
  fn name(&self) -> &'static str {
    "memory"
  }

  async fn find_places(&self, filter: &CandidateFilter, take: usize) -> Result<Vec<PlaceCandidate>> {
    let dataset = self.dataset.read().unwrap_or_else(PoisonError::into_inner);
    Ok(
      dataset
        .places
        .iter()
        .filter(|p| p.published && place_matches(p, filter))
        .take(take)
        .map(|p| PlaceCandidate {
          id: p.id,
          name: p.name.clone(),
          lat: p.lat,
          lng: p.lng,
        })
        .collect(),
    )
  }

  async fn find_addresses(
    &self,
    filter: &CandidateFilter,
    take: usize,
  ) -> Result<Vec<AddressCandidate>> {
    let dataset = self.dataset.read().unwrap_or_else(PoisonError::into_inner);
    Ok(
      dataset
        .addresses
        .iter()
        .filter(|a| address_matches(a, filter) && published_at(&dataset, a).next().is_some())
        .take(take)
        .map(|a| AddressCandidate {
          id: a.id,
          formatted_text: a.formatted_text.clone(),
          lat: a.lat,
          lng: a.lng,
        })
        .collect(),
    )
  }

  async fn address_pins(
    &self,
    bounds: &BoundingBox,
    exclude: &LatLng,
    take: usize,
  ) -> Result<Vec<AddressPlaces>> {
    let dataset = self.dataset.read().unwrap_or_else(PoisonError::into_inner);
    Ok(
      dataset
        .addresses
        .iter()
        .filter(|a| bounds.contains(&a.position()) && !a.position().same_position(exclude))
        .filter_map(|a| {
          let places: Vec<PlacePin> = published_at(&dataset, a).map(PlacePin::from).collect();
          (!places.is_empty()).then(|| AddressPlaces {
            address: AddressCandidate {
              id: a.id,
              formatted_text: a.formatted_text.clone(),
              lat: a.lat,
              lng: a.lng,
            },
            places,
          })
        })
        .take(take)
        .collect(),
    )
  }

  async fn place_by_slug(&self, slug: &str) -> Result<Option<PlaceDetail>> {
    let dataset = self.dataset.read().unwrap_or_else(PoisonError::into_inner);
    let Some(place) = dataset
      .places
      .iter()
      .find(|p| p.published && p.slug == slug)
    else {
      return Ok(None);
    };
    let address = dataset.addresses.iter().find(|a| a.id == place.address_id);
    if address.is_none() {
      warn!("Place '{slug}' points to missing address {}", place.address_id);
    }
    Ok(address.map(|address| PlaceDetail {
      place: place.clone(),
      address: address.clone(),
    }))
  }

  async fn address_by_id(&self, id: u64) -> Result<Option<AddressDetail>> {
    let dataset = self.dataset.read().unwrap_or_else(PoisonError::into_inner);
    Ok(
      dataset
        .addresses
        .iter()
        .find(|a| a.id == id)
        .and_then(|address| {
          let places: Vec<PlacePin> = published_at(&dataset, address).map(PlacePin::from).collect();
          (!places.is_empty()).then(|| AddressDetail {
            address: address.clone(),
            places,
          })
        }),
    )
  }

  async fn area(&self, id_or_slug: &str) -> Result<Option<Area>> {
    let id = id_or_slug.parse::<u64>().ok();
    let dataset = self.dataset.read().unwrap_or_else(PoisonError::into_inner);
    Ok(
      dataset
        .areas
        .iter()
        .find(|a| Some(a.id) == id || a.slug == id_or_slug)
        .cloned(),
    )
  }
}
