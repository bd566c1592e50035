pub mod memory;

use std::fmt::Display;

use anyhow::Result;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::{
  area::Area,
  geo::{BoundingBox, LatLng},
};

pub use memory::{MAX_ALIASES, MemoryStore, NewAddress, NewPlace, NewUser, RegistrationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SocialNetwork {
  WhatsApp,
  Instagram,
  Facebook,
  Telegram,
  Email,
}

impl Display for SocialNetwork {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let name = match self {
      SocialNetwork::WhatsApp => "WhatsApp",
      SocialNetwork::Instagram => "Instagram",
      SocialNetwork::Facebook => "Facebook",
      SocialNetwork::Telegram => "Telegram",
      SocialNetwork::Email => "E-mail",
    };
    write!(f, "{name}")
  }
}

/// Where a place can be reached, e.g. an Instagram profile or a `mailto:` link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialLink {
  pub network: SocialNetwork,
  pub url: String,
}

/// Someone who registered places. Identified by email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
  pub id: u64,
  pub email: String,
  #[serde(default)]
  pub name: Option<String>,
}

/// A named business or point of interest ("Local").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Place {
  pub id: u64,
  pub name: String,
  pub slug: String,
  #[serde(default)]
  pub aliases: Vec<String>,
  #[serde(default)]
  pub social_links: Vec<SocialLink>,
  pub lat: f64,
  pub lng: f64,
  #[serde(default = "default_published")]
  pub published: bool,
  pub address_id: u64,
  #[serde(default)]
  pub owner_id: Option<u64>,
}

fn default_published() -> bool {
  true
}

impl Place {
  #[must_use]
  pub fn position(&self) -> LatLng {
    LatLng::new(self.lat, self.lng)
  }
}

/// A street level address ("Endereco") hosting the places registered at its position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
  pub id: u64,
  pub formatted_text: String,
  pub lat: f64,
  pub lng: f64,
  /// Viewport suggested by the geocoder.
  #[serde(default)]
  pub bounds: Option<BoundingBox>,
}

impl Address {
  #[must_use]
  pub fn position(&self) -> LatLng {
    LatLng::new(self.lat, self.lng)
  }
}

/// Everything the store holds, in the shape it is loaded from and saved to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
  #[serde(default)]
  pub places: Vec<Place>,
  #[serde(default)]
  pub addresses: Vec<Address>,
  #[serde(default)]
  pub areas: Vec<Area>,
  #[serde(default)]
  pub users: Vec<User>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceCandidate {
  pub id: u64,
  pub name: String,
  pub lat: f64,
  pub lng: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressCandidate {
  pub id: u64,
  pub formatted_text: String,
  pub lat: f64,
  pub lng: f64,
}

/// How candidates are selected.
#[derive(Debug, Clone, PartialEq)]
pub enum CandidateFilter {
  /// Case-insensitive substring of the name, slug or alias (places) or of the formatted text
  /// (addresses).
  Text(String),
  /// Position inside the box, edges included.
  Within(BoundingBox),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacePin {
  pub id: u64,
  pub name: String,
  pub slug: String,
  pub lat: f64,
  pub lng: f64,
}

impl From<&Place> for PlacePin {
  fn from(place: &Place) -> Self {
    Self {
      id: place.id,
      name: place.name.clone(),
      slug: place.slug.clone(),
      lat: place.lat,
      lng: place.lng,
    }
  }
}

/// A published place with its address, as shown on its own page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceDetail {
  #[serde(flatten)]
  pub place: Place,
  pub address: Address,
}

/// An address with every published place it hosts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressDetail {
  #[serde(flatten)]
  pub address: Address,
  pub places: Vec<PlacePin>,
}

/// What a place slug or an address id leads to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum LocationDetail {
  Place(PlaceDetail),
  Address(AddressDetail),
}

/// An address with the published places it hosts.
#[derive(Debug, Clone, PartialEq)]
pub struct AddressPlaces {
  pub address: AddressCandidate,
  pub places: Vec<PlacePin>,
}

/// A marker to draw on the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressPin {
  pub id: u64,
  pub formatted_text: String,
  pub lat: f64,
  pub lng: f64,
  pub places: Vec<PlacePin>,
  pub z_index: usize,
}

impl AddressPin {
  /// Orders pins north to south and stacks them so that southern pins are drawn in front.
  #[must_use]
  pub fn layout(addresses: Vec<AddressPlaces>) -> Vec<AddressPin> {
    addresses
      .into_iter()
      .sorted_by(|a, b| b.address.lat.total_cmp(&a.address.lat))
      .enumerate()
      .map(|(z_index, AddressPlaces { address, places })| AddressPin {
        id: address.id,
        formatted_text: address.formatted_text,
        lat: address.lat,
        lng: address.lng,
        places,
        z_index,
      })
      .collect()
  }
}

/// The persistence collaborator the search and map endpoints read from.
#[async_trait::async_trait]
pub trait LocationStore: Send + Sync {
  /// Human-readable name of the store, for logs.
  fn name(&self) -> &str;

  /// Published places matching the filter, in insertion order, at most `take`.
  async fn find_places(&self, filter: &CandidateFilter, take: usize) -> Result<Vec<PlaceCandidate>>;

  /// Addresses hosting at least one published place and matching the filter, at most `take`.
  async fn find_addresses(
    &self,
    filter: &CandidateFilter,
    take: usize,
  ) -> Result<Vec<AddressCandidate>>;

  /// Addresses inside `bounds` with their published places, skipping one located exactly at
  /// `exclude`.
  async fn address_pins(
    &self,
    bounds: &BoundingBox,
    exclude: &LatLng,
    take: usize,
  ) -> Result<Vec<AddressPlaces>>;

  /// The published place with this slug.
  async fn place_by_slug(&self, slug: &str) -> Result<Option<PlaceDetail>>;

  /// The address with this id, if it hosts at least one published place.
  async fn address_by_id(&self, id: u64) -> Result<Option<AddressDetail>>;

  /// The area whose id or slug is `id_or_slug`.
  async fn area(&self, id_or_slug: &str) -> Result<Option<Area>>;
}

#[cfg(test)]
mod tests {
  use super::*;

  fn address(id: u64, lat: f64) -> AddressPlaces {
    AddressPlaces {
      address: AddressCandidate {
        id,
        formatted_text: format!("Rua {id}"),
        lat,
        lng: -34.9,
      },
      places: Vec::new(),
    }
  }

  #[test]
  fn pins_are_stacked_south_in_front() {
    let pins = AddressPin::layout(vec![address(1, -8.1), address(2, -8.0), address(3, -8.2)]);
    let order: Vec<_> = pins.iter().map(|p| (p.id, p.z_index)).collect();
    assert_eq!(order, vec![(2, 0), (1, 1), (3, 2)]);
    assert!((pins[0].lng - -34.9).abs() < f64::EPSILON);
  }

  #[test]
  fn dataset_defaults() {
    let dataset: Dataset = serde_json::from_str(
      r#"{"places":[{"id":1,"name":"Bar","slug":"bar","lat":1.0,"lng":2.0,"addressId":3}]}"#,
    )
    .unwrap();
    assert!(dataset.places[0].published);
    assert!(dataset.places[0].aliases.is_empty());
    assert!(dataset.addresses.is_empty());
    assert!(dataset.places[0].social_links.is_empty());
    assert_eq!(dataset.places[0].owner_id, None);
    assert_eq!(dataset.places[0].position(), LatLng::new(1., 2.));
  }

  #[test]
  fn social_networks() {
    let link: SocialLink =
      serde_json::from_str(r#"{"network":"WHATSAPP","url":"https://api.whatsapp.com/send?phone=55"}"#)
        .unwrap();
    assert_eq!(link.network, SocialNetwork::WhatsApp);
    assert_eq!(
      serde_json::to_string(&SocialNetwork::Email).unwrap(),
      r#""EMAIL""#
    );
    assert_eq!(SocialNetwork::Email.to_string(), "E-mail");
    assert_eq!(SocialNetwork::WhatsApp.to_string(), "WhatsApp");
  }

  #[test]
  fn location_detail_json_shape() {
    let detail = LocationDetail::Address(AddressDetail {
      address: Address {
        id: 4,
        formatted_text: "Rua da Aurora, 325".to_string(),
        lat: -8.05,
        lng: -34.88,
        bounds: None,
      },
      places: Vec::new(),
    });
    let json = serde_json::to_value(&detail).unwrap();
    assert_eq!(json["type"], "address");
    assert_eq!(json["id"], 4);
    assert_eq!(json["formattedText"], "Rua da Aurora, 325");
    assert!(json["places"].as_array().unwrap().is_empty());
  }
}
