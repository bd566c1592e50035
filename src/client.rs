use anyhow::{Result, anyhow, bail};
use log::debug;
use serde::Deserialize;

use crate::{
  geo::{BoundingBox, LatLng},
  search::{SearchOptions, SearchResult},
  server::{DataResponse, SearchResponse},
  store::{NewPlace, Place},
};

#[derive(Debug, Deserialize)]
struct ErrorBody {
  error: String,
}

/// HTTP client for a running vouali server.
#[derive(Clone)]
pub struct SearchClient {
  base_url: String,
  client: surf::Client,
}

impl SearchClient {
  #[must_use]
  pub fn new(base_url: impl Into<String>) -> Self {
    Self {
      base_url: base_url.into().trim_end_matches('/').to_string(),
      client: surf::Client::new(),
    }
  }

  #[must_use]
  pub fn search_url(
    &self,
    origin: LatLng,
    query: &str,
    viewport: Option<BoundingBox>,
    options: SearchOptions,
  ) -> String {
    let mut url = format!(
      "{}/api/search/{},{}?q={}&sd={}&cd={}",
      self.base_url,
      origin.lat,
      origin.lng,
      urlencoding::encode(query),
      options.sort_by_distance,
      options.include_distance
    );
    if let Some(bbox) = viewport {
      // Encoded twice, like the web client does.
      for (key, value) in [
        ("north", bbox.north),
        ("south", bbox.south),
        ("east", bbox.east),
        ("west", bbox.west),
      ] {
        let once = urlencoding::encode(&value.to_string()).into_owned();
        url.push_str(&format!("&{key}={}", urlencoding::encode(&once)));
      }
    }
    url
  }

  /// Suggestions for `query`. A query the server finds nothing for yields no suggestions.
  pub async fn search(
    &self,
    origin: LatLng,
    query: &str,
    viewport: Option<BoundingBox>,
    options: SearchOptions,
  ) -> Result<Vec<SearchResult>> {
    let url = self.search_url(origin, query, viewport, options);
    debug!("GET {url}");
    let mut response = self
      .client
      .get(&url)
      .await
      .map_err(|e| anyhow!("Search request failed: {e}"))?;

    if response.status() == surf::StatusCode::NotFound {
      return Ok(Vec::new());
    }
    if !response.status().is_success() {
      let status = response.status();
      let body: ErrorBody = response
        .body_json()
        .await
        .map_err(|e| anyhow!("Search failed with {status}: {e}"))?;
      bail!("Search failed with {status}: {}", body.error);
    }

    let body: SearchResponse = response
      .body_json()
      .await
      .map_err(|e| anyhow!("Invalid search response: {e}"))?;
    Ok(body.data)
  }

  pub async fn register_place(&self, new: &NewPlace) -> Result<Place> {
    let mut response = self
      .client
      .post(format!("{}/api/places", self.base_url))
      .body_json(new)
      .map_err(|e| anyhow!("Failed to encode place: {e}"))?
      .await
      .map_err(|e| anyhow!("Registration request failed: {e}"))?;

    if !response.status().is_success() {
      let status = response.status();
      let body: ErrorBody = response
        .body_json()
        .await
        .map_err(|e| anyhow!("Registration failed with {status}: {e}"))?;
      bail!("Registration failed with {status}: {}", body.error);
    }

    let body: DataResponse<Place> = response
      .body_json()
      .await
      .map_err(|e| anyhow!("Invalid registration response: {e}"))?;
    Ok(body.data)
  }

  pub async fn healthcheck(&self) -> bool {
    self
      .client
      .get(format!("{}/healthcheck", self.base_url))
      .await
      .is_ok_and(|r| r.status().is_success())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn urls() {
    let client = SearchClient::new("http://localhost:3210/");
    let url = client.search_url(
      LatLng::new(-8.05, -34.9),
      "pão & cia",
      None,
      SearchOptions {
        sort_by_distance: true,
        include_distance: false,
      },
    );
    assert_eq!(
      url,
      "http://localhost:3210/api/search/-8.05,-34.9?q=p%C3%A3o%20%26%20cia&sd=true&cd=false"
    );

    let url = client.search_url(
      LatLng::new(0., 0.),
      "*",
      Some(BoundingBox::new(1.5, -1., 2., -2.)),
      SearchOptions::default(),
    );
    assert!(url.ends_with("&north=1.5&south=-1&east=2&west=-2"), "{url}");
  }
}
