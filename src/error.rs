use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::{geo::LocationError, search::SearchError, store::RegistrationError};

#[derive(Debug, Error)]
pub enum ApiError {
  #[error(transparent)]
  Location(#[from] LocationError),
  #[error(transparent)]
  Search(#[from] SearchError),
  #[error("No places found")]
  NoPlaces,
  #[error("No place found")]
  NoLocation,
  #[error("No area found")]
  NoArea,
  #[error(transparent)]
  Registration(#[from] RegistrationError),
  #[error("Registration is disabled")]
  ReadOnly,
}

impl ApiError {
  #[must_use]
  pub fn status(&self) -> StatusCode {
    match self {
      ApiError::Location(LocationError::Missing) => StatusCode::UNAUTHORIZED,
      ApiError::Location(LocationError::Invalid) => StatusCode::BAD_REQUEST,
      ApiError::Search(_) | ApiError::NoPlaces | ApiError::NoLocation | ApiError::NoArea => {
        StatusCode::NOT_FOUND
      }
      ApiError::Registration(
        RegistrationError::InvalidName
        | RegistrationError::TooManyAliases
        | RegistrationError::InvalidOwner,
      ) => StatusCode::UNPROCESSABLE_ENTITY,
      ApiError::Registration(RegistrationError::OutsideAreas) => StatusCode::FORBIDDEN,
      ApiError::Registration(RegistrationError::IdsExhausted) => StatusCode::INTERNAL_SERVER_ERROR,
      ApiError::ReadOnly => StatusCode::METHOD_NOT_ALLOWED,
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    if status.is_server_error() {
      log::error!("{self}");
    }
    (status, Json(json!({ "error": self.to_string() }))).into_response()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn status_codes() {
    assert_eq!(
      ApiError::from(LocationError::Missing).status(),
      StatusCode::UNAUTHORIZED
    );
    assert_eq!(
      ApiError::from(LocationError::Invalid).status(),
      StatusCode::BAD_REQUEST
    );
    assert_eq!(
      ApiError::from(SearchError::InvalidQuery).status(),
      StatusCode::NOT_FOUND
    );
    assert_eq!(
      ApiError::from(RegistrationError::OutsideAreas).status(),
      StatusCode::FORBIDDEN
    );
    assert_eq!(
      ApiError::from(RegistrationError::TooManyAliases).status(),
      StatusCode::UNPROCESSABLE_ENTITY
    );
    assert_eq!(
      ApiError::from(RegistrationError::IdsExhausted).status(),
      StatusCode::INTERNAL_SERVER_ERROR
    );
    assert_eq!(ApiError::NoArea.status(), StatusCode::NOT_FOUND);
  }

  #[test]
  fn messages() {
    assert_eq!(
      ApiError::from(LocationError::Missing).to_string(),
      "Parameters not provided"
    );
    assert_eq!(
      ApiError::from(SearchError::InvalidBoundingBox).to_string(),
      "No search found"
    );
    assert_eq!(ApiError::NoPlaces.to_string(), "No places found");
    assert_eq!(
      ApiError::from(RegistrationError::TooManyAliases).to_string(),
      "At most 5 aliases are allowed"
    );
  }
}
