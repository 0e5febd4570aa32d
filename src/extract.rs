//! Request extractors that report malformed input as `ApiError::Validation`

use async_trait::async_trait;
use axum::extract::{FromRequest, FromRequestParts, Path, Query, Request};
use axum::http::{header::CONTENT_TYPE, request::Parts};
use axum::{Form, Json};
use serde::de::DeserializeOwned;

use crate::error::ApiError;

/// Request body decoded from JSON or `application/x-www-form-urlencoded`,
/// chosen by the `Content-Type` header. Anything else is read as JSON.
pub struct Payload<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for Payload<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_form = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.starts_with("application/x-www-form-urlencoded"))
            .unwrap_or(false);

        if is_form {
            let Form(value) = Form::<T>::from_request(req, state)
                .await
                .map_err(|rejection| ApiError::validation("body", rejection.body_text()))?;
            Ok(Self(value))
        } else {
            let Json(value) = Json::<T>::from_request(req, state)
                .await
                .map_err(|rejection| ApiError::validation("body", rejection.body_text()))?;
            Ok(Self(value))
        }
    }
}

/// Query string that failed to deserialize is reported against `query`.
pub struct ValidQuery<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for ValidQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| ApiError::validation("query", rejection.body_text()))?;
        Ok(Self(value))
    }
}

/// Integer tutorial id taken from the path.
pub struct TutorialId(pub i32);

#[async_trait]
impl<S> FromRequestParts<S> for TutorialId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(id): Path<i32> = Path::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::validation("id", "id must be an integer"))?;
        Ok(Self(id))
    }
}
