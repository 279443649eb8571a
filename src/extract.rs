// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Request extractors that validate their payload.
//!
//! Both reject with `AppError::InvalidArgument`, so malformed input gets the
//! same JSON error envelope as every other failure.

use crate::error::AppError;
use axum::extract::{FromRequest, FromRequestParts, Query, Request};
use axum::http::request::Parts;
use axum::Json;
use serde::de::DeserializeOwned;
use validator::{Validate, ValidationErrors};

/// JSON body that passed `validator` checks.
#[derive(Debug, Clone)]
pub struct ValidJson<T>(pub T);

/// Query string that passed `validator` checks.
#[derive(Debug, Clone)]
pub struct ValidQuery<T>(pub T);

/// Flatten validation errors into `field: message` pairs, sorted by field.
pub fn describe_validation_errors(errors: &ValidationErrors) -> String {
    let mut parts: Vec<String> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| match &e.message {
                Some(msg) => format!("{}: {}", field, msg),
                None => format!("{}: invalid ({})", field, e.code),
            })
        })
        .collect();
    parts.sort();
    parts.join("; ")
}

impl<T, S> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::InvalidArgument(rejection.body_text()))?;
        value
            .validate()
            .map_err(|e| AppError::InvalidArgument(describe_validation_errors(&e)))?;
        Ok(Self(value))
    }
}

impl<T, S> FromRequestParts<S> for ValidQuery<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| AppError::InvalidArgument(rejection.body_text()))?;
        value
            .validate()
            .map_err(|e| AppError::InvalidArgument(describe_validation_errors(&e)))?;
        Ok(Self(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, Validate)]
    struct Body1 {
        #[validate(length(min = 3, message = "too short"))]
        name: String,
    }

    fn json_request(body: &'static str) -> Request {
        Request::builder()
            .method("POST")
            .uri("/")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_valid_json_accepts_good_body() {
        let ValidJson(body) = ValidJson::<Body1>::from_request(json_request(r#"{"name":"abc"}"#), &())
            .await
            .unwrap();
        assert_eq!(body.name, "abc");
    }

    #[tokio::test]
    async fn test_valid_json_reports_field_message() {
        let err = ValidJson::<Body1>::from_request(json_request(r#"{"name":"a"}"#), &())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidArgument(ref msg) if msg == "name: too short"));
    }

    #[tokio::test]
    async fn test_malformed_json_is_invalid_argument() {
        let err = ValidJson::<Body1>::from_request(json_request("{"), &())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidArgument(_)));
    }
}
