//! JSON body extractor with `validator` checks
//!
//! Both malformed JSON and failed field rules are answered with 422 and a
//! per-field error map.

use axum::{
    async_trait,
    body::Bytes,
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use validator::{Validate, ValidationErrors};

use crate::error::{FieldErrors, ServiceError};

#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await.map_err(malformed)?;

        value.validate().map_err(into_service_error)?;
        Ok(ValidatedJson(value))
    }
}

/// Optional JSON body: an empty body is `None`, anything else must parse
/// and validate exactly like [`ValidatedJson`]
#[derive(Debug, Clone)]
pub struct OptionalValidatedJson<T>(pub Option<T>);

#[async_trait]
impl<T, S> FromRequest<S> for OptionalValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|rejection| ServiceError::Validation {
                message: rejection.body_text(),
                errors: FieldErrors::new(),
            })?;

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(OptionalValidatedJson(None));
        }

        let Json(value) = Json::<T>::from_bytes(&bytes).map_err(malformed)?;
        value.validate().map_err(into_service_error)?;
        Ok(OptionalValidatedJson(Some(value)))
    }
}

fn malformed(rejection: JsonRejection) -> ServiceError {
    ServiceError::Validation {
        message: rejection.body_text(),
        errors: FieldErrors::new(),
    }
}

fn into_service_error(errors: ValidationErrors) -> ServiceError {
    let mut fields = FieldErrors::new();
    for (field, errs) in errors.field_errors() {
        let messages = errs
            .iter()
            .map(|e| match &e.message {
                Some(message) => message.to_string(),
                None => format!("The {} field is invalid.", field.replace('_', " ")),
            })
            .collect();
        fields.insert(field.to_string(), messages);
    }

    let message = fields
        .values()
        .flatten()
        .next()
        .cloned()
        .unwrap_or_else(|| "The given data was invalid.".to_string());

    ServiceError::Validation {
        message,
        errors: fields,
    }
}
