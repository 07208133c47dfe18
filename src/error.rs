use std::collections::BTreeMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;

use crate::models::PRODUCT_TYPES;

pub type ApiResult<T> = Result<T, ApiError>;

/// Per-field validation messages, rendered as `{"errors": {field: [msgs]}}`.
#[derive(Debug, Default, Clone, Serialize)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl From<validator::ValidationErrors> for FieldErrors {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut out = Self::new();
        for (field, field_errors) in errors.field_errors() {
            for error in field_errors {
                let message = error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| error.code.to_string());
                out.add(field, message);
            }
        }
        out
    }
}

#[derive(Debug)]
pub enum ApiError {
    /// Write rejected before persistence; carries per-field messages.
    Validation(FieldErrors),
    NotFound(String),
    /// Listing route hit with a token outside the known set.
    UnknownProductType(String),
    /// Uniqueness or referential constraint refused the write.
    Conflict(String),
    Database(sqlx::Error),
}

impl From<FieldErrors> for ApiError {
    fn from(errors: FieldErrors) -> Self {
        ApiError::Validation(errors)
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ApiError::Validation(errors.into())
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => ApiError::NotFound("not found".to_string()),
            sqlx::Error::Database(db_err) => match db_err.code().as_deref() {
                // unique_violation
                Some("23505") => ApiError::Conflict(
                    "a record with the same unique value already exists".to_string(),
                ),
                // foreign_key_violation
                Some("23503") => ApiError::Conflict(
                    "operation conflicts with a reference from another record".to_string(),
                ),
                _ => ApiError::Database(err),
            },
            _ => ApiError::Database(err),
        }
    }
}

/// Map a unique-constraint violation to a 409 with a tailored message,
/// deferring to the default conversion for everything else.
pub fn map_unique(err: sqlx::Error, detail: &str) -> ApiError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some("23505") {
            return ApiError::Conflict(detail.to_string());
        }
    }
    ApiError::from(err)
}

/// Map a foreign-key violation (restricted delete or dangling reference)
/// to a 409 with a tailored message.
pub fn map_restrict(err: sqlx::Error, detail: &str) -> ApiError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some("23503") {
            return ApiError::Conflict(detail.to_string());
        }
    }
    ApiError::from(err)
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Validation(errors) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "errors": errors }))).into_response()
            }
            ApiError::NotFound(detail) => {
                (StatusCode::NOT_FOUND, Json(json!({ "detail": detail }))).into_response()
            }
            ApiError::UnknownProductType(token) => (
                StatusCode::NOT_FOUND,
                Json(json!({
                    "detail": format!("unknown product type '{}'", token),
                    "valid_types": PRODUCT_TYPES,
                })),
            )
                .into_response(),
            ApiError::Conflict(detail) => {
                (StatusCode::CONFLICT, Json(json!({ "detail": detail }))).into_response()
            }
            ApiError::Database(err) => {
                log::error!("database error: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "detail": "internal server error" })),
                )
                    .into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_errors_group_by_field() {
        let mut errors = FieldErrors::new();
        errors.add("price", "must not exceed original_price");
        errors.add("price", "must not be negative");
        errors.add("sku", "sku is required");

        let body = serde_json::to_value(&errors).unwrap();
        assert_eq!(
            body,
            json!({
                "price": ["must not exceed original_price", "must not be negative"],
                "sku": ["sku is required"],
            })
        );
    }

    #[test]
    fn empty_errors_convert_to_ok() {
        assert!(FieldErrors::new().into_result().is_ok());
        assert!(FieldErrors::single("name", "name is required")
            .into_result()
            .is_err());
    }
}
