//! API request and response data models.
//!
//! Request bodies are typed structs validated once at the boundary with `validate()`; the
//! core only ever sees values that passed. Response models are flattened, serializable views of
//! the records in [`crate::db::models`] and [`crate::requests`], annotated with `utoipa` for the
//! generated OpenAPI document.

pub mod matches;
pub mod messages;
pub mod pagination;
pub mod properties;
pub mod requests;
pub mod sightings;
pub mod subscriptions;

use crate::errors::{Error, Result};
use crate::geo::GeoPoint;

pub(crate) fn validate_point(field: &str, point: &GeoPoint) -> Result<()> {
    point.validate().map_err(|e| Error::bad_request(format!("{field}: {e}")))
}

/// Reject text that is blank (when required) or longer than `max_chars`.
pub(crate) fn validate_text(field: &str, value: &str, max_chars: usize) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::bad_request(format!("{field} must not be empty")));
    }
    let len = value.chars().count();
    if len > max_chars {
        return Err(Error::bad_request(format!("{field} is {len} characters, at most {max_chars} allowed")));
    }
    Ok(())
}

pub(crate) fn validate_optional_text(field: &str, value: Option<&str>, max_chars: usize) -> Result<()> {
    match value {
        Some(v) if v.chars().count() > max_chars => Err(Error::bad_request(format!(
            "{field} is {} characters, at most {max_chars} allowed",
            v.chars().count()
        ))),
        _ => Ok(()),
    }
}

pub(crate) fn validate_positive(field: &str, value: Option<f64>) -> Result<()> {
    match value {
        Some(v) if !(v.is_finite() && v > 0.0) => Err(Error::bad_request(format!("{field} must be greater than 0"))),
        _ => Ok(()),
    }
}
