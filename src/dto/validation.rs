//! Validation helpers for DTOs.

use serde::Deserialize;
use validator::{Validate, ValidationError, ValidationErrors};

/// Longest identifier accepted in a route path.
const MAX_RECORD_ID_LEN: usize = 128;

/// Validates an identifier taken from a route path.
///
/// # Examples
///
/// ```ignore
/// validate_record_id("team-42")  // Ok
/// validate_record_id("")         // Err - empty
/// validate_record_id("a/b")      // Err - slash
/// validate_record_id("   ")      // Err - blank
/// ```
pub fn validate_record_id(id: &str) -> Result<(), ValidationError> {
    let len = id.chars().count();
    if len == 0 || len > MAX_RECORD_ID_LEN {
        let mut err = ValidationError::new("record_id_length");
        err.message = Some(
            format!("Record ID must be 1 to {MAX_RECORD_ID_LEN} characters (got {len})").into(),
        );
        return Err(err);
    }

    if id.trim().is_empty() {
        let mut err = ValidationError::new("record_id_blank");
        err.message = Some("Record ID must not be blank".into());
        return Err(err);
    }

    if id.chars().any(|c| c == '/' || c.is_control()) {
        let mut err = ValidationError::new("record_id_format");
        err.message = Some("Record ID must not contain '/' or control characters".into());
        return Err(err);
    }

    Ok(())
}

/// `{id}` segment of the cascade routes.
#[derive(Debug, Deserialize)]
pub struct RecordIdPath {
    /// Identifier of the root record.
    pub id: String,
}

impl Validate for RecordIdPath {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let Err(e) = validate_record_id(&self.id) {
            errors.add("id", e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
