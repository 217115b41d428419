//! Field checks applied to directory input before it reaches storage.

use crate::error::ApiError;

pub const MAX_FIELD_LEN: usize = 100;

/// Required and at most [`MAX_FIELD_LEN`] characters.
pub fn validate_string(value: &str, field: &str) -> Result<(), ApiError> {
    if value.is_empty() {
        return Err(ApiError::validation(
            format!("Empty {} field", field),
            format!("The {} field is required", field),
        ));
    }

    if value.chars().count() > MAX_FIELD_LEN {
        return Err(ApiError::validation(
            format!("Invalid {} field", field),
            format!("The {} field must be less than {} characters", field, MAX_FIELD_LEN),
        ));
    }

    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), ApiError> {
    validate_string(email, "email")?;

    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && local
                    .bytes()
                    .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'+' | b'_' | b'.' | b'-'))
                && domain
                    .bytes()
                    .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'-'))
        }
        None => false,
    };

    if !valid {
        return Err(ApiError::validation(
            "Invalid email field",
            "The email field must be a valid email address",
        ));
    }

    Ok(())
}

/// Email rules when the value contains `@`, username rules otherwise.
pub fn validate_username_or_email(value: &str) -> Result<(), ApiError> {
    if value.contains('@') {
        validate_email(value)
    } else {
        validate_string(value, "username")
    }
}
