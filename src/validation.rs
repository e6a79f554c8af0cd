//! Input validation shared by the HTTP handlers and the API client.
//!
//! Everything here runs before any network call or database write.

use thiserror::Error;

/// Minimum accepted password length.
pub const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("'{0}' is not a valid email address")]
    InvalidEmail(String),
    #[error("Select at least one team year")]
    NoTeamYears,
    #[error("Team year {0} is listed more than once")]
    DuplicateYear(i32),
    #[error("Team year {0} is not selected")]
    YearNotSelected(i32),
    #[error("Academic year must be between 1 and 4, got {0}")]
    InvalidAcademicYear(u8),
    #[error("Password must be at least {MIN_PASSWORD_LEN} characters")]
    PasswordTooShort,
    #[error("Display order batch is empty")]
    EmptyBatch,
}

pub fn require(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::MissingField(field));
    }
    Ok(())
}

/// Loose structural check: one `@` with something on both sides and a dot in
/// the domain.
pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    let email = email.trim();
    require("Email", email)?;

    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    };

    if valid {
        Ok(())
    } else {
        Err(ValidationError::InvalidEmail(email.to_string()))
    }
}

pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::PasswordTooShort);
    }
    Ok(())
}

pub fn validate_academic_year(year: Option<u8>) -> Result<(), ValidationError> {
    match year {
        Some(y) if !(1..=4).contains(&y) => Err(ValidationError::InvalidAcademicYear(y)),
        _ => Ok(()),
    }
}
