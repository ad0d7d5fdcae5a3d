//! Input validation for API requests.
//!
//! Field-level checks run before the store is reached; failures are collected
//! with the `ValidationErrorBuilder` from the `error` module and map to a 422
//! with a `{field, message}` list.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Basic email shape check; uniqueness is enforced by the store
    static ref EMAIL_REGEX: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
}

/// Validate an email address
pub fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("Email is required".to_string());
    }

    if email.len() > 254 {
        return Err("Email is too long (max 254 characters)".to_string());
    }

    if !EMAIL_REGEX.is_match(email) {
        return Err("Invalid email format".to_string());
    }

    Ok(())
}

/// Validate a username
pub fn validate_username(username: &str) -> Result<(), String> {
    if username.is_empty() {
        return Err("Username is required".to_string());
    }

    if username.len() > 50 {
        return Err("Username is too long (max 50 characters)".to_string());
    }

    Ok(())
}

/// Validate a password
pub fn validate_password(password: &str) -> Result<(), String> {
    if password.len() < 8 {
        return Err("Password must be at least 8 characters".to_string());
    }

    if password.len() > 128 {
        return Err("Password is too long (max 128 characters)".to_string());
    }

    Ok(())
}

/// Validate a habit name
pub fn validate_habit_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("Habit name is required".to_string());
    }

    if name.len() > 100 {
        return Err("Habit name is too long (max 100 characters)".to_string());
    }

    Ok(())
}

/// Validate a habit description
pub fn validate_habit_description(description: &str) -> Result<(), String> {
    if description.len() > 500 {
        return Err("Habit description is too long (max 500 characters)".to_string());
    }

    Ok(())
}

/// Validate a frequency day-id list against the 1-7 weekday scheme
pub fn validate_frequency(frequency: &[i64]) -> Result<(), String> {
    if frequency.is_empty() {
        return Err("Frequency must contain at least one day".to_string());
    }

    for day_id in frequency {
        if !(1..=7).contains(day_id) {
            return Err(format!("Invalid day id: {} (must be 1-7)", day_id));
        }
    }

    Ok(())
}
