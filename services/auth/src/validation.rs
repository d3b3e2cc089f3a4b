//! Input validation for signup credentials

use regex::Regex;
use std::sync::OnceLock;

const MAX_USERNAME_LEN: usize = 32;
const MAX_PASSWORD_LEN: usize = 128;

/// Validate username
///
/// Any characters are accepted except whitespace; the length bound matches
/// the `users.username` column.
pub fn validate_username(username: &str) -> Result<(), String> {
    if username.is_empty() {
        return Err("Username is required".to_string());
    }

    if username.chars().count() > MAX_USERNAME_LEN {
        return Err(format!(
            "Username must be at most {} characters long",
            MAX_USERNAME_LEN
        ));
    }

    static USERNAME_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = USERNAME_REGEX
        .get_or_init(|| Regex::new(r"^\S+$").expect("Failed to compile username regex"));

    if !regex.is_match(username) {
        return Err("Username cannot contain whitespace".to_string());
    }

    Ok(())
}

/// Validate password
///
/// Only presence and an upper bound are enforced; the bound keeps hashing
/// cost predictable.
pub fn validate_password(password: &str) -> Result<(), String> {
    if password.is_empty() {
        return Err("Password is required".to_string());
    }

    if password.chars().count() > MAX_PASSWORD_LEN {
        return Err(format!(
            "Password must be at most {} characters long",
            MAX_PASSWORD_LEN
        ));
    }

    Ok(())
}
