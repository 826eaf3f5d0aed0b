//! Account input validation

use regex::Regex;
use std::sync::OnceLock;

/// Longest accepted username, in characters
pub const USERNAME_MAX_LENGTH: usize = 150;

/// Validate username
///
/// Letters, digits and `@ . + - _`, between 3 and 150 characters.
pub fn validate_username(username: &str) -> Result<(), String> {
    let length = username.chars().count();

    if length == 0 {
        return Err("Username is required".to_string());
    }

    if length < 3 {
        return Err("Username must be at least 3 characters long".to_string());
    }

    if length > USERNAME_MAX_LENGTH {
        return Err(format!(
            "Username must be at most {} characters long",
            USERNAME_MAX_LENGTH
        ));
    }

    static USERNAME_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = USERNAME_REGEX
        .get_or_init(|| Regex::new(r"^[\w.@+-]+$").expect("Failed to compile username regex"));

    if !regex.is_match(username) {
        return Err(
            "Username can only contain letters, numbers, and @/./+/-/_ characters".to_string(),
        );
    }

    Ok(())
}

/// Validate email
pub fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("Email is required".to_string());
    }

    if email.len() > 254 {
        return Err("Email must be at most 254 characters long".to_string());
    }

    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = EMAIL_REGEX.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
            .expect("Failed to compile email regex")
    });

    if !regex.is_match(email) {
        return Err("Invalid email format".to_string());
    }

    Ok(())
}

/// Validate password strength
pub fn validate_password(password: &str) -> Result<(), String> {
    let length = password.chars().count();

    if length == 0 {
        return Err("Password is required".to_string());
    }

    if length < 8 {
        return Err("Password must be at least 8 characters long".to_string());
    }

    if length > 128 {
        return Err("Password must be at most 128 characters long".to_string());
    }

    let checks: [(fn(char) -> bool, &str); 4] = [
        (|c| c.is_uppercase(), "one uppercase letter"),
        (|c| c.is_lowercase(), "one lowercase letter"),
        (|c| c.is_ascii_digit(), "one digit"),
        (|c| !c.is_alphanumeric(), "one special character"),
    ];

    for (check, requirement) in checks {
        if !password.chars().any(check) {
            return Err(format!("Password must contain at least {}", requirement));
        }
    }

    Ok(())
}

/// Validate every field of a registration, reporting the first problem
pub fn validate_new_account(username: &str, email: &str, password: &str) -> Result<(), String> {
    validate_username(username)?;
    validate_email(email)?;
    validate_password(password)
}
