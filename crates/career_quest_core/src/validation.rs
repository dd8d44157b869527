//! crates/career_quest_core/src/validation.rs
//!
//! Input checks for account forms. Each failure carries the message shown to the user.

use regex::Regex;
use std::sync::OnceLock;

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("All fields are required.")]
    MissingFields,
    #[error("Name and Email fields are required.")]
    MissingProfileFields,
    #[error("The email format is invalid.")]
    InvalidEmail,
    #[error("The password must be at least 6 characters long.")]
    PasswordTooShort,
    #[error("New password and confirm password do not match.")]
    PasswordMismatch,
}

/// A trimmed, checked registration form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub name: String,
    pub email: String,
}

/// A trimmed, checked profile form. `new_password` is `None` when left blank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub name: String,
    pub email: String,
    pub new_password: Option<String>,
}

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?)+$")
            .expect("email pattern is valid")
    })
}

pub fn is_valid_email(email: &str) -> bool {
    email_regex().is_match(email)
}

pub fn validate_registration(
    name: &str,
    email: &str,
    password: &str,
) -> Result<Registration, ValidationError> {
    let name = name.trim();
    let email = email.trim();
    if name.is_empty() || email.is_empty() || password.is_empty() {
        return Err(ValidationError::MissingFields);
    }
    if !is_valid_email(email) {
        return Err(ValidationError::InvalidEmail);
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::PasswordTooShort);
    }
    Ok(Registration {
        name: name.to_string(),
        email: email.to_string(),
    })
}

pub fn validate_profile_update(
    name: &str,
    email: &str,
    new_password: Option<&str>,
    confirm_password: Option<&str>,
) -> Result<ProfileUpdate, ValidationError> {
    let name = name.trim();
    let email = email.trim();
    if name.is_empty() || email.is_empty() {
        return Err(ValidationError::MissingProfileFields);
    }
    if !is_valid_email(email) {
        return Err(ValidationError::InvalidEmail);
    }

    let new_password = match new_password.filter(|p| !p.is_empty()) {
        None => None,
        Some(password) => {
            if Some(password) != confirm_password {
                return Err(ValidationError::PasswordMismatch);
            }
            if password.chars().count() < MIN_PASSWORD_LEN {
                return Err(ValidationError::PasswordTooShort);
            }
            Some(password.to_string())
        }
    };

    Ok(ProfileUpdate {
        name: name.to_string(),
        email: email.to_string(),
        new_password,
    })
}

//=========================================================================================
// Password strength (advisory)
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordStrength {
    /// Number of satisfied checks, 0..=5.
    pub score: u8,
}

impl PasswordStrength {
    pub fn label(&self) -> &'static str {
        match self.score {
            0 => "Very Weak",
            1 | 2 => "Weak",
            3 => "Fair",
            4 => "Good",
            _ => "Strong",
        }
    }
}

const SPECIAL_CHARS: &str = "!@#$%^&*(),.?\":{}|<>";

pub fn password_strength(password: &str) -> PasswordStrength {
    let checks = [
        password.chars().count() >= 8,
        password.chars().any(|c| c.is_ascii_uppercase()),
        password.chars().any(|c| c.is_ascii_lowercase()),
        password.chars().any(|c| c.is_ascii_digit()),
        password.chars().any(|c| SPECIAL_CHARS.contains(c)),
    ];
    PasswordStrength {
        score: checks.iter().filter(|&&ok| ok).count() as u8,
    }
}
