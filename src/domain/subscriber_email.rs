use std::fmt::Display;

use once_cell::sync::Lazy;
use regex::Regex;

// `\w` spelled out as ASCII so that non-ASCII letters are rejected.
static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[A-Za-z0-9_]+([.-]?[A-Za-z0-9_]+)*@[A-Za-z0-9_]+([.-]?[A-Za-z0-9_]+)*(\.[A-Za-z0-9_]{2,3})+$",
    )
    .expect("email pattern is a valid regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum EmailValidationError {
    #[error("Email is required")]
    Missing,
    #[error("Please enter a valid email address")]
    Format,
}

/// A trimmed, lowercased address that matches the waitlist email pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriberEmail(String);

impl SubscriberEmail {
    pub fn parse(s: String) -> Result<Self, EmailValidationError> {
        let trimmed = s.trim();

        if trimmed.is_empty() {
            return Err(EmailValidationError::Missing);
        }
        if !EMAIL_PATTERN.is_match(trimmed) {
            return Err(EmailValidationError::Format);
        }

        Ok(Self(trimmed.to_lowercase()))
    }

    /// Skips validation, for exercising the store's own constraints.
    #[cfg(test)]
    pub(crate) fn unchecked(s: impl Into<String>) -> Self {
        Self(s.into())
    }
}

impl Display for SubscriberEmail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for SubscriberEmail {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
