//! Input preconditions checked before any remote call.

use once_cell::sync::Lazy;
use regex::Regex;

/// Longest login the platform accepts.
pub const MAX_USERNAME_LEN: usize = 39;

// Alphanumeric runs joined by single hyphens: no leading, trailing or doubled hyphen.
static USERNAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9]+(?:-[A-Za-z0-9]+)*$").expect("invalid username regex")
});

/// Whether `username` is a syntactically valid login.
pub fn is_valid_username(username: &str) -> bool {
    username.len() <= MAX_USERNAME_LEN && USERNAME_RE.is_match(username)
}

/// Trimmed token, or `None` when nothing is left.
pub fn normalize_token(token: &str) -> Option<&str> {
    let trimmed = token.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}
