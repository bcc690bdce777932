//! Rule patterns and host matching.
//!
//! A rule pattern is compiled once into a [`RulePattern`], the intermediate
//! representation shared by the live matcher and the PAC script emitter.
//! Keeping one IR for both is what keeps the two decisions in agreement.

mod pattern;
mod wildcard;

pub use pattern::RulePattern;
pub use wildcard::WildcardPattern;

use crate::error::PatternError;

/// Maximum pattern length in characters.
pub const MAX_PATTERN_LEN: usize = 255;

/// Check that a pattern only uses `[a-zA-Z0-9*.?-]` and is 1..=255 long.
pub fn validate_pattern(pattern: &str) -> Result<(), PatternError> {
    if pattern.is_empty() {
        return Err(PatternError::EmptyPattern);
    }
    if pattern.len() > MAX_PATTERN_LEN {
        return Err(PatternError::TooLong(pattern.len()));
    }
    if let Some(c) = pattern.chars().find(|c| !is_pattern_char(*c)) {
        return Err(PatternError::DisallowedChar(pattern.to_string(), c));
    }
    Ok(())
}

/// Whether a pattern passes [`validate_pattern`].
pub fn is_valid_pattern(pattern: &str) -> bool {
    validate_pattern(pattern).is_ok()
}

fn is_pattern_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '*' | '.' | '?' | '-')
}

/// Match one raw pattern against one hostname.
///
/// The pattern is validated on every call; invalid patterns never match.
/// Comparison is case-sensitive.
///
/// # Examples
/// ```
/// use pacrule::rule::matches;
///
/// assert!(matches(".example.com", "example.com"));
/// assert!(matches("*.example.com", "a.example.com"));
/// assert!(!matches("*.example.com", "example.com"));
/// assert!(matches("192.168.*.*", "192.168.1.1"));
/// assert!(!matches("bad pattern", "bad pattern"));
/// ```
pub fn matches(pattern: &str, host: &str) -> bool {
    match RulePattern::parse(pattern) {
        Ok(rule) => rule.matches(host),
        Err(_) => false,
    }
}
