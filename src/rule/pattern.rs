//! The compiled rule pattern.

use std::fmt;

use super::{validate_pattern, WildcardPattern};
use crate::error::PatternError;

/// RulePattern is one validated rule in compiled form.
///
/// # Pattern Formats
/// - Suffix match: `.example.com` - matches `example.com` and every subdomain
/// - Subdomain match: `*.example.com` - matches subdomains only, not `example.com`
/// - Glob match: `example.com`, `192.168.*.*`, `node?.lan` - anchored at both ends
///
/// A leading `.` is recognised before a leading `*.`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RulePattern {
    SuffixDot { base: String },
    WildcardSubdomain { base: String },
    Wildcard(WildcardPattern),
}

impl RulePattern {
    /// Validate and compile a pattern.
    ///
    /// # Examples
    /// ```
    /// use pacrule::rule::RulePattern;
    ///
    /// let rule = RulePattern::parse(".youtube.com").unwrap();
    /// assert!(rule.matches("youtube.com"));
    /// assert!(rule.matches("www.youtube.com"));
    /// assert!(RulePattern::parse("you tube.com").is_err());
    /// ```
    pub fn parse(pattern: &str) -> Result<Self, PatternError> {
        validate_pattern(pattern)?;

        if let Some(base) = pattern.strip_prefix('.') {
            return Ok(RulePattern::SuffixDot {
                base: base.to_string(),
            });
        }
        if let Some(base) = pattern.strip_prefix("*.") {
            return Ok(RulePattern::WildcardSubdomain {
                base: base.to_string(),
            });
        }
        Ok(RulePattern::Wildcard(WildcardPattern::compile(pattern)))
    }

    /// Match a hostname against this pattern.
    pub fn matches(&self, host: &str) -> bool {
        match self {
            RulePattern::SuffixDot { base } => host == base || is_subdomain_of(host, base),
            RulePattern::WildcardSubdomain { base } => is_subdomain_of(host, base),
            RulePattern::Wildcard(wildcard) => wildcard.is_match(host),
        }
    }
}

/// `host` ends with `"." + base`.
fn is_subdomain_of(host: &str, base: &str) -> bool {
    host.len() > base.len()
        && host.ends_with(base)
        && host.as_bytes()[host.len() - base.len() - 1] == b'.'
}

impl fmt::Display for RulePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RulePattern::SuffixDot { base } => write!(f, ".{}", base),
            RulePattern::WildcardSubdomain { base } => write!(f, "*.{}", base),
            RulePattern::Wildcard(wildcard) => f.write_str(wildcard.source()),
        }
    }
}
