//! RuleSet evaluation and rule-list parsing.

mod parser;

pub use parser::{merge_rules, parse_rules, ParsedRules};

use crate::rule::RulePattern;
use crate::{Mode, Target};

/// RuleSet is a compiled list of rule patterns.
///
/// Order does not affect the outcome and duplicates are harmless; the list
/// is kept in input order only so the first hit short-circuits predictably.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSet {
    patterns: Vec<RulePattern>,
}

impl RuleSet {
    /// Create an empty rule set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile raw patterns, dropping the invalid ones.
    ///
    /// # Examples
    /// ```
    /// use pacrule::{Mode, RuleSet, Target};
    ///
    /// let rules = RuleSet::from_patterns(["*.cn", ".qq.com", "not valid"]);
    /// assert_eq!(rules.len(), 2);
    /// assert_eq!(rules.decide(Mode::Blacklist, "www.qq.com"), Target::Proxy);
    /// assert_eq!(rules.decide(Mode::Blacklist, "www.google.com"), Target::Direct);
    /// ```
    pub fn from_patterns<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut ruleset = Self::new();
        for pattern in patterns {
            ruleset.add_pattern(pattern.as_ref());
        }
        ruleset
    }

    /// Compile and append one pattern. Returns `false` if it was dropped.
    pub fn add_pattern(&mut self, pattern: &str) -> bool {
        match RulePattern::parse(pattern) {
            Ok(rule) => {
                self.patterns.push(rule);
                true
            }
            Err(e) => {
                log::warn!("Dropping rule pattern {:?}: {}", pattern, e);
                false
            }
        }
    }

    /// Get the number of compiled patterns.
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// Check if this rule set has no patterns.
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// The compiled patterns, in input order.
    pub fn patterns(&self) -> &[RulePattern] {
        &self.patterns
    }

    /// Whether any pattern matches the host.
    pub fn matches_any(&self, host: &str) -> bool {
        self.patterns.iter().any(|p| p.matches(host))
    }

    /// Apply mode semantics to the match result.
    pub fn decide(&self, mode: Mode, host: &str) -> Target {
        mode.target(self.matches_any(host))
    }
}

impl<S: AsRef<str>> FromIterator<S> for RuleSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::from_patterns(iter)
    }
}

/// Whether any rule matches the host.
pub fn matches_any(rules: &RuleSet, host: &str) -> bool {
    rules.matches_any(host)
}

/// Decide DIRECT or PROXY for a host.
pub fn decide(rules: &RuleSet, mode: Mode, host: &str) -> Target {
    rules.decide(mode, host)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_ruleset() {
        let ruleset = RuleSet::new();
        assert!(ruleset.is_empty());
        assert!(!ruleset.matches_any("example.com"));
    }

    #[test]
    fn test_invalid_patterns_dropped() {
        let ruleset = RuleSet::from_patterns(["good.com", "bad pattern", "", "坏.com", "*.ok"]);
        assert_eq!(ruleset.len(), 2);
        assert!(ruleset.matches_any("good.com"));
        assert!(ruleset.matches_any("a.ok"));
    }

    #[test]
    fn test_empty_rules_by_mode() {
        let ruleset = RuleSet::new();
        assert_eq!(ruleset.decide(Mode::Whitelist, "example.com"), Target::Proxy);
        assert_eq!(ruleset.decide(Mode::Blacklist, "example.com"), Target::Direct);
    }

    #[test]
    fn test_mode_inversion() {
        let ruleset = RuleSet::from_patterns([".example.com", "10.*"]);
        for host in ["example.com", "a.example.com", "10.1.2.3", "other.org", ""] {
            let white = decide(&ruleset, Mode::Whitelist, host);
            let black = decide(&ruleset, Mode::Blacklist, host);
            assert_eq!(white == Target::Proxy, black == Target::Direct, "host {host}");
        }
    }

    #[test]
    fn test_duplicates_harmless() {
        let once = RuleSet::from_patterns(["*.cn"]);
        let twice = RuleSet::from_patterns(["*.cn", "*.cn"]);
        for host in ["a.cn", "cn", "a.com"] {
            assert_eq!(once.matches_any(host), twice.matches_any(host));
        }
    }

    #[test]
    fn test_order_independent() {
        let a: RuleSet = ["*.cn", "192.168.*", ".qq.com"].into_iter().collect();
        let b: RuleSet = [".qq.com", "*.cn", "192.168.*"].into_iter().collect();
        for host in ["a.cn", "192.168.9.9", "qq.com", "example.com"] {
            assert_eq!(matches_any(&a, host), matches_any(&b, host));
        }
    }
}
