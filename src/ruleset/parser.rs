//! Rule-list text format.
//!
//! One pattern per line. Blank lines and lines starting with `#`, `;`, `//`
//! or `[` are ignored, so most published hostname lists load unchanged.

use ahash::AHashSet;
use std::io::{BufRead, BufReader, Read};

use crate::rule::is_valid_pattern;

/// Line prefixes treated as comments or section headers.
const COMMENT_PREFIXES: &[&str] = &["#", ";", "//", "["];

/// Result of parsing a rule list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedRules {
    /// The text as given, kept for round-trip editing
    pub raw: String,
    /// Valid patterns in order of appearance
    pub rules: Vec<String>,
    /// Number of non-blank lines in `raw`
    pub total_lines: usize,
}

impl ParsedRules {
    /// Number of non-blank lines that did not yield a rule.
    pub fn ignored(&self) -> usize {
        self.total_lines - self.rules.len()
    }

    /// Parse rules from a reader.
    pub fn from_reader<R: Read>(reader: R) -> crate::Result<Self> {
        let mut raw = String::new();
        for line in BufReader::new(reader).lines() {
            raw.push_str(&line?);
            raw.push('\n');
        }
        Ok(parse_rules(&raw))
    }
}

/// Parse rule-list text into valid patterns.
///
/// # Examples
/// ```
/// use pacrule::ruleset::parse_rules;
///
/// let parsed = parse_rules("# proxied\n*.google.com\n\n[section]\nbad rule\n.youtube.com\n");
/// assert_eq!(parsed.rules, vec!["*.google.com", ".youtube.com"]);
/// assert_eq!(parsed.total_lines, 5);
/// ```
pub fn parse_rules(raw: &str) -> ParsedRules {
    let mut rules = Vec::new();
    let mut total_lines = 0;

    for line in raw.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        total_lines += 1;

        if COMMENT_PREFIXES.iter().any(|p| line.starts_with(p)) {
            log::debug!("Ignoring comment line: {}", line);
            continue;
        }

        if is_valid_pattern(line) {
            rules.push(line.to_string());
        } else {
            log::warn!("Invalid rule pattern: {}", line);
        }
    }

    ParsedRules {
        raw: raw.to_string(),
        rules,
        total_lines,
    }
}

/// Merge manually entered rules with rules fetched from a URL.
///
/// De-duplicated concatenation: manual rules first, first occurrence wins.
pub fn merge_rules<A, B>(manual: A, remote: B) -> Vec<String>
where
    A: IntoIterator,
    A::Item: AsRef<str>,
    B: IntoIterator,
    B::Item: AsRef<str>,
{
    let mut seen = AHashSet::new();
    let mut merged = Vec::new();

    let manual = manual.into_iter().map(|r| r.as_ref().to_string());
    let remote = remote.into_iter().map(|r| r.as_ref().to_string());
    for rule in manual.chain(remote) {
        if seen.insert(rule.clone()) {
            merged.push(rule);
        }
    }

    merged
}
