//! Glob-style hostname patterns (`*` and `?`).

use regex::Regex;

/// One "any character" step.
///
/// Reads the same in the `regex` crate and in a JavaScript regex with the
/// `u` flag: one code point other than a line terminator.
const ANY_CHAR: &str = r"[^\n\r\u2028\u2029]";

/// A literal or glob pattern compiled to an anchored regex.
///
/// `.` is literal, `*` matches any run of characters and `?` matches exactly
/// one character, where a character is a code point other than a line
/// terminator. The regex body is kept because the PAC emitter embeds the
/// very same text in a JavaScript regex literal with the `u` flag.
#[derive(Debug, Clone)]
pub struct WildcardPattern {
    source: String,
    body: String,
    regex: Regex,
}

impl WildcardPattern {
    /// Compile an already-validated pattern.
    pub(crate) fn compile(source: &str) -> Self {
        let body = regex_body(source);
        // Validated patterns only contain [a-zA-Z0-9*.?-]
        let regex = Regex::new(&format!("^{}$", body)).expect("validated pattern compiles");
        Self {
            source: source.to_string(),
            body,
            regex,
        }
    }

    /// The pattern as written in the rule list.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The unanchored regex body, e.g. `node[^\n\r\u2028\u2029]\.lan` for `node?.lan`.
    pub fn regex_body(&self) -> &str {
        &self.body
    }

    /// Match the whole hostname.
    pub fn is_match(&self, host: &str) -> bool {
        self.regex.is_match(host)
    }
}

impl PartialEq for WildcardPattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for WildcardPattern {}

fn regex_body(pattern: &str) -> String {
    let mut body = String::with_capacity(pattern.len() * 2);
    for c in pattern.chars() {
        match c {
            '.' => body.push_str("\\."),
            '*' => {
                body.push_str(ANY_CHAR);
                body.push('*');
            }
            '?' => body.push_str(ANY_CHAR),
            c => body.push(c),
        }
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regex_body() {
        assert_eq!(
            regex_body("192.168.*.*"),
            r"192\.168\.[^\n\r\u2028\u2029]*\.[^\n\r\u2028\u2029]*"
        );
        assert_eq!(regex_body("host?.lan"), r"host[^\n\r\u2028\u2029]\.lan");
        assert_eq!(regex_body("a-b"), "a-b");
    }

    #[test]
    fn test_literal_is_anchored() {
        let p = WildcardPattern::compile("example.com");
        assert!(p.is_match("example.com"));
        assert!(!p.is_match("www.example.com"));
        assert!(!p.is_match("example.com.cn"));
        assert!(!p.is_match("exampleXcom"));
    }

    #[test]
    fn test_star_and_question() {
        let p = WildcardPattern::compile("192.168.*.*");
        assert!(p.is_match("192.168.1.1"));
        assert!(p.is_match("192.168.0.255"));
        assert!(!p.is_match("10.0.0.1"));

        let p = WildcardPattern::compile("node?.lan");
        assert!(p.is_match("node1.lan"));
        assert!(!p.is_match("node.lan"));
        assert!(!p.is_match("node12.lan"));

        let p = WildcardPattern::compile("*google*");
        assert!(p.is_match("google"));
        assert!(p.is_match("www.google.com"));
    }

    #[test]
    fn test_line_terminators_never_match() {
        let p = WildcardPattern::compile("a*b");
        assert!(p.is_match("a-x-b"));
        assert!(!p.is_match("a\rb"));
        assert!(!p.is_match("a\nb"));
        assert!(!p.is_match("a\u{2028}b"));
        assert!(!p.is_match("a\u{2029}b"));

        // `?` is one code point, even outside the BMP
        let p = WildcardPattern::compile("a?");
        assert!(p.is_match("a\u{1F600}"));
        assert!(p.is_match("a\u{e9}"));
        assert!(!p.is_match("a\r"));
    }

    #[test]
    fn test_case_sensitive() {
        let p = WildcardPattern::compile("example.com");
        assert!(!p.is_match("EXAMPLE.COM"));
    }
}
