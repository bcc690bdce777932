//! Error types for pacrule.

use thiserror::Error;

/// Error type for pacrule operations.
///
/// The decision path never returns this type: malformed proxy URLs and
/// invalid rule patterns have defined fallbacks. Errors only surface from
/// I/O, rule-list fetching and platform sinks.
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Rule list URL is not http(s)
    #[error("invalid rules URL (only http:// and https:// are supported): {0}")]
    InvalidRulesUrl(String),

    /// Rule list download failed
    #[error("download error: {0}")]
    Download(String),

    /// Rule list downloaded but empty
    #[error("rule list is empty: {0}")]
    EmptyRuleList(String),

    /// Platform proxy installation failed
    #[error("proxy install error: {0}")]
    Install(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type alias for pacrule operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for rule pattern validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PatternError {
    /// Empty pattern
    #[error("empty pattern")]
    EmptyPattern,

    /// Pattern longer than 255 characters
    #[error("pattern too long ({0} characters, max 255)")]
    TooLong(usize),

    /// Character outside `[a-zA-Z0-9*.?-]`
    #[error("disallowed character {1:?} in pattern: {0}")]
    DisallowedChar(String, char),
}

/// Error type for proxy URL parsing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProxyUrlError {
    /// Not a URL at all
    #[error("unparsable URL {0}: {1}")]
    Unparsable(String, url::ParseError),

    /// Scheme other than http/https
    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    /// Missing, non-ASCII or otherwise unusable hostname
    #[error("unsupported hostname: {0}")]
    InvalidHost(String),

    /// Port absent or outside 1..=65535
    #[error("missing or invalid port in {0}")]
    InvalidPort(String),
}
