//! Routing mode definitions.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use crate::Target;

/// Mode decides what a rule match means.
///
/// - `Whitelist`: matched hosts go direct, everything else is proxied.
/// - `Blacklist`: matched hosts are proxied, everything else goes direct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Whitelist,
    Blacklist,
}

impl Mode {
    /// Parse a mode from a string (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "whitelist" => Some(Mode::Whitelist),
            "blacklist" => Some(Mode::Blacklist),
            _ => None,
        }
    }

    /// Parse a mode, falling back to `Whitelist` for unknown values.
    pub fn from_str_lossy(s: &str) -> Self {
        Self::parse(s).unwrap_or_else(|| {
            log::warn!("Unknown mode {:?}, using whitelist", s);
            Mode::Whitelist
        })
    }

    /// Get the canonical string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Whitelist => "whitelist",
            Mode::Blacklist => "blacklist",
        }
    }

    /// Map "did any rule match" to a routing target.
    pub fn target(&self, matched: bool) -> Target {
        let is_proxy = match self {
            Mode::Whitelist => !matched,
            Mode::Blacklist => matched,
        };
        Target::from_proxy_flag(is_proxy)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("unknown mode: {}", s))
    }
}

/// Deserialize a stored mode without failing on unknown strings.
pub(crate) fn deserialize_mode_lossy<'de, D>(deserializer: D) -> Result<Mode, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.map(|s| Mode::from_str_lossy(&s)).unwrap_or_default())
}
