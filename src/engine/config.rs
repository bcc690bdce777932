//! Live routing configuration.

use serde::{Deserialize, Serialize};

use crate::mode::deserialize_mode_lossy;
use crate::proxy::DEFAULT_PROXY_URL;
use crate::Mode;

/// Config is everything a routing decision depends on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// When false every host goes direct and the system proxy is left alone
    pub proxy_enabled: bool,
    /// Upstream proxy, e.g. `http://localhost:7890`
    pub proxy_url: String,
    /// How a rule match is interpreted
    #[serde(deserialize_with = "deserialize_mode_lossy")]
    pub mode: Mode,
    /// Rules for the current mode
    pub rules: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            proxy_enabled: true,
            proxy_url: DEFAULT_PROXY_URL.to_string(),
            mode: Mode::Whitelist,
            rules: Vec::new(),
        }
    }
}

impl Config {
    /// Create a new enabled Config.
    pub fn new(proxy_url: impl Into<String>, mode: Mode, rules: Vec<String>) -> Self {
        Self {
            proxy_enabled: true,
            proxy_url: proxy_url.into(),
            mode,
            rules,
        }
    }

    /// Merge a partial update. Returns `true` if any field changed.
    pub fn merge(&mut self, update: ConfigUpdate) -> bool {
        let before = self.clone();

        if let Some(enabled) = update.proxy_enabled {
            self.proxy_enabled = enabled;
        }
        // An empty URL leaves the current one in place
        if let Some(url) = update.proxy_url.filter(|u| !u.trim().is_empty()) {
            self.proxy_url = url;
        }
        if let Some(mode) = update.mode {
            self.mode = mode;
        }
        if let Some(rules) = update.rules {
            self.rules = rules;
        }

        *self != before
    }
}

/// ConfigUpdate carries any subset of the [`Config`] fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<Mode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rules: Option<Vec<String>>,
}

impl ConfigUpdate {
    /// Whether the update carries no fields at all.
    pub fn is_empty(&self) -> bool {
        self.proxy_enabled.is_none()
            && self.proxy_url.is_none()
            && self.mode.is_none()
            && self.rules.is_none()
    }

    pub fn with_proxy_enabled(mut self, enabled: bool) -> Self {
        self.proxy_enabled = Some(enabled);
        self
    }

    pub fn with_proxy_url(mut self, url: impl Into<String>) -> Self {
        self.proxy_url = Some(url.into());
        self
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn with_rules<I, S>(mut self, rules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rules = Some(rules.into_iter().map(Into::into).collect());
        self
    }
}
