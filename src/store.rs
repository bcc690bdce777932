//! Persisted configuration schema.
//!
//! The host application owns the actual key/value store; this module defines
//! the keys, how a snapshot of them is loaded and saved, and how change
//! notifications are folded back into the snapshot.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::Path;

use crate::error::{Error, Result};
use crate::mode::deserialize_mode_lossy;
use crate::proxy::DEFAULT_PROXY_URL;
use crate::rule::is_valid_pattern;
use crate::ruleset::{merge_rules, ParsedRules};
use crate::{Config, Mode};

/// Storage keys whose change affects routing.
pub const ROUTING_KEYS: &[&str] = &[
    "proxyEnabled",
    "proxyUrl",
    "mode",
    "whitelistRules",
    "blacklistRules",
    "whitelistUrlRulesParsed",
    "blacklistUrlRulesParsed",
];

/// StoredConfig mirrors every key kept in persistent storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoredConfig {
    pub proxy_enabled: bool,
    pub proxy_url: String,
    #[serde(deserialize_with = "deserialize_mode_lossy")]
    pub mode: Mode,
    /// Manually entered whitelist rules
    pub whitelist_rules: Vec<String>,
    /// Manually entered blacklist rules
    pub blacklist_rules: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub whitelist_raw_rules: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blacklist_raw_rules: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub whitelist_rules_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blacklist_rules_url: Option<String>,
    /// Raw text last fetched from `whitelistRulesUrl`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub whitelist_url_rules: Option<String>,
    /// Raw text last fetched from `blacklistRulesUrl`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blacklist_url_rules: Option<String>,
    pub whitelist_url_rules_parsed: Vec<String>,
    pub blacklist_url_rules_parsed: Vec<String>,
}

impl Default for StoredConfig {
    fn default() -> Self {
        Self {
            proxy_enabled: true,
            proxy_url: DEFAULT_PROXY_URL.to_string(),
            mode: Mode::Whitelist,
            whitelist_rules: Vec::new(),
            blacklist_rules: Vec::new(),
            whitelist_raw_rules: None,
            blacklist_raw_rules: None,
            whitelist_rules_url: None,
            blacklist_rules_url: None,
            whitelist_url_rules: None,
            blacklist_url_rules: None,
            whitelist_url_rules_parsed: Vec::new(),
            blacklist_url_rules_parsed: Vec::new(),
        }
    }
}

/// One key's change notification.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageChange {
    #[serde(default)]
    pub old_value: Option<Value>,
    /// `None` means the key was removed
    #[serde(default)]
    pub new_value: Option<Value>,
}

impl StorageChange {
    /// A change that sets `value`.
    pub fn set(value: impl Into<Value>) -> Self {
        Self {
            old_value: None,
            new_value: Some(value.into()),
        }
    }

    /// A change that removes the key.
    pub fn removed() -> Self {
        Self::default()
    }
}

/// Change notifications keyed by storage key.
pub type StorageChanges = BTreeMap<String, StorageChange>;

impl StoredConfig {
    /// Load from a JSON or YAML file (by extension).
    ///
    /// Returns the default configuration if the file doesn't exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            log::info!("No config at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let config: Self = match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => serde_yaml::from_str(&content)?,
            _ => serde_json::from_str(&content)?,
        };

        log::info!(
            "Loaded config from {:?}: enabled={}, mode={}, proxy={}",
            path,
            config.proxy_enabled,
            config.mode,
            config.proxy_url
        );
        Ok(config)
    }

    /// Save as JSON, replacing the file atomically.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = serde_json::to_string_pretty(self)?;

        let temp_path = path.with_extension("tmp");
        let mut temp_file = fs::File::create(&temp_path)?;
        temp_file.write_all(content.as_bytes())?;
        temp_file.sync_all()?;
        drop(temp_file);

        fs::rename(&temp_path, path)?;
        log::debug!("Saved config to {:?}", path);
        Ok(())
    }

    /// Current rules for a mode: manual rules merged with URL rules.
    pub fn rules_for(&self, mode: Mode) -> Vec<String> {
        let (manual, remote) = match mode {
            Mode::Whitelist => (&self.whitelist_rules, &self.whitelist_url_rules_parsed),
            Mode::Blacklist => (&self.blacklist_rules, &self.blacklist_url_rules_parsed),
        };
        merge_rules(manual, remote)
            .into_iter()
            .filter(|r| is_valid_pattern(r))
            .collect()
    }

    /// The live [`Config`] for the stored mode.
    pub fn to_config(&self) -> Config {
        Config {
            proxy_enabled: self.proxy_enabled,
            proxy_url: if self.proxy_url.trim().is_empty() {
                DEFAULT_PROXY_URL.to_string()
            } else {
                self.proxy_url.clone()
            },
            mode: self.mode,
            rules: self.rules_for(self.mode),
        }
    }

    /// Store rules fetched from a URL along with the fetched text.
    pub fn set_url_rules(&mut self, list: Mode, url: &str, parsed: &ParsedRules) {
        match list {
            Mode::Whitelist => {
                self.whitelist_rules_url = Some(url.to_string());
                self.whitelist_url_rules = Some(parsed.raw.clone());
                self.whitelist_url_rules_parsed = parsed.rules.clone();
            }
            Mode::Blacklist => {
                self.blacklist_rules_url = Some(url.to_string());
                self.blacklist_url_rules = Some(parsed.raw.clone());
                self.blacklist_url_rules_parsed = parsed.rules.clone();
            }
        }
    }

    /// Fold change notifications into this snapshot.
    ///
    /// Returns `true` if a routing key changed. On error (a value of the
    /// wrong type) the snapshot is left untouched. Unknown keys are ignored.
    pub fn apply_changes(&mut self, changes: &StorageChanges) -> Result<bool> {
        let mut value = serde_json::to_value(&*self)?;
        let object = value
            .as_object_mut()
            .ok_or_else(|| Error::Config("stored config is not an object".to_string()))?;

        for (key, change) in changes {
            match &change.new_value {
                Some(new_value) => {
                    object.insert(key.clone(), new_value.clone());
                }
                None => {
                    object.remove(key);
                }
            }
        }

        let next: Self = serde_json::from_value(value)?;
        let routing_changed = changes.keys().any(|k| ROUTING_KEYS.contains(&k.as_str()))
            && next.to_config() != self.to_config();

        *self = next;
        Ok(routing_changed)
    }
}
