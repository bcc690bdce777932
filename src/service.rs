//! Live routing state and the platform proxy installer.

use arc_swap::ArcSwap;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::engine::{ConfigUpdate, DecisionEngine, ProxySetting};
use crate::proxy::ProxyTarget;
use crate::rule::is_valid_pattern;
use crate::ruleset::ParsedRules;
use crate::store::{StorageChanges, StoredConfig};
use crate::{Decision, Mode, Result, Target};

/// Platform proxy subsystem: accepts a PAC script or "use system settings".
///
/// Each call fully replaces whatever was installed before.
#[async_trait]
pub trait ProxySink: Send + Sync {
    async fn install(&self, setting: ProxySetting) -> Result<()>;
}

/// Messages accepted from settings pages and popups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Message {
    /// Merge the given fields into the live configuration
    UpdateProxy(ConfigUpdate),
}

/// Reply to a [`Message`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub success: bool,
}

/// RoutingService owns the live configuration.
///
/// Readers get the current [`DecisionEngine`] snapshot without locking.
/// Every mutation goes through [`apply_config`](Self::apply_config) (directly
/// or via storage changes and messages), builds a complete new snapshot,
/// swaps it in, and queues the matching [`ProxySetting`] for installation.
/// Installation happens on a single background task in mutation order;
/// failures are logged and never retried or rolled back.
pub struct RoutingService {
    engine: ArcSwap<DecisionEngine>,
    /// Persisted-key snapshot; its lock also serializes writers
    stored: Mutex<StoredConfig>,
    installer: mpsc::UnboundedSender<ProxySetting>,
}

impl RoutingService {
    /// Start the service from a stored snapshot and install the initial setting.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(stored: StoredConfig, sink: Arc<dyn ProxySink>) -> Self {
        Self::with_default_proxy(stored, sink, ProxyTarget::default())
    }

    /// Like [`new`](Self::new) with a custom fallback proxy.
    pub fn with_default_proxy(
        stored: StoredConfig,
        sink: Arc<dyn ProxySink>,
        default_proxy: ProxyTarget,
    ) -> Self {
        let engine = DecisionEngine::with_default_proxy(stored.to_config(), default_proxy);
        let setting = engine.dispatch_setting();

        let service = Self {
            engine: ArcSwap::from_pointee(engine),
            stored: Mutex::new(stored),
            installer: spawn_installer(sink),
        };
        service.queue_install(setting);
        service
    }

    /// The current decision snapshot.
    pub fn engine(&self) -> Arc<DecisionEngine> {
        self.engine.load_full()
    }

    /// A copy of the persisted-key snapshot.
    pub fn stored(&self) -> StoredConfig {
        self.stored.lock().clone()
    }

    /// Decide DIRECT or PROXY for a host using the current snapshot.
    pub fn decide(&self, host: &str) -> Target {
        self.engine.load().decide(host)
    }

    /// Like [`decide`](Self::decide), with the proxy address.
    pub fn evaluate(&self, host: &str) -> Decision {
        self.engine.load().evaluate(host)
    }

    /// Merge a partial update into the live configuration.
    ///
    /// Returns `true` if the configuration changed, in which case a new
    /// setting has been queued for installation.
    pub fn apply_config(&self, update: ConfigUpdate) -> bool {
        let _writer = self.stored.lock();
        self.apply_locked(update)
    }

    /// Fold storage change notifications into the live state.
    ///
    /// Only the fields whose keys changed are touched, so state applied
    /// through messages survives unrelated changes. Rules are recomputed
    /// from the stored lists when the mode or the active list changed.
    /// Returns `true` if routing changed.
    pub fn on_storage_changed(&self, changes: &StorageChanges) -> Result<bool> {
        log::info!(
            "Storage changed: {:?}",
            changes.keys().collect::<Vec<_>>()
        );

        let mut stored = self.stored.lock();
        stored.apply_changes(changes)?;
        let update = self.update_from_changes(&stored, changes);
        Ok(self.apply_locked(update))
    }

    /// Store rules fetched from a URL; applies them if `list` is the live mode.
    pub fn set_url_rules(&self, list: Mode, url: &str, parsed: &ParsedRules) -> bool {
        let mut stored = self.stored.lock();
        stored.set_url_rules(list, url, parsed);
        if self.engine.load().config().mode != list {
            return false;
        }
        let rules = stored.rules_for(list);
        self.apply_locked(ConfigUpdate::default().with_rules(rules))
    }

    /// Handle a message from a settings page or popup.
    pub fn handle_message(&self, message: Message) -> MessageResponse {
        log::info!("Received message: {:?}", message);
        match message {
            Message::UpdateProxy(mut update) => {
                if let Some(rules) = update.rules.take() {
                    update.rules = Some(
                        rules
                            .into_iter()
                            .filter(|r| is_valid_pattern(r))
                            .collect(),
                    );
                }
                self.apply_config(update);
                MessageResponse { success: true }
            }
        }
    }

    /// Apply an update; the caller holds the `stored` lock.
    fn apply_locked(&self, update: ConfigUpdate) -> bool {
        if update.is_empty() {
            return false;
        }

        let (next, changed) = self.engine.load().updated(update);
        if !changed {
            log::debug!("Config unchanged, nothing to install");
            return false;
        }

        let setting = next.dispatch_setting();
        self.engine.store(Arc::new(next));
        self.queue_install(setting);
        true
    }

    /// The partial update matching a set of changed storage keys.
    fn update_from_changes(&self, stored: &StoredConfig, changes: &StorageChanges) -> ConfigUpdate {
        let changed = |key: &str| changes.contains_key(key);
        let mut update = ConfigUpdate::default();

        if changed("proxyEnabled") {
            update.proxy_enabled = Some(stored.proxy_enabled);
        }
        if changed("proxyUrl") {
            // Removed or empty means the default
            update.proxy_url = Some(stored.to_config().proxy_url);
        }

        let mode = if changed("mode") {
            update.mode = Some(stored.mode);
            stored.mode
        } else {
            self.engine.load().config().mode
        };
        let (manual_key, url_key) = match mode {
            Mode::Whitelist => ("whitelistRules", "whitelistUrlRulesParsed"),
            Mode::Blacklist => ("blacklistRules", "blacklistUrlRulesParsed"),
        };
        if changed("mode") || changed(manual_key) || changed(url_key) {
            update.rules = Some(stored.rules_for(mode));
        }

        update
    }

    fn queue_install(&self, setting: ProxySetting) {
        if self.installer.send(setting).is_err() {
            log::error!("Proxy installer has stopped; setting dropped");
        }
    }
}

/// Spawn the single task that writes to the platform proxy subsystem.
fn spawn_installer(sink: Arc<dyn ProxySink>) -> mpsc::UnboundedSender<ProxySetting> {
    let (tx, mut rx) = mpsc::unbounded_channel::<ProxySetting>();

    tokio::spawn(async move {
        while let Some(setting) = rx.recv().await {
            let is_pac = setting.is_pac();
            match sink.install(setting).await {
                Ok(()) if is_pac => log::info!("PAC set successfully"),
                Ok(()) => log::info!("Proxy cleared successfully"),
                Err(e) => log::error!("Proxy setting error: {}", e),
            }
        }
        log::debug!("Proxy installer stopped");
    });

    tx
}
