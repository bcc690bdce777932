//! Decision engine: config snapshot in, DIRECT or PROXY out.

mod config;

pub use config::{Config, ConfigUpdate};

use quick_cache::sync::Cache;

use crate::pac;
use crate::proxy::ProxyTarget;
use crate::{Decision, RuleSet, Target};

/// Hosts that always go direct, checked before any rule.
pub const LOOPBACK_HOSTS: &[&str] = &["localhost", "127.0.0.1", "::1"];

/// Default capacity of the per-snapshot decision cache.
const DEFAULT_CACHE_CAPACITY: usize = 10_000;

/// Whether the host is one of the loopback literals.
pub fn is_loopback(host: &str) -> bool {
    LOOPBACK_HOSTS.contains(&host)
}

/// What the platform proxy subsystem should be told to use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxySetting {
    /// Install this PAC script
    PacScript(String),
    /// Leave routing to the system settings
    System,
}

impl ProxySetting {
    pub fn is_pac(&self) -> bool {
        matches!(self, ProxySetting::PacScript(_))
    }
}

/// DecisionEngine is an immutable, fully-applied [`Config`] snapshot.
///
/// Rules are compiled and the proxy URL resolved once per snapshot, so
/// per-host evaluation never parses anything. A new snapshot (and a fresh
/// decision cache) is produced for every configuration change, mirroring
/// the memo of the generated PAC script.
///
/// # Examples
/// ```
/// use pacrule::{Config, DecisionEngine, Mode, Target};
///
/// let config = Config::new("http://localhost:7890", Mode::Blacklist, vec!["*.qq.com".into()]);
/// let engine = DecisionEngine::new(config);
///
/// assert_eq!(engine.decide("www.qq.com"), Target::Proxy);
/// assert_eq!(engine.evaluate("www.qq.com").to_string(), "PROXY localhost:7890");
/// assert_eq!(engine.decide("127.0.0.1"), Target::Direct);
/// ```
pub struct DecisionEngine {
    config: Config,
    rules: RuleSet,
    proxy: ProxyTarget,
    default_proxy: ProxyTarget,
    cache: Cache<String, Target>,
}

impl DecisionEngine {
    /// Build a snapshot using `http://localhost:7890` as the fallback proxy.
    pub fn new(config: Config) -> Self {
        Self::with_default_proxy(config, ProxyTarget::default())
    }

    /// Build a snapshot with a custom fallback proxy.
    pub fn with_default_proxy(config: Config, default_proxy: ProxyTarget) -> Self {
        let rules = RuleSet::from_patterns(&config.rules);
        let proxy = ProxyTarget::resolve(&config.proxy_url, &default_proxy);

        log::debug!(
            "Built decision engine: enabled={}, mode={}, rules={}/{}, proxy={}",
            config.proxy_enabled,
            config.mode,
            rules.len(),
            config.rules.len(),
            proxy
        );

        Self {
            config,
            rules,
            proxy,
            default_proxy,
            cache: Cache::new(DEFAULT_CACHE_CAPACITY),
        }
    }

    /// Produce the next snapshot with `update` merged in.
    ///
    /// The returned flag is `true` if the configuration actually changed.
    pub fn updated(&self, update: ConfigUpdate) -> (Self, bool) {
        let mut config = self.config.clone();
        let changed = config.merge(update);
        (
            Self::with_default_proxy(config, self.default_proxy.clone()),
            changed,
        )
    }

    /// The configuration this snapshot was built from.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The compiled rules (invalid patterns already dropped).
    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// The resolved upstream proxy.
    pub fn proxy(&self) -> &ProxyTarget {
        &self.proxy
    }

    /// Decide DIRECT or PROXY for a host, with the proxy address filled in.
    pub fn evaluate(&self, host: &str) -> Decision {
        match self.decide(host) {
            Target::Direct => Decision::Direct,
            Target::Proxy => Decision::Proxy(self.proxy.clone()),
        }
    }

    /// Decide DIRECT or PROXY for a host.
    pub fn decide(&self, host: &str) -> Target {
        if !self.config.proxy_enabled || is_loopback(host) {
            return Target::Direct;
        }

        if let Some(target) = self.cache.get(host) {
            return target;
        }

        let target = self.rules.decide(self.config.mode, host);
        log::debug!("host: {}, mode: {}, result: {}", host, self.config.mode, target);
        self.cache.insert(host.to_string(), target);
        target
    }

    /// Generate the PAC script equivalent to this snapshot's rules.
    pub fn pac_script(&self) -> String {
        pac::render(&self.rules, self.config.mode, &self.proxy)
    }

    /// What to install with the platform proxy subsystem.
    pub fn dispatch_setting(&self) -> ProxySetting {
        if self.config.proxy_enabled {
            ProxySetting::PacScript(self.pac_script())
        } else {
            ProxySetting::System
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Mode;

    fn build(mode: Mode, rules: &[&str]) -> DecisionEngine {
        let rules = rules.iter().map(|r| r.to_string()).collect();
        DecisionEngine::new(Config::new("http://localhost:7890", mode, rules))
    }

    #[test]
    fn test_disabled_is_direct() {
        let mut config = Config::new("http://localhost:7890", Mode::Whitelist, vec![]);
        config.proxy_enabled = false;
        let engine = DecisionEngine::new(config);
        assert_eq!(engine.evaluate("www.google.com"), Decision::Direct);
        assert_eq!(engine.dispatch_setting(), ProxySetting::System);
    }

    #[test]
    fn test_loopback_overrides_rules() {
        let engine = build(Mode::Blacklist, &["*", "localhost", "127.0.0.1"]);
        for host in LOOPBACK_HOSTS {
            assert_eq!(engine.decide(host), Target::Direct);
        }
        assert_eq!(engine.decide("anything.com"), Target::Proxy);

        let engine = build(Mode::Whitelist, &[]);
        for host in LOOPBACK_HOSTS {
            assert_eq!(engine.decide(host), Target::Direct);
        }
    }

    #[test]
    fn test_blacklist_scenario() {
        let engine = build(Mode::Blacklist, &["*.cn", "*.qq.com"]);
        assert_eq!(
            engine.evaluate("www.qq.com"),
            Decision::Proxy(ProxyTarget::default())
        );
        assert_eq!(engine.evaluate("www.google.com"), Decision::Direct);
        assert_eq!(engine.evaluate("qq.com"), Decision::Direct);
    }

    #[test]
    fn test_malformed_proxy_url_falls_back() {
        let config = Config::new("ftp://bad", Mode::Whitelist, vec![]);
        let engine = DecisionEngine::new(config);
        assert_eq!(engine.proxy(), &ProxyTarget::default());
        assert_eq!(engine.evaluate("example.com").to_string(), "PROXY localhost:7890");
    }

    #[test]
    fn test_custom_default_proxy() {
        let fallback = ProxyTarget::parse("http://10.0.0.1:3128").unwrap();
        let config = Config::new("nonsense", Mode::Whitelist, vec![]);
        let engine = DecisionEngine::with_default_proxy(config, fallback.clone());
        assert_eq!(engine.proxy(), &fallback);
    }

    #[test]
    fn test_cached_decisions_stable() {
        let engine = build(Mode::Whitelist, &[".example.com"]);
        for _ in 0..3 {
            assert_eq!(engine.decide("a.example.com"), Target::Direct);
            assert_eq!(engine.decide("b.org"), Target::Proxy);
        }
    }

    #[test]
    fn test_updated_resets_decisions() {
        let engine = build(Mode::Whitelist, &[".example.com"]);
        assert_eq!(engine.decide("a.example.com"), Target::Direct);

        let (next, changed) = engine.updated(ConfigUpdate::default().with_mode(Mode::Blacklist));
        assert!(changed);
        assert_eq!(next.decide("a.example.com"), Target::Proxy);
        assert_eq!(next.config().rules, vec![".example.com"]);

        let (_, changed) = next.updated(ConfigUpdate::default().with_mode(Mode::Blacklist));
        assert!(!changed);
    }

    #[test]
    fn test_invalid_rules_dropped_from_snapshot() {
        let engine = build(Mode::Blacklist, &["good.com", "bad rule"]);
        assert_eq!(engine.rules().len(), 1);
        assert_eq!(engine.config().rules.len(), 2);
        assert_eq!(engine.decide("bad rule"), Target::Direct);
    }

    #[test]
    fn test_dispatch_setting_enabled() {
        let engine = build(Mode::Blacklist, &["*.cn"]);
        match engine.dispatch_setting() {
            ProxySetting::PacScript(script) => assert!(script.contains("FindProxyForURL")),
            ProxySetting::System => panic!("expected PAC script"),
        }
    }
}
