//! PAC (proxy auto-config) script generation.
//!
//! The generated script is self-contained: the proxy address and every rule
//! are baked in as literals, because the PAC sandbox cannot call back into
//! this process. Rules are emitted from the same [`RulePattern`] IR the live
//! [`DecisionEngine`](crate::DecisionEngine) evaluates, so both agree on
//! every host.

use crate::engine::{Config, LOOPBACK_HOSTS};
use crate::proxy::ProxyTarget;
use crate::rule::{is_valid_pattern, RulePattern};
use crate::{Mode, RuleSet};

/// Generate the PAC script for a configuration.
///
/// The `proxy_enabled` flag is not consulted: a disabled configuration
/// installs no script at all (see [`ProxySetting`](crate::ProxySetting)).
///
/// # Examples
/// ```
/// use pacrule::{pac, Config, Mode};
///
/// let config = Config::new("http://localhost:7890", Mode::Blacklist, vec!["*.cn".into()]);
/// let script = pac::generate(&config);
/// assert!(script.contains("function FindProxyForURL(url, host)"));
/// assert!(script.contains("host.endsWith(\".cn\")"));
/// assert!(script.contains("\"PROXY localhost:7890\""));
/// ```
pub fn generate(config: &Config) -> String {
    let rules = RuleSet::from_patterns(&config.rules);
    let proxy = ProxyTarget::resolve(&config.proxy_url, &ProxyTarget::default());
    render(&rules, config.mode, &proxy)
}

/// Render a PAC script from compiled rules.
pub fn render(rules: &RuleSet, mode: Mode, proxy: &ProxyTarget) -> String {
    let matched = rules_expression(rules);
    let is_proxy = match mode {
        Mode::Whitelist => "!matched",
        Mode::Blacklist => "matched",
    };
    let loopback = LOOPBACK_HOSTS
        .iter()
        .map(|h| format!("host === \"{}\"", h))
        .collect::<Vec<_>>()
        .join(" || ");

    let script = format!(
        r#"// mode={mode}, rules={count}, proxy={proxy}
var cache = Object.create(null);
function FindProxyForURL(url, host) {{
  if ({loopback}) {{
    return "DIRECT";
  }}
  if (host in cache) {{
    return cache[host];
  }}
  var matched = {matched};
  var isProxy = {is_proxy};
  var result = isProxy ? "PROXY {host_port}" : "DIRECT";
  cache[host] = result;
  return result;
}}
"#,
        count = rules.len(),
        host_port = proxy.host_port(),
    );

    log::info!(
        "PAC generated: {} rules, mode={}, proxy={}",
        rules.len(),
        mode,
        proxy
    );
    script
}

/// The `||`-joined match expression for a rule set; `false` when empty.
pub fn rules_expression(rules: &RuleSet) -> String {
    let conditions: Vec<String> = rules.patterns().iter().filter_map(condition).collect();
    if conditions.is_empty() {
        "false".to_string()
    } else {
        conditions.join(" || ")
    }
}

/// The JavaScript boolean expression for one pattern.
///
/// Returns `None` for a pattern whose text would not pass validation; such a
/// pattern is never embedded in the script.
pub fn condition(pattern: &RulePattern) -> Option<String> {
    if !is_valid_pattern(&pattern.to_string()) {
        log::warn!("Skipping rule with disallowed characters: {}", pattern);
        return None;
    }

    let expr = match pattern {
        RulePattern::SuffixDot { base } => {
            format!("(host === \"{0}\" || host.endsWith(\".{0}\"))", base)
        }
        RulePattern::WildcardSubdomain { base } => format!("host.endsWith(\".{}\")", base),
        RulePattern::Wildcard(wildcard) => format!("/^{}$/u.test(host)", wildcard.regex_body()),
    };
    Some(expr)
}
