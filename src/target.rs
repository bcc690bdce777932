//! Routing verdicts.

use std::fmt;

use crate::proxy::ProxyTarget;

/// Target is the verdict of rule evaluation: go direct or use the proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Target {
    /// Route directly without proxy
    #[default]
    Direct,
    /// Route through proxy
    Proxy,
}

impl Target {
    /// Build a target from the `isProxy` flag.
    pub fn from_proxy_flag(is_proxy: bool) -> Self {
        if is_proxy {
            Target::Proxy
        } else {
            Target::Direct
        }
    }

    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Target::Direct => "DIRECT",
            Target::Proxy => "PROXY",
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Decision is a [`Target`] with the upstream proxy filled in.
///
/// Its `Display` form is exactly what the generated PAC script returns
/// for the same host: `DIRECT` or `PROXY host:port`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Decision {
    #[default]
    Direct,
    Proxy(ProxyTarget),
}

impl Decision {
    /// Whether traffic goes through the upstream proxy.
    pub fn is_proxy(&self) -> bool {
        matches!(self, Decision::Proxy(_))
    }

    /// Drop the proxy address, keeping only the verdict.
    pub fn target(&self) -> Target {
        match self {
            Decision::Direct => Target::Direct,
            Decision::Proxy(_) => Target::Proxy,
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Direct => f.write_str("DIRECT"),
            Decision::Proxy(proxy) => write!(f, "PROXY {}", proxy.host_port()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_from_proxy_flag() {
        assert_eq!(Target::from_proxy_flag(true), Target::Proxy);
        assert_eq!(Target::from_proxy_flag(false), Target::Direct);
    }

    #[test]
    fn test_target_display() {
        assert_eq!(Target::Direct.to_string(), "DIRECT");
        assert_eq!(Target::Proxy.to_string(), "PROXY");
    }

    #[test]
    fn test_decision_display() {
        assert_eq!(Decision::Direct.to_string(), "DIRECT");
        let decision = Decision::Proxy(ProxyTarget::default());
        assert_eq!(decision.to_string(), "PROXY localhost:7890");
        assert!(decision.is_proxy());
        assert_eq!(decision.target(), Target::Proxy);
    }
}
