//! Upstream proxy target parsing.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use url::Url;

use crate::error::ProxyUrlError;

/// Proxy URL used when none is configured or the configured one is unusable.
pub const DEFAULT_PROXY_URL: &str = "http://localhost:7890";

/// Hostnames accepted for the upstream proxy. No IDNA conversion is done.
static PROXY_HOST: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-zA-Z0-9.-]+$").unwrap());

/// Scheme of the upstream proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Scheme {
    #[default]
    Http,
    Https,
}

impl Scheme {
    /// Parse a URL scheme; only `http` and `https` are accepted.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "http" => Some(Scheme::Http),
            "https" => Some(Scheme::Https),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }
}

/// ProxyTarget is a validated upstream proxy address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProxyTarget {
    scheme: Scheme,
    host: String,
    port: u16,
}

impl Default for ProxyTarget {
    fn default() -> Self {
        Self {
            scheme: Scheme::Http,
            host: "localhost".to_string(),
            port: 7890,
        }
    }
}

impl ProxyTarget {
    /// Build a target from already-validated parts.
    ///
    /// Returns `None` when the host or port would not survive [`ProxyTarget::parse`].
    pub fn new(scheme: Scheme, host: impl Into<String>, port: u16) -> Option<Self> {
        let host = host.into();
        if port == 0 || !PROXY_HOST.is_match(&host) {
            return None;
        }
        Some(Self { scheme, host, port })
    }

    /// Parse and validate a proxy URL such as `http://127.0.0.1:7890`.
    ///
    /// The port must be given explicitly. URL normalisation drops a port equal
    /// to the scheme default, so `http://proxy:80` is rejected as portless.
    pub fn parse(input: &str) -> Result<Self, ProxyUrlError> {
        let input = input.trim();

        // Reject before parsing so that IDNA never rewrites the host.
        if !raw_authority(input).is_ascii() {
            return Err(ProxyUrlError::InvalidHost(input.to_string()));
        }

        let url =
            Url::parse(input).map_err(|e| ProxyUrlError::Unparsable(input.to_string(), e))?;

        let scheme = Scheme::parse(url.scheme())
            .ok_or_else(|| ProxyUrlError::UnsupportedScheme(url.scheme().to_string()))?;

        let host = match url.host_str() {
            Some(h) if PROXY_HOST.is_match(h) => h.to_string(),
            Some(h) => return Err(ProxyUrlError::InvalidHost(h.to_string())),
            None => return Err(ProxyUrlError::InvalidHost(input.to_string())),
        };

        let port = match url.port() {
            Some(p) if p >= 1 => p,
            _ => return Err(ProxyUrlError::InvalidPort(input.to_string())),
        };

        Ok(Self { scheme, host, port })
    }

    /// Parse a proxy URL, falling back to `default` on any problem.
    ///
    /// This never fails; the decision path depends on it.
    pub fn resolve(input: &str, default: &ProxyTarget) -> ProxyTarget {
        match Self::parse(input) {
            Ok(target) => target,
            Err(e) => {
                log::warn!(
                    "Invalid proxy URL {:?} ({}), using default {}",
                    input,
                    e,
                    default
                );
                default.clone()
            }
        }
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// `host:port`, as used in a PAC `PROXY` directive.
    pub fn host_port(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Display for ProxyTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}:{}", self.scheme.as_str(), self.host, self.port)
    }
}

/// The `user@host:port` part of a URL as typed, before any normalisation.
fn raw_authority(input: &str) -> &str {
    let rest = input.split_once("://").map_or(input, |(_, rest)| rest);
    let end = rest
        .find(|c| matches!(c, '/' | '\\' | '?' | '#'))
        .unwrap_or(rest.len());
    &rest[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid() {
        let target = ProxyTarget::parse("http://localhost:7890").unwrap();
        assert_eq!(target, ProxyTarget::default());

        let target = ProxyTarget::parse("HTTPS://Proxy.Example.com:8443/").unwrap();
        assert_eq!(target.scheme(), Scheme::Https);
        assert_eq!(target.host(), "proxy.example.com");
        assert_eq!(target.port(), 8443);
        assert_eq!(target.host_port(), "proxy.example.com:8443");
    }

    #[test]
    fn test_parse_rejects_scheme() {
        assert!(matches!(
            ProxyTarget::parse("ftp://bad:21"),
            Err(ProxyUrlError::UnsupportedScheme(_))
        ));
        assert!(matches!(
            ProxyTarget::parse("socks5://127.0.0.1:1080"),
            Err(ProxyUrlError::UnsupportedScheme(_))
        ));
    }

    #[test]
    fn test_parse_rejects_port() {
        assert!(matches!(
            ProxyTarget::parse("http://localhost"),
            Err(ProxyUrlError::InvalidPort(_))
        ));
        assert!(matches!(
            ProxyTarget::parse("http://localhost:80"),
            Err(ProxyUrlError::InvalidPort(_))
        ));
        assert!(matches!(
            ProxyTarget::parse("http://localhost:0"),
            Err(ProxyUrlError::InvalidPort(_))
        ));
        assert!(ProxyTarget::parse("http://localhost:70000").is_err());
        assert!(ProxyTarget::parse("http://localhost:abc").is_err());
    }

    #[test]
    fn test_parse_rejects_host() {
        assert!(matches!(
            ProxyTarget::parse("http://代理.cn:8080"),
            Err(ProxyUrlError::InvalidHost(_))
        ));
        assert!(matches!(
            ProxyTarget::parse("http://[::1]:8080"),
            Err(ProxyUrlError::InvalidHost(_))
        ));
        assert!(ProxyTarget::parse("not a url").is_err());
        assert!(ProxyTarget::parse("").is_err());
    }

    #[test]
    fn test_non_ascii_outside_host_is_allowed() {
        let target = ProxyTarget::parse("http://127.0.0.1:1087/路径?q=值").unwrap();
        assert_eq!(target.host_port(), "127.0.0.1:1087");

        assert_eq!(raw_authority("http://user@例子.com:8080/x"), "user@例子.com:8080");
        assert!(ProxyTarget::parse("http:代理.cn:8080").is_err());
    }

    #[test]
    fn test_resolve_falls_back() {
        let default = ProxyTarget::default();
        assert_eq!(ProxyTarget::resolve("ftp://bad", &default), default);

        let custom = ProxyTarget::new(Scheme::Http, "10.0.0.2", 3128).unwrap();
        assert_eq!(ProxyTarget::resolve("garbage", &custom), custom);
        assert_eq!(
            ProxyTarget::resolve("http://127.0.0.1:1087", &custom).host_port(),
            "127.0.0.1:1087"
        );
    }

    #[test]
    fn test_new_validates() {
        assert!(ProxyTarget::new(Scheme::Http, "ok.host", 1).is_some());
        assert!(ProxyTarget::new(Scheme::Http, "bad host", 1).is_none());
        assert!(ProxyTarget::new(Scheme::Http, "ok.host", 0).is_none());
    }

    #[test]
    fn test_display() {
        assert_eq!(ProxyTarget::default().to_string(), "http://localhost:7890");
    }
}
