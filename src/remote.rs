//! Remote rule lists.
//!
//! This module provides `RuleListFetcher` which handles:
//! - Downloading a rule list from an http(s) URL
//! - Gzip decompression of `.gz` lists
//! - Rejecting failed or empty downloads so stored rules stay untouched

use flate2::read::GzDecoder;
use std::io::Read;
use std::time::Duration;
use url::Url;

use crate::ruleset::{parse_rules, ParsedRules};
use crate::{Error, Result};

/// Default download timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Downloads rule-list text.
///
/// # Example
///
/// ```ignore
/// use pacrule::remote::RuleListFetcher;
///
/// let fetcher = RuleListFetcher::new();
/// let parsed = fetcher.fetch_rules("https://example.com/gfwlist.txt")?;
/// println!("{} valid rules out of {} lines", parsed.rules.len(), parsed.total_lines);
/// ```
#[derive(Clone)]
pub struct RuleListFetcher {
    agent: ureq::Agent,
}

impl Default for RuleListFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleListFetcher {
    /// Create a fetcher with the default 60 second timeout.
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    /// Create a fetcher with a custom timeout.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
        }
    }

    /// Download a rule list and return its text.
    ///
    /// Fails on non-http(s) URLs, transport errors, non-2xx responses and
    /// bodies that are empty or whitespace only.
    pub fn fetch(&self, url: &str) -> Result<String> {
        validate_rules_url(url)?;

        let response = self.agent.get(url).call().map_err(|e| match e {
            ureq::Error::Status(code, _) => Error::Download(format!("HTTP error: {}", code)),
            ureq::Error::Transport(t) => Error::Download(format!("Transport error: {}", t)),
        })?;

        let mut raw_data = Vec::new();
        response
            .into_reader()
            .read_to_end(&mut raw_data)
            .map_err(|e| Error::Download(format!("Failed to read response: {}", e)))?;

        let text = decode_body(url, raw_data)?;
        log::info!("Fetched rules from {}: {} bytes", url, text.len());
        Ok(text)
    }

    /// Download and parse a rule list.
    pub fn fetch_rules(&self, url: &str) -> Result<ParsedRules> {
        let text = self.fetch(url)?;
        let parsed = parse_rules(&text);
        log::info!(
            "Parsed {} valid rules from {} lines ({})",
            parsed.rules.len(),
            parsed.total_lines,
            url
        );
        Ok(parsed)
    }

    /// [`fetch_rules`](Self::fetch_rules) on the blocking thread pool.
    pub async fn fetch_rules_async(&self, url: &str) -> Result<ParsedRules> {
        let fetcher = self.clone();
        let url = url.to_string();
        tokio::task::spawn_blocking(move || fetcher.fetch_rules(&url))
            .await
            .map_err(|e| Error::Download(format!("fetch task failed: {}", e)))?
    }
}

/// Check that a rule list URL uses http or https.
pub fn validate_rules_url(url: &str) -> Result<()> {
    match Url::parse(url.trim()) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Ok(()),
        _ => Err(Error::InvalidRulesUrl(url.to_string())),
    }
}

/// Check if data is gzip compressed.
fn is_gzip(data: &[u8]) -> bool {
    data.len() >= 2 && data[0] == 0x1f && data[1] == 0x8b
}

/// Decompress if needed and decode as text; empty lists are an error.
fn decode_body(url: &str, raw_data: Vec<u8>) -> Result<String> {
    let data = if is_gzip(&raw_data) {
        let mut decoder = GzDecoder::new(&raw_data[..]);
        let mut data = Vec::new();
        decoder
            .read_to_end(&mut data)
            .map_err(|e| Error::Download(format!("Gzip decompression failed: {}", e)))?;
        data
    } else {
        raw_data
    };

    let text = String::from_utf8_lossy(&data).into_owned();
    if text.trim().is_empty() {
        return Err(Error::EmptyRuleList(url.to_string()));
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::thread;

    fn gzip(data: &[u8]) -> Vec<u8> {
        use flate2::write::GzEncoder;
        use flate2::Compression;

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    /// Serve one canned HTTP response on a local port.
    fn serve_once(status: &'static str, body: Vec<u8>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut line = String::new();
            while reader.read_line(&mut line).unwrap() > 0 {
                if line == "\r\n" {
                    break;
                }
                line.clear();
            }
            let header = format!(
                "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                status,
                body.len()
            );
            stream.write_all(header.as_bytes()).unwrap();
            stream.write_all(&body).unwrap();
        });
        format!("http://{}/rules.txt", addr)
    }

    #[test]
    fn test_validate_rules_url() {
        assert!(validate_rules_url("https://example.com/list.txt").is_ok());
        assert!(validate_rules_url("http://example.com/list.txt").is_ok());
        assert!(matches!(
            validate_rules_url("ftp://example.com/list.txt"),
            Err(Error::InvalidRulesUrl(_))
        ));
        assert!(validate_rules_url("list.txt").is_err());
    }

    #[test]
    fn test_fetch_rejects_scheme_without_network() {
        let fetcher = RuleListFetcher::new();
        assert!(matches!(
            fetcher.fetch("file:///etc/hosts"),
            Err(Error::InvalidRulesUrl(_))
        ));
    }

    #[test]
    fn test_is_gzip() {
        assert!(is_gzip(&gzip(b"*.cn\n")));
        assert!(!is_gzip(b"*.cn\n"));
    }

    #[test]
    fn test_decode_body() {
        assert_eq!(decode_body("u", b"*.cn\n".to_vec()).unwrap(), "*.cn\n");
        assert_eq!(decode_body("u", gzip(b".qq.com\n")).unwrap(), ".qq.com\n");
        assert!(matches!(
            decode_body("u", b" \n\t".to_vec()),
            Err(Error::EmptyRuleList(_))
        ));
    }

    #[test]
    fn test_fetch_rules_ok() {
        let url = serve_once("200 OK", b"# list\n*.google.com\nbad rule\n".to_vec());
        let parsed = RuleListFetcher::new().fetch_rules(&url).unwrap();
        assert_eq!(parsed.rules, vec!["*.google.com"]);
        assert_eq!(parsed.total_lines, 3);
    }

    #[test]
    fn test_fetch_not_found() {
        let url = serve_once("404 Not Found", b"missing".to_vec());
        let err = RuleListFetcher::new().fetch(&url).unwrap_err();
        assert!(matches!(err, Error::Download(ref msg) if msg.contains("404")));
    }

    #[test]
    fn test_fetch_empty_body() {
        let url = serve_once("200 OK", Vec::new());
        assert!(matches!(
            RuleListFetcher::new().fetch(&url),
            Err(Error::EmptyRuleList(_))
        ));
    }

    #[tokio::test]
    async fn test_fetch_rules_async() {
        let url = serve_once("200 OK", gzip(b".youtube.com\n"));
        let parsed = RuleListFetcher::new().fetch_rules_async(&url).await.unwrap();
        assert_eq!(parsed.rules, vec![".youtube.com"]);
    }
}
