//! pacrule - Per-hostname proxy routing for browsers.
//!
//! This crate decides, for every hostname the browser visits, whether the
//! connection goes DIRECT or through a configured upstream proxy, and emits
//! an equivalent PAC script so the browser's own proxy subsystem makes the
//! same decision.
//!
//! # Features
//!
//! - **Pattern matching**: `.example.com`, `*.example.com` and `*`/`?` wildcards
//! - **Two modes**: whitelist (matched hosts go direct) and blacklist (matched hosts are proxied)
//! - **PAC generation**: a self-contained script that agrees with the live engine on every host
//! - **Hot reload**: configuration changes swap in a new snapshot without blocking readers
//! - **Remote rule lists**: download, decompress and parse published lists
//! - **Toolbar icon state**: debounced per-tab updates
//!
//! # Quick Start
//!
//! ```
//! use pacrule::{Config, DecisionEngine, Mode, Target};
//!
//! let config = Config::new(
//!     "http://127.0.0.1:8080",
//!     Mode::Whitelist,
//!     vec!["*.cn".into(), ".qq.com".into()],
//! );
//! let engine = DecisionEngine::new(config);
//!
//! // Whitelisted hosts go direct, everything else is proxied
//! assert_eq!(engine.decide("www.baidu.cn"), Target::Direct);
//! assert_eq!(engine.decide("qq.com"), Target::Direct);
//! assert_eq!(engine.decide("www.google.com"), Target::Proxy);
//!
//! // Loopback always goes direct
//! assert_eq!(engine.decide("localhost"), Target::Direct);
//!
//! let script = engine.pac_script();
//! assert!(script.contains("FindProxyForURL"));
//! ```
//!
//! # Live Service
//!
//! [`RoutingService`] holds the current snapshot, folds in storage changes
//! and settings messages, and installs each new PAC script (or the system
//! setting when routing is disabled) through a [`ProxySink`] in order.
//!
//! ```ignore
//! use pacrule::{RoutingService, StoredConfig};
//! use std::sync::Arc;
//!
//! let stored = StoredConfig::load("pacrule.json")?;
//! let service = Arc::new(RoutingService::new(stored, Arc::new(MyProxySink)));
//!
//! let target = service.decide("www.google.com");
//! ```
//!
//! # Pattern Syntax
//!
//! - **`.example.com`**: `example.com` itself and every subdomain
//! - **`*.example.com`**: subdomains only, not `example.com`
//! - **`*` / `?`**: any run of characters / exactly one character, anchored to the whole host
//! - **anything else**: exact, case-sensitive match
//!
//! Patterns may only contain ASCII letters, digits, `.`, `-`, `*` and `?`.

mod error;
mod mode;
mod target;

pub mod engine;
pub mod icon;
pub mod pac;
pub mod proxy;
pub mod remote;
pub mod rule;
pub mod ruleset;
pub mod service;
pub mod store;

// Re-export core types
pub use error::{Error, PatternError, ProxyUrlError, Result};
pub use mode::Mode;
pub use target::{Decision, Target};

// Re-export engine types
pub use engine::{Config, ConfigUpdate, DecisionEngine, ProxySetting};
pub use proxy::ProxyTarget;
pub use ruleset::{ParsedRules, RuleSet};

// Re-export the live service
pub use service::{Message, MessageResponse, ProxySink, RoutingService};
pub use store::{StorageChange, StorageChanges, StoredConfig};

// Re-export remote lists and icon state
pub use icon::{IconScheduler, IconSink, IconState, TabEvent, TabId};
pub use remote::RuleListFetcher;
