//! Toolbar icon state.
//!
//! The icon shows whether the page in a tab is being proxied. Navigation
//! events arrive in bursts, so updates are debounced per tab: a new event
//! for a tab cancels that tab's pending update and the latest URL wins.

use ahash::AHashMap;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use url::{Host, Url};

use crate::service::RoutingService;
use crate::{DecisionEngine, Result};

/// Browser tab identifier.
pub type TabId = i32;

/// Default debounce window for icon updates.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(100);

/// Page URL prefixes that never get a routing decision.
const SPECIAL_PREFIXES: &[&str] = &[
    "chrome://",
    "edge://",
    "extensions://",
    "chrome-extension://",
    "chrome-error://",
];

/// Which icon to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IconState {
    /// The page is routed through the proxy
    Proxy,
    /// Direct, disabled, or not a web page
    #[default]
    Default,
}

/// Platform icon setter.
#[async_trait]
pub trait IconSink: Send + Sync {
    /// Set the icon for one tab, or for all tabs when `tab` is `None`.
    async fn set_icon(&self, tab: Option<TabId>, state: IconState, title: Option<String>)
        -> Result<()>;
}

/// Tab events that may change the icon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TabEvent {
    /// A tab became active
    Activated { tab_id: TabId, url: String },
    /// Navigation is about to start in some frame
    BeforeNavigate {
        tab_id: TabId,
        frame_id: i64,
        url: String,
    },
    /// A tab's status changed
    Updated {
        tab_id: TabId,
        status: Option<String>,
        url: String,
    },
}

impl TabEvent {
    /// The tab and URL to refresh, if this event calls for a refresh.
    ///
    /// Only main-frame navigations and `loading` status updates count.
    pub fn refresh_target(&self) -> Option<(TabId, &str)> {
        match self {
            TabEvent::Activated { tab_id, url } => Some((*tab_id, url)),
            TabEvent::BeforeNavigate {
                tab_id,
                frame_id: 0,
                url,
            } => Some((*tab_id, url)),
            TabEvent::BeforeNavigate { .. } => None,
            TabEvent::Updated {
                tab_id,
                status: Some(status),
                url,
            } if status == "loading" => Some((*tab_id, url)),
            TabEvent::Updated { .. } => None,
        }
    }
}

/// Extract the host to evaluate from a page URL.
///
/// Returns `None` for blank tabs, browser-internal pages and anything that
/// doesn't parse or has no host. IPv6 hosts come back without brackets.
///
/// # Examples
/// ```
/// use pacrule::icon::page_host;
///
/// assert_eq!(page_host("https://www.qq.com/news").as_deref(), Some("www.qq.com"));
/// assert_eq!(page_host("http://[::1]:8080/").as_deref(), Some("::1"));
/// assert_eq!(page_host("chrome://settings"), None);
/// assert_eq!(page_host("about:blank"), None);
/// ```
pub fn page_host(page_url: &str) -> Option<String> {
    if page_url.is_empty()
        || page_url == "about:blank"
        || SPECIAL_PREFIXES.iter().any(|p| page_url.starts_with(p))
    {
        return None;
    }

    let url = Url::parse(page_url).ok()?;
    match url.host()? {
        Host::Domain(domain) => Some(domain.to_string()),
        Host::Ipv4(addr) => Some(addr.to_string()),
        Host::Ipv6(addr) => Some(addr.to_string()),
    }
}

/// Icon state and tooltip for a page under the given snapshot.
pub fn icon_for_url(engine: &DecisionEngine, page_url: &str) -> (IconState, Option<String>) {
    let Some(host) = page_host(page_url) else {
        log::debug!("Special URL, using default icon: {:?}", page_url);
        return (IconState::Default, None);
    };

    let decision = engine.evaluate(&host);
    log::debug!("host: {}, result: {}", host, decision);
    let state = if decision.is_proxy() {
        IconState::Proxy
    } else {
        IconState::Default
    };
    (state, Some(format!("{}: {}", host, decision)))
}

/// A scheduled update; `id` tells a task whether it is still the current one.
struct PendingUpdate {
    id: u64,
    handle: JoinHandle<()>,
}

type PendingMap = Arc<Mutex<AHashMap<TabId, PendingUpdate>>>;

/// Debounces icon updates per tab.
///
/// Only tabs with an update in flight are tracked; a task drops its own
/// entry once it has run.
///
/// Must be used from within a tokio runtime.
pub struct IconScheduler {
    service: Arc<RoutingService>,
    sink: Arc<dyn IconSink>,
    delay: Duration,
    pending: PendingMap,
    next_id: AtomicU64,
}

impl IconScheduler {
    /// Create a scheduler with the default 100 ms window.
    pub fn new(service: Arc<RoutingService>, sink: Arc<dyn IconSink>) -> Self {
        Self::with_delay(service, sink, DEFAULT_DEBOUNCE)
    }

    /// Create a scheduler with a custom debounce window.
    pub fn with_delay(service: Arc<RoutingService>, sink: Arc<dyn IconSink>, delay: Duration) -> Self {
        Self {
            service,
            sink,
            delay,
            pending: Arc::new(Mutex::new(AHashMap::new())),
            next_id: AtomicU64::new(0),
        }
    }

    /// Reset every tab to the default icon.
    pub async fn reset_all(&self) {
        if let Err(e) = self.sink.set_icon(None, IconState::Default, None).await {
            log::error!("Failed to set default icon: {}", e);
        }
    }

    /// Handle a tab event, scheduling a refresh when it calls for one.
    pub fn on_event(&self, event: &TabEvent) {
        if let Some((tab_id, url)) = event.refresh_target() {
            self.schedule(tab_id, url);
        }
    }

    /// Schedule an icon update, replacing any pending one for the tab.
    ///
    /// The decision is made when the window elapses, against the snapshot
    /// current at that moment.
    pub fn schedule(&self, tab_id: TabId, page_url: &str) {
        let service = self.service.clone();
        let sink = self.sink.clone();
        let delay = self.delay;
        let page_url = page_url.to_string();
        let pending = self.pending.clone();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        // Hold the lock across spawn so the task can't finish before its entry exists
        let mut tasks = self.pending.lock();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            let engine = service.engine();
            let (state, title) = icon_for_url(&engine, &page_url);
            match sink.set_icon(Some(tab_id), state, title).await {
                Ok(()) => log::debug!("Icon updated to {:?} for tab {}, url: {}", state, tab_id, page_url),
                Err(e) => log::error!("Failed to set icon for tab {}: {}", tab_id, e),
            }

            let mut tasks = pending.lock();
            if tasks.get(&tab_id).is_some_and(|t| t.id == id) {
                tasks.remove(&tab_id);
            }
        });

        if let Some(previous) = tasks.insert(tab_id, PendingUpdate { id, handle }) {
            previous.handle.abort();
        }
    }

    /// Cancel a tab's pending update and forget it (e.g. on tab close).
    pub fn forget_tab(&self, tab_id: TabId) {
        if let Some(task) = self.pending.lock().remove(&tab_id) {
            task.handle.abort();
        }
    }

    /// Number of tabs with an update still pending.
    pub fn tracked_tabs(&self) -> usize {
        self.pending.lock().len()
    }
}

impl Drop for IconScheduler {
    fn drop(&mut self) {
        for (_, task) in self.pending.lock().drain() {
            task.handle.abort();
        }
    }
}
