//! Tab management: navigation, search, switching and opening tabs.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use cdp_adapter::{AdapterError, ChromiumBrowser, PageDriver};
use dashmap::DashMap;
use perceiver_structural::StructuralPerceiver;
use tabpilot_core_types::{TabId, TabInfo};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;

use crate::channel::PageChannel;
use crate::errors::TabError;
use crate::page::{PageContext, ScriptedPage};
use crate::primitives::PrimitiveConfig;
use crate::worker::PageWorker;

const GOOGLE_SEARCH: &str = "https://www.google.com/search";

/// Tab-level surface used by the executor and the loop.
#[async_trait]
pub trait TabControl: Send + Sync {
    /// Navigates the active tab.
    async fn navigate(&self, url: &str) -> Result<(), TabError>;

    async fn search(&self, query: &str) -> Result<(), TabError> {
        let url = google_search_url(query)?;
        self.navigate(url.as_str()).await
    }

    async fn switch_tab(&self, id: TabId) -> Result<TabInfo, TabError>;

    /// Opens a tab and makes it active.
    async fn open_tab(&self, url: &str) -> Result<TabInfo, TabError>;

    async fn list_tabs(&self) -> Result<Vec<TabInfo>, TabError>;

    /// Base64 PNG of the active tab's viewport.
    async fn screenshot(&self) -> Result<String, TabError>;

    /// Channel to the active tab's page context.
    async fn active_channel(&self) -> Result<PageChannel, TabError>;
}

/// `https://www.google.com/search?q=<query>`
pub fn google_search_url(query: &str) -> Result<Url, TabError> {
    Url::parse_with_params(GOOGLE_SEARCH, &[("q", query)])
        .map_err(|_| TabError::InvalidUrl(query.to_string()))
}

/// Adds `https://` to scheme-less input and validates the result.
pub fn normalize_url(raw: &str) -> Result<String, TabError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(TabError::InvalidUrl(raw.to_string()));
    }
    let candidate = if trimmed.contains("://")
        || trimmed.starts_with("about:")
        || trimmed.starts_with("data:")
    {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };
    Url::parse(&candidate)
        .map(|url| url.to_string())
        .map_err(|_| TabError::InvalidUrl(raw.to_string()))
}

/// Opens new pages in some browser.
#[async_trait]
pub trait PageOpener: Send + Sync {
    async fn open_page(&self, url: &str) -> Result<Arc<dyn PageDriver>, AdapterError>;
}

#[async_trait]
impl PageOpener for ChromiumBrowser {
    async fn open_page(&self, url: &str) -> Result<Arc<dyn PageDriver>, AdapterError> {
        let page = self.new_page(url).await?;
        Ok(Arc::new(page))
    }
}

struct TabEntry {
    driver: Arc<dyn PageDriver>,
    channel: PageChannel,
    worker: JoinHandle<()>,
}

impl Drop for TabEntry {
    fn drop(&mut self) {
        self.worker.abort();
    }
}

/// [`TabControl`] over real pages, each served by its own page worker.
pub struct BrowserTabs {
    opener: Arc<dyn PageOpener>,
    tabs: DashMap<TabId, TabEntry>,
    active: RwLock<Option<TabId>>,
    next_id: AtomicU32,
    perceiver: StructuralPerceiver,
    primitive_cfg: PrimitiveConfig,
    channel_timeout: Duration,
}

impl BrowserTabs {
    pub fn new(
        opener: Arc<dyn PageOpener>,
        perceiver: StructuralPerceiver,
        primitive_cfg: PrimitiveConfig,
        channel_timeout: Duration,
    ) -> Self {
        Self {
            opener,
            tabs: DashMap::new(),
            active: RwLock::new(None),
            next_id: AtomicU32::new(0),
            perceiver,
            primitive_cfg,
            channel_timeout,
        }
    }

    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }

    pub async fn active_id(&self) -> Option<TabId> {
        *self.active.read().await
    }

    async fn active_driver(&self) -> Result<Arc<dyn PageDriver>, TabError> {
        let id = self.active_id().await.ok_or(TabError::NoActiveTab)?;
        self.tabs
            .get(&id)
            .map(|entry| Arc::clone(&entry.driver))
            .ok_or(TabError::UnknownTab(id))
    }

    /// Closes a tab and stops its page worker. Closing the active tab makes
    /// the most recently opened remaining tab active.
    pub async fn close_tab(&self, id: TabId) -> Result<(), TabError> {
        let (_, entry) = self.tabs.remove(&id).ok_or(TabError::UnknownTab(id))?;
        {
            let mut active = self.active.write().await;
            if *active == Some(id) {
                *active = self.tabs.iter().map(|entry| *entry.key()).max();
            }
        }
        let closed = entry.driver.close().await;
        drop(entry);
        info!(tab = %id, "closed tab");
        closed.map_err(TabError::from)
    }

    /// Closes every registered tab; failures are logged and skipped.
    pub async fn close_all(&self) {
        let ids: Vec<TabId> = self.tabs.iter().map(|entry| *entry.key()).collect();
        for id in ids {
            if let Err(err) = self.close_tab(id).await {
                warn!(tab = %id, error = %err, "closing tab failed");
            }
        }
    }

    async fn describe(
        id: TabId,
        driver: &dyn PageDriver,
        active: bool,
    ) -> Result<TabInfo, TabError> {
        Ok(TabInfo {
            id,
            url: driver.current_url().await?,
            title: driver.title().await?,
            active,
        })
    }
}

#[async_trait]
impl TabControl for BrowserTabs {
    async fn navigate(&self, url: &str) -> Result<(), TabError> {
        let url = normalize_url(url)?;
        let driver = self.active_driver().await?;
        info!(url = %url, "navigating active tab");
        driver.navigate(&url).await?;
        Ok(())
    }

    async fn switch_tab(&self, id: TabId) -> Result<TabInfo, TabError> {
        let driver = self
            .tabs
            .get(&id)
            .map(|entry| Arc::clone(&entry.driver))
            .ok_or(TabError::UnknownTab(id))?;
        driver.bring_to_front().await?;
        *self.active.write().await = Some(id);
        info!(tab = %id, "switched tab");
        Self::describe(id, driver.as_ref(), true).await
    }

    async fn open_tab(&self, url: &str) -> Result<TabInfo, TabError> {
        let url = normalize_url(url)?;
        let driver = self.opener.open_page(&url).await?;
        let page: Arc<dyn PageContext> = Arc::new(ScriptedPage::new(Arc::clone(&driver)));
        let worker = PageWorker::new(page, self.perceiver.clone(), self.primitive_cfg.clone());
        let (channel, handle) = worker.spawn(self.channel_timeout);

        let id = TabId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.tabs.insert(
            id,
            TabEntry {
                driver: Arc::clone(&driver),
                channel,
                worker: handle,
            },
        );
        *self.active.write().await = Some(id);
        if let Err(err) = driver.bring_to_front().await {
            debug!(tab = %id, error = %err, "bring_to_front failed");
        }
        info!(tab = %id, url = %url, "opened tab");
        Self::describe(id, driver.as_ref(), true).await
    }

    async fn list_tabs(&self) -> Result<Vec<TabInfo>, TabError> {
        let active = self.active_id().await;
        let mut drivers: Vec<(TabId, Arc<dyn PageDriver>)> = self
            .tabs
            .iter()
            .map(|entry| (*entry.key(), Arc::clone(&entry.value().driver)))
            .collect();
        drivers.sort_by_key(|(id, _)| *id);

        let mut tabs = Vec::with_capacity(drivers.len());
        for (id, driver) in drivers {
            tabs.push(Self::describe(id, driver.as_ref(), active == Some(id)).await?);
        }
        Ok(tabs)
    }

    async fn screenshot(&self) -> Result<String, TabError> {
        let driver = self.active_driver().await?;
        let png = driver.screenshot_png().await?;
        Ok(BASE64.encode(png))
    }

    async fn active_channel(&self) -> Result<PageChannel, TabError> {
        let id = self.active_id().await.ok_or(TabError::NoActiveTab)?;
        self.tabs
            .get(&id)
            .map(|entry| entry.channel.clone())
            .ok_or(TabError::UnknownTab(id))
    }
}
