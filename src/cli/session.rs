use std::sync::Arc;

use action_primitives::{BrowserTabs, PageOpener, PrimitiveConfig};
use anyhow::{Context, Result};
use cdp_adapter::{CdpConfig, ChromiumBrowser};
use perceiver_structural::StructuralPerceiver;
use tracing::{info, warn};

/// A launched browser and the tab registry built over it.
pub struct BrowserSession {
    browser: Arc<ChromiumBrowser>,
    tabs: Arc<BrowserTabs>,
}

impl BrowserSession {
    pub async fn launch(visible: bool, extract_char_limit: usize) -> Result<Self> {
        let mut cfg = CdpConfig::default();
        if visible {
            cfg = cfg.with_headless(false);
        }
        let channel_timeout = cfg.channel_timeout();

        let browser = Arc::new(
            ChromiumBrowser::launch(cfg)
                .await
                .context("Failed to launch Chromium (set CHROME_BIN to override)")?,
        );
        let opener: Arc<dyn PageOpener> = browser.clone();
        let primitives = PrimitiveConfig {
            extract_char_limit,
            ..PrimitiveConfig::default()
        };
        let tabs = Arc::new(BrowserTabs::new(
            opener,
            StructuralPerceiver::default(),
            primitives,
            channel_timeout,
        ));
        info!(visible, "browser session ready");
        Ok(Self { browser, tabs })
    }

    pub fn tabs(&self) -> Arc<BrowserTabs> {
        Arc::clone(&self.tabs)
    }

    /// Closes every tab, then the browser. Callers must drop their tab handles first.
    pub async fn shutdown(self) {
        let Self { browser, tabs } = self;
        tabs.close_all().await;
        drop(tabs);
        match Arc::try_unwrap(browser) {
            Ok(browser) => browser.close().await,
            Err(_) => warn!("browser still referenced, leaving it to exit with the process"),
        }
    }
}
