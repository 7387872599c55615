use chromiumoxide::browser::{Browser, BrowserConfig};
use futures::StreamExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::CdpConfig;
use crate::driver::ChromiumPage;
use crate::error::{AdapterError, AdapterErrorKind};

/// A launched Chromium process plus the task pumping its CDP handler.
pub struct ChromiumBrowser {
    browser: Mutex<Browser>,
    handler: JoinHandle<()>,
    cfg: CdpConfig,
}

impl ChromiumBrowser {
    pub async fn launch(cfg: CdpConfig) -> Result<Self, AdapterError> {
        let mut builder =
            BrowserConfig::builder().window_size(cfg.window_width, cfg.window_height);
        if !cfg.headless {
            builder = builder.with_head();
        }
        if !cfg.executable.as_os_str().is_empty() {
            builder = builder.chrome_executable(cfg.executable.clone());
        }
        for arg in &cfg.extra_args {
            builder = builder.arg(arg.clone());
        }
        let browser_config = builder.build().map_err(|err| {
            AdapterError::new(AdapterErrorKind::Launch).with_hint(err.to_string())
        })?;

        info!(
            target: "cdp",
            headless = cfg.headless,
            executable = %cfg.executable.display(),
            "launching chromium"
        );
        let (browser, mut handler) = Browser::launch(browser_config).await.map_err(|err| {
            AdapterError::new(AdapterErrorKind::Launch).with_hint(err.to_string())
        })?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(err) = event {
                    debug!(target: "cdp", error = %err, "handler event error");
                }
            }
        });

        Ok(Self {
            browser: Mutex::new(browser),
            handler,
            cfg,
        })
    }

    pub fn config(&self) -> &CdpConfig {
        &self.cfg
    }

    /// Opens a new tab at `url`.
    pub async fn new_page(&self, url: &str) -> Result<ChromiumPage, AdapterError> {
        let browser = self.browser.lock().await;
        let page = browser.new_page(url).await.map_err(AdapterError::cdp_io)?;
        Ok(ChromiumPage::new(
            page,
            self.cfg.navigation_timeout(),
            self.cfg.eval_timeout(),
        ))
    }

    pub async fn close(self) {
        let mut browser = self.browser.into_inner();
        if let Err(err) = browser.close().await {
            warn!(target: "cdp", error = %err, "browser close failed");
        }
        if let Err(err) = browser.wait().await {
            debug!(target: "cdp", error = %err, "browser wait failed");
        }
        self.handler.abort();
    }
}
