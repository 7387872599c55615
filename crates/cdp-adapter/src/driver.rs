use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::input::{DispatchKeyEventParams, DispatchKeyEventType};
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use serde_json::Value;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::error::{AdapterError, AdapterErrorKind};
use crate::keys::KeyChord;

/// Page-level surface the automation layers are written against.
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Evaluates a script expression and returns its JSON value (`Null` for undefined).
    async fn evaluate(&self, script: &str) -> Result<Value, AdapterError>;

    async fn navigate(&self, url: &str) -> Result<(), AdapterError>;

    async fn current_url(&self) -> Result<String, AdapterError>;

    async fn title(&self) -> Result<String, AdapterError>;

    /// PNG of the visible viewport.
    async fn screenshot_png(&self) -> Result<Vec<u8>, AdapterError>;

    async fn dispatch_keys(&self, chord: &KeyChord) -> Result<(), AdapterError>;

    async fn bring_to_front(&self) -> Result<(), AdapterError>;

    /// Closes the underlying target.
    async fn close(&self) -> Result<(), AdapterError>;
}

/// [`PageDriver`] backed by one chromiumoxide page.
#[derive(Clone, Debug)]
pub struct ChromiumPage {
    page: Page,
    nav_timeout: Duration,
    eval_timeout: Duration,
}

impl ChromiumPage {
    pub fn new(page: Page, nav_timeout: Duration, eval_timeout: Duration) -> Self {
        Self {
            page,
            nav_timeout,
            eval_timeout,
        }
    }

    pub fn inner(&self) -> &Page {
        &self.page
    }

    async fn send_key_event(
        &self,
        kind: DispatchKeyEventType,
        chord: &KeyChord,
        text: Option<String>,
    ) -> Result<(), AdapterError> {
        let mut builder = DispatchKeyEventParams::builder()
            .r#type(kind)
            .key(chord.key.clone())
            .modifiers(chord.modifiers);
        if let Some(text) = text {
            builder = builder.text(text);
        }
        let params = builder.build().map_err(|err| {
            AdapterError::new(AdapterErrorKind::InvalidInput).with_hint(err.to_string())
        })?;
        self.page
            .execute(params)
            .await
            .map_err(AdapterError::cdp_io)?;
        Ok(())
    }
}

#[async_trait]
impl PageDriver for ChromiumPage {
    async fn evaluate(&self, script: &str) -> Result<Value, AdapterError> {
        let evaluation = timeout(self.eval_timeout, self.page.evaluate(script))
            .await
            .map_err(|_| {
                AdapterError::new(AdapterErrorKind::Script)
                    .with_hint("evaluation timed out")
                    .retriable(true)
            })?;
        match evaluation {
            Ok(result) => Ok(result.value().cloned().unwrap_or(Value::Null)),
            Err(err) => {
                warn!(target: "cdp", error = %err, "script evaluation failed");
                Err(AdapterError::new(AdapterErrorKind::Script).with_hint(err.to_string()))
            }
        }
    }

    async fn navigate(&self, url: &str) -> Result<(), AdapterError> {
        debug!(target: "cdp", url, "navigating");
        match timeout(self.nav_timeout, self.page.goto(url)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(err)) => Err(AdapterError::cdp_io(err)),
            Err(_) => Err(AdapterError::new(AdapterErrorKind::NavTimeout)
                .with_hint(format!("navigation to {url} exceeded {:?}", self.nav_timeout))
                .retriable(true)),
        }
    }

    async fn current_url(&self) -> Result<String, AdapterError> {
        let url = self.page.url().await.map_err(AdapterError::cdp_io)?;
        Ok(url.unwrap_or_default())
    }

    async fn title(&self) -> Result<String, AdapterError> {
        let title = self.page.get_title().await.map_err(AdapterError::cdp_io)?;
        Ok(title.unwrap_or_default())
    }

    async fn screenshot_png(&self) -> Result<Vec<u8>, AdapterError> {
        self.page
            .screenshot(ScreenshotParams::builder().build())
            .await
            .map_err(AdapterError::cdp_io)
    }

    async fn dispatch_keys(&self, chord: &KeyChord) -> Result<(), AdapterError> {
        self.send_key_event(DispatchKeyEventType::KeyDown, chord, chord.text())
            .await?;
        self.send_key_event(DispatchKeyEventType::KeyUp, chord, None)
            .await
    }

    async fn bring_to_front(&self) -> Result<(), AdapterError> {
        self.page
            .bring_to_front()
            .await
            .map_err(AdapterError::cdp_io)?;
        Ok(())
    }

    async fn close(&self) -> Result<(), AdapterError> {
        debug!(target: "cdp", "closing page");
        self.page
            .clone()
            .close()
            .await
            .map_err(AdapterError::cdp_io)
    }
}
