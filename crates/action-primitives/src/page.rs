use std::sync::Arc;

use async_trait::async_trait;
use cdp_adapter::{KeyChord, PageDriver};
use perceiver_structural::{
    DomProbe, DriverProbe, HighlightBox, PerceiverError, ProbeSnapshot,
};
use serde::Deserialize;
use serde_json::Value;
use tabpilot_core_types::ScrollInfo;

use crate::errors::ActionError;
use crate::scripts::{self, check_reply};
use crate::types::{DropdownOption, ElementBox, ElementTarget};

/// Operations available inside one page. Each call resolves its target afresh.
#[async_trait]
pub trait PageContext: DomProbe {
    /// `(title, url)` of the page.
    async fn page_meta(&self) -> Result<(String, String), ActionError>;

    async fn scroll_info(&self) -> Result<ScrollInfo, ActionError>;

    /// Current box of the target, or `None` when it does not resolve.
    async fn locate(&self, target: &ElementTarget) -> Result<Option<ElementBox>, ActionError>;

    /// Starts a smooth, centre-aligned scroll towards the target.
    async fn scroll_into_view(&self, target: &ElementTarget) -> Result<(), ActionError>;

    async fn click(&self, target: &ElementTarget) -> Result<(), ActionError>;

    async fn input_text(&self, target: &ElementTarget, text: &str) -> Result<(), ActionError>;

    /// Scrolls the window; `None` scrolls one viewport down.
    async fn scroll_by(&self, amount: Option<i64>) -> Result<(), ActionError>;

    async fn scroll_to_text(&self, text: &str) -> Result<(), ActionError>;

    async fn send_keys(&self, keys: &str) -> Result<(), ActionError>;

    async fn extract_text(&self) -> Result<String, ActionError>;

    async fn dropdown_options(
        &self,
        target: &ElementTarget,
    ) -> Result<Vec<DropdownOption>, ActionError>;

    /// Selects by visible text and returns the chosen option's value.
    async fn select_option(&self, target: &ElementTarget, text: &str)
        -> Result<String, ActionError>;
}

/// [`PageContext`] implemented with scripts evaluated through a [`PageDriver`].
pub struct ScriptedPage<D>
where
    D: PageDriver + ?Sized,
{
    driver: Arc<D>,
    probe: DriverProbe<D>,
}

impl<D> ScriptedPage<D>
where
    D: PageDriver + ?Sized,
{
    pub fn new(driver: Arc<D>) -> Self {
        Self {
            probe: DriverProbe::new(Arc::clone(&driver)),
            driver,
        }
    }

    pub fn driver(&self) -> &Arc<D> {
        &self.driver
    }

    async fn run(&self, script: &str) -> Result<Value, ActionError> {
        let value = self.driver.evaluate(script).await?;
        check_reply(value)
    }
}

#[async_trait]
impl<D> DomProbe for ScriptedPage<D>
where
    D: PageDriver + ?Sized,
{
    async fn probe(&self) -> Result<ProbeSnapshot, PerceiverError> {
        self.probe.probe().await
    }

    async fn paint_highlights(&self, boxes: &[HighlightBox]) -> Result<(), PerceiverError> {
        self.probe.paint_highlights(boxes).await
    }

    async fn remove_highlights(&self, index: Option<u32>) -> Result<(), PerceiverError> {
        self.probe.remove_highlights(index).await
    }
}

#[derive(Deserialize)]
struct OptionsReply {
    options: Vec<DropdownOption>,
}

#[derive(Deserialize)]
struct SelectReply {
    value: String,
}

#[derive(Deserialize)]
struct TextReply {
    text: String,
}

fn decode<T: serde::de::DeserializeOwned>(value: Value) -> Result<T, ActionError> {
    serde_json::from_value(value)
        .map_err(|err| ActionError::CdpIo(format!("malformed script reply: {err}")))
}

#[async_trait]
impl<D> PageContext for ScriptedPage<D>
where
    D: PageDriver + ?Sized,
{
    async fn page_meta(&self) -> Result<(String, String), ActionError> {
        let title = self.driver.title().await?;
        let url = self.driver.current_url().await?;
        Ok((title, url))
    }

    async fn scroll_info(&self) -> Result<ScrollInfo, ActionError> {
        let value = self.run(scripts::SCROLL_INFO).await?;
        decode(value)
    }

    async fn locate(&self, target: &ElementTarget) -> Result<Option<ElementBox>, ActionError> {
        match self.run(&scripts::locate(target)?).await {
            Ok(value) => decode(value).map(Some),
            Err(ActionError::ElementNotFound) => Ok(None),
            Err(err) => Err(err),
        }
    }

    async fn scroll_into_view(&self, target: &ElementTarget) -> Result<(), ActionError> {
        self.run(&scripts::scroll_into_view(target)?).await?;
        Ok(())
    }

    async fn click(&self, target: &ElementTarget) -> Result<(), ActionError> {
        self.run(&scripts::click(target)?).await?;
        Ok(())
    }

    async fn input_text(&self, target: &ElementTarget, text: &str) -> Result<(), ActionError> {
        self.run(&scripts::input_text(target, text)?).await?;
        Ok(())
    }

    async fn scroll_by(&self, amount: Option<i64>) -> Result<(), ActionError> {
        self.run(&scripts::scroll_by(amount)).await?;
        Ok(())
    }

    async fn scroll_to_text(&self, text: &str) -> Result<(), ActionError> {
        match self.run(&scripts::scroll_to_text(text)?).await {
            Ok(_) => Ok(()),
            Err(ActionError::TextNotFound(_)) => Err(ActionError::TextNotFound(text.to_string())),
            Err(err) => Err(err),
        }
    }

    async fn send_keys(&self, keys: &str) -> Result<(), ActionError> {
        let chord =
            KeyChord::parse(keys).map_err(|err| ActionError::InvalidParams(err.to_string()))?;
        self.driver.dispatch_keys(&chord).await?;
        Ok(())
    }

    async fn extract_text(&self) -> Result<String, ActionError> {
        let reply: TextReply = decode(self.run(scripts::EXTRACT_TEXT).await?)?;
        Ok(reply.text)
    }

    async fn dropdown_options(
        &self,
        target: &ElementTarget,
    ) -> Result<Vec<DropdownOption>, ActionError> {
        let reply: OptionsReply = decode(self.run(&scripts::dropdown_options(target)?).await?)?;
        Ok(reply.options)
    }

    async fn select_option(
        &self,
        target: &ElementTarget,
        text: &str,
    ) -> Result<String, ActionError> {
        match self.run(&scripts::select_option(target, text)?).await {
            Ok(value) => decode::<SelectReply>(value).map(|reply| reply.value),
            Err(ActionError::OptionNotFound(_)) => Err(ActionError::OptionNotFound(text.to_string())),
            Err(err) => Err(err),
        }
    }
}
