use std::sync::Arc;

use async_trait::async_trait;
use cdp_adapter::PageDriver;
use tracing::debug;

use crate::errors::PerceiverError;
use crate::model::{HighlightBox, ProbeNode, ProbeSnapshot, Viewport};
use crate::probe;

/// Read access to the live element tree the indexer walks.
pub trait LiveDom {
    fn root_id(&self) -> &str;
    fn node(&self, id: &str) -> Option<&ProbeNode>;
    fn viewport(&self) -> Viewport;
}

impl LiveDom for ProbeSnapshot {
    fn root_id(&self) -> &str {
        &self.root_id
    }

    fn node(&self, id: &str) -> Option<&ProbeNode> {
        self.nodes.get(id)
    }

    fn viewport(&self) -> Viewport {
        self.viewport
    }
}

/// Page-side collection and overlay painting.
#[async_trait]
pub trait DomProbe: Send + Sync {
    async fn probe(&self) -> Result<ProbeSnapshot, PerceiverError>;

    async fn paint_highlights(&self, boxes: &[HighlightBox]) -> Result<(), PerceiverError>;

    /// Removes one overlay, or all of them when `index` is `None`.
    async fn remove_highlights(&self, index: Option<u32>) -> Result<(), PerceiverError>;
}

pub struct DriverProbe<D>
where
    D: PageDriver + ?Sized,
{
    driver: Arc<D>,
}

impl<D> DriverProbe<D>
where
    D: PageDriver + ?Sized,
{
    pub fn new(driver: Arc<D>) -> Self {
        Self { driver }
    }
}

#[async_trait]
impl<D> DomProbe for DriverProbe<D>
where
    D: PageDriver + ?Sized,
{
    async fn probe(&self) -> Result<ProbeSnapshot, PerceiverError> {
        let raw = self.driver.evaluate(probe::PROBE_SCRIPT).await?;
        let snapshot = probe::parse_snapshot(raw)?;
        debug!(
            target: "perceiver",
            nodes = snapshot.nodes.len(),
            "probe collected"
        );
        Ok(snapshot)
    }

    async fn paint_highlights(&self, boxes: &[HighlightBox]) -> Result<(), PerceiverError> {
        if boxes.is_empty() {
            return Ok(());
        }
        let script = probe::paint_script(boxes)?;
        self.driver.evaluate(&script).await?;
        Ok(())
    }

    async fn remove_highlights(&self, index: Option<u32>) -> Result<(), PerceiverError> {
        self.driver.evaluate(&probe::remove_script(index)).await?;
        Ok(())
    }
}
