use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::errors::PerceiverError;
use crate::indexer::index_dom;
use crate::model::{CaptureOptions, HighlightBox};
use crate::ports::{DomProbe, LiveDom};
use crate::serialize::DEFAULT_INCLUDE_ATTRIBUTES;
use crate::tree::DomTree;

/// One capture, ready for prompting and targeting. Single-use: it describes
/// the page only as it was when probed.
#[derive(Clone, Debug)]
pub struct Perception {
    pub tree: DomTree,
    pub clickable: String,
    pub locators: BTreeMap<u32, String>,
    pub highlights: Vec<HighlightBox>,
}

impl Perception {
    pub fn element_count(&self) -> usize {
        self.locators.len()
    }
}

/// Indexer + tree + serializer behind one call.
#[derive(Clone, Debug)]
pub struct StructuralPerceiver {
    include_attrs: Vec<String>,
}

impl Default for StructuralPerceiver {
    fn default() -> Self {
        Self::new(DEFAULT_INCLUDE_ATTRIBUTES.iter().map(|s| s.to_string()).collect())
    }
}

impl StructuralPerceiver {
    pub fn new(include_attrs: Vec<String>) -> Self {
        Self { include_attrs }
    }

    pub fn include_attrs(&self) -> &[String] {
        &self.include_attrs
    }

    /// Indexes and serializes an already collected tree.
    pub fn perceive<D>(&self, dom: &D, opts: &CaptureOptions) -> Result<Perception, PerceiverError>
    where
        D: LiveDom + ?Sized,
    {
        let capture = index_dom(dom, opts)?;
        let tree = DomTree::from_capture(&capture.root_id, &capture.map)?;
        let clickable = tree.serialize_clickable(self.include_attrs.as_slice());
        let locators = tree.locator_map();
        Ok(Perception {
            tree,
            clickable,
            locators,
            highlights: capture.highlights,
        })
    }

    /// Probes the page, indexes it and paints the overlay when requested.
    pub async fn capture<P>(
        &self,
        probe: &P,
        opts: &CaptureOptions,
    ) -> Result<Perception, PerceiverError>
    where
        P: DomProbe + ?Sized,
    {
        let snapshot = probe.probe().await?;
        let perception = self.perceive(&snapshot, opts)?;
        if opts.do_highlight && !perception.highlights.is_empty() {
            if let Err(err) = probe.paint_highlights(&perception.highlights).await {
                warn!(target: "perceiver", error = %err, "highlight painting failed");
            }
        }
        debug!(
            target: "perceiver",
            elements = perception.element_count(),
            "capture complete"
        );
        Ok(perception)
    }
}
