//! Page side of the channel: one task per tab answering requests in order.

use std::sync::Arc;
use std::time::Duration;

use perceiver_structural::{CaptureOptions, StructuralPerceiver};
use tabpilot_core_types::{ActionResult, PageData};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::channel::{Envelope, PageChannel, PageRequest, PageResponse};
use crate::errors::ActionError;
use crate::page::PageContext;
use crate::primitives::{run_page_action, PrimitiveConfig};

/// Serves [`PageRequest`]s against one [`PageContext`].
pub struct PageWorker {
    page: Arc<dyn PageContext>,
    perceiver: StructuralPerceiver,
    cfg: PrimitiveConfig,
}

impl PageWorker {
    pub fn new(
        page: Arc<dyn PageContext>,
        perceiver: StructuralPerceiver,
        cfg: PrimitiveConfig,
    ) -> Self {
        Self {
            page,
            perceiver,
            cfg,
        }
    }

    /// Spawns the worker and returns the controller-side handle.
    pub fn spawn(self, timeout: Duration) -> (PageChannel, JoinHandle<()>) {
        let (channel, rx) = PageChannel::new(8, timeout);
        let handle = tokio::spawn(self.run(rx));
        (channel, handle)
    }

    async fn run(self, mut rx: mpsc::Receiver<Envelope>) {
        while let Some(Envelope { request, reply }) = rx.recv().await {
            let name = request.name();
            let response = self.handle(request).await;
            if reply.send(response).is_err() {
                debug!(request = name, "requester went away before the reply");
            }
        }
        debug!("page worker stopped");
    }

    pub async fn handle(&self, request: PageRequest) -> PageResponse {
        match request {
            PageRequest::GetPageData { options } => match self.page_data(&options).await {
                Ok(data) => PageResponse::PageData(data),
                Err(err) => {
                    warn!(error = %err, "page data capture failed");
                    PageResponse::Error(err.to_string())
                }
            },
            PageRequest::ExecuteAction { action, locators } => {
                let outcome =
                    run_page_action(self.page.as_ref(), &action, &locators, &self.cfg).await;
                let result = match outcome {
                    Ok(result) => result,
                    Err(err) => {
                        info!(
                            action = action.kind().wire_name(),
                            error = %err,
                            "in-page action failed"
                        );
                        ActionResult::failure(err.to_string())
                    }
                };
                PageResponse::ActionResult(result)
            }
            PageRequest::RemoveHighlights => {
                let success = match self.page.remove_highlights(None).await {
                    Ok(()) => true,
                    Err(err) => {
                        warn!(error = %err, "highlight removal failed");
                        false
                    }
                };
                PageResponse::HighlightsRemoved { success }
            }
            PageRequest::GetScrollInfo => match self.page.scroll_info().await {
                Ok(info) => PageResponse::ScrollInfo(info),
                Err(err) => PageResponse::Error(err.to_string()),
            },
        }
    }

    async fn page_data(&self, options: &CaptureOptions) -> Result<PageData, ActionError> {
        let perception = self.perceiver.capture(self.page.as_ref(), options).await?;
        let (title, url) = self.page.page_meta().await?;
        debug!(
            url = %url,
            elements = perception.element_count(),
            "page data captured"
        );
        Ok(PageData {
            title,
            url,
            clickable_elements: perception.clickable,
            xpaths: perception.locators,
        })
    }
}
