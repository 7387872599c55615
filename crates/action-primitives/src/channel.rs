//! Typed request/response channel between the controller and one page.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use perceiver_structural::CaptureOptions;
use tabpilot_core_types::{ActionResult, PageData, ScrollInfo};
use tokio::sync::{mpsc, oneshot, Mutex};
use tracing::debug;

use crate::errors::ChannelError;
use crate::schema::Action;

/// Requests understood by the page side.
#[derive(Clone, Debug)]
pub enum PageRequest {
    GetPageData {
        options: CaptureOptions,
    },
    ExecuteAction {
        action: Action,
        locators: BTreeMap<u32, String>,
    },
    RemoveHighlights,
    GetScrollInfo,
}

impl PageRequest {
    pub fn name(&self) -> &'static str {
        match self {
            PageRequest::GetPageData { .. } => "get_page_data",
            PageRequest::ExecuteAction { .. } => "execute_action",
            PageRequest::RemoveHighlights => "remove_highlights",
            PageRequest::GetScrollInfo => "get_scroll_info",
        }
    }
}

#[derive(Clone, Debug)]
pub enum PageResponse {
    PageData(PageData),
    ActionResult(ActionResult),
    HighlightsRemoved { success: bool },
    ScrollInfo(ScrollInfo),
    Error(String),
}

/// One queued request and where to send its answer.
#[derive(Debug)]
pub struct Envelope {
    pub request: PageRequest,
    pub reply: oneshot::Sender<PageResponse>,
}

/// Controller-side handle. Clones share the single-outstanding-request gate.
#[derive(Clone, Debug)]
pub struct PageChannel {
    tx: mpsc::Sender<Envelope>,
    gate: Arc<Mutex<()>>,
    timeout: Duration,
}

impl PageChannel {
    pub fn new(capacity: usize, timeout: Duration) -> (Self, mpsc::Receiver<Envelope>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (
            Self {
                tx,
                gate: Arc::new(Mutex::new(())),
                timeout,
            },
            rx,
        )
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Sends one request and waits for its reply.
    pub async fn request(&self, request: PageRequest) -> Result<PageResponse, ChannelError> {
        let _outstanding = self.gate.lock().await;
        let name = request.name();
        let (reply_tx, reply_rx) = oneshot::channel();

        self.tx
            .send(Envelope {
                request,
                reply: reply_tx,
            })
            .await
            .map_err(|_| ChannelError::Unreachable)?;

        match tokio::time::timeout(self.timeout, reply_rx).await {
            Ok(Ok(response)) => {
                debug!(request = name, "page channel reply received");
                Ok(response)
            }
            Ok(Err(_)) => Err(ChannelError::Unreachable),
            Err(_) => Err(ChannelError::Timeout(self.timeout.as_millis() as u64)),
        }
    }

    pub async fn get_page_data(&self, options: CaptureOptions) -> Result<PageData, ChannelError> {
        match self.request(PageRequest::GetPageData { options }).await? {
            PageResponse::PageData(data) => Ok(data),
            PageResponse::Error(message) => Err(ChannelError::Remote(message)),
            _ => Err(ChannelError::UnexpectedResponse("get_page_data")),
        }
    }

    pub async fn execute_action(
        &self,
        action: Action,
        locators: BTreeMap<u32, String>,
    ) -> Result<ActionResult, ChannelError> {
        match self
            .request(PageRequest::ExecuteAction { action, locators })
            .await?
        {
            PageResponse::ActionResult(result) => Ok(result),
            PageResponse::Error(message) => Err(ChannelError::Remote(message)),
            _ => Err(ChannelError::UnexpectedResponse("execute_action")),
        }
    }

    pub async fn remove_highlights(&self) -> Result<bool, ChannelError> {
        match self.request(PageRequest::RemoveHighlights).await? {
            PageResponse::HighlightsRemoved { success } => Ok(success),
            PageResponse::Error(message) => Err(ChannelError::Remote(message)),
            _ => Err(ChannelError::UnexpectedResponse("remove_highlights")),
        }
    }

    pub async fn scroll_info(&self) -> Result<ScrollInfo, ChannelError> {
        match self.request(PageRequest::GetScrollInfo).await? {
            PageResponse::ScrollInfo(info) => Ok(info),
            PageResponse::Error(message) => Err(ChannelError::Remote(message)),
            _ => Err(ChannelError::UnexpectedResponse("get_scroll_info")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn closed_queue_is_unreachable() {
        let (channel, rx) = PageChannel::new(4, Duration::from_secs(1));
        drop(rx);
        assert!(channel.is_closed());
        assert_eq!(
            channel.remove_highlights().await,
            Err(ChannelError::Unreachable)
        );
    }

    #[tokio::test]
    async fn dropped_reply_is_unreachable() {
        let (channel, mut rx) = PageChannel::new(4, Duration::from_secs(1));
        tokio::spawn(async move {
            while let Some(envelope) = rx.recv().await {
                drop(envelope.reply);
            }
        });
        assert_eq!(channel.scroll_info().await, Err(ChannelError::Unreachable));
    }

    #[tokio::test(start_paused = true)]
    async fn silent_page_times_out() {
        let (channel, mut rx) = PageChannel::new(4, Duration::from_millis(200));
        let _hold = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Some(envelope) = rx.recv().await {
                held.push(envelope);
            }
        });
        assert_eq!(
            channel.remove_highlights().await,
            Err(ChannelError::Timeout(200))
        );
    }

    #[tokio::test]
    async fn mismatched_reply_is_reported() {
        let (channel, mut rx) = PageChannel::new(4, Duration::from_secs(1));
        tokio::spawn(async move {
            while let Some(envelope) = rx.recv().await {
                let _ = envelope
                    .reply
                    .send(PageResponse::HighlightsRemoved { success: true });
            }
        });
        assert_eq!(
            channel.scroll_info().await,
            Err(ChannelError::UnexpectedResponse("get_scroll_info"))
        );
        assert_eq!(channel.remove_highlights().await, Ok(true));
    }
}
