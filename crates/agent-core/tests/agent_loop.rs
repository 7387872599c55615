//! Agent loop behaviour against a scripted model and an in-memory page.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use action_primitives::{Envelope, PageChannel, PageRequest, PageResponse, TabControl, TabError};
use agent_core::{
    AgentError, AgentLoop, AgentSettings, CompletionClient, CompletionRequest, OutcomeStatus,
    TraceContext,
};
use async_trait::async_trait;
use tabpilot_core_types::{ActionResult, PageData, ScrollInfo, TabId, TabInfo};

#[derive(Default)]
struct ScriptedClient {
    replies: Mutex<VecDeque<Result<String, String>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedClient {
    fn new<I, S>(replies: I) -> Arc<Self>
    where
        I: IntoIterator<Item = Result<S, &'static str>>,
        S: Into<String>,
    {
        let replies = replies
            .into_iter()
            .map(|reply| reply.map(Into::into).map_err(str::to_string))
            .collect();
        Arc::new(Self {
            replies: Mutex::new(replies),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionClient for ScriptedClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, AgentError> {
        self.requests.lock().unwrap().push(request.clone());
        match self.replies.lock().unwrap().pop_front() {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(err)) => Err(AgentError::api(err)),
            None => Ok(r#"{"action":[{"scroll":{"amount":300}}]}"#.to_string()),
        }
    }
}

struct FakeTabs {
    channel: PageChannel,
    executed: Arc<Mutex<Vec<String>>>,
    captures: Arc<AtomicUsize>,
    visited: Mutex<Vec<String>>,
}

impl FakeTabs {
    fn serving() -> Arc<Self> {
        Self::failing_first_captures(0)
    }

    /// Answers the first `failures` captures with a torn-down page context.
    fn failing_first_captures(failures: usize) -> Arc<Self> {
        let executed = Arc::new(Mutex::new(Vec::new()));
        let captures = Arc::new(AtomicUsize::new(0));
        let (channel, mut rx) = PageChannel::new(8, Duration::from_secs(5));
        let log = Arc::clone(&executed);
        let counter = Arc::clone(&captures);
        tokio::spawn(async move {
            while let Some(Envelope { request, reply }) = rx.recv().await {
                let response = match request {
                    PageRequest::GetPageData { .. } => {
                        if counter.fetch_add(1, Ordering::SeqCst) < failures {
                            PageResponse::Error("Execution context was destroyed.".into())
                        } else {
                            PageResponse::PageData(page_data())
                        }
                    }
                    PageRequest::ExecuteAction { action, .. } => {
                        log.lock().unwrap().push(action.to_wire());
                        PageResponse::ActionResult(ActionResult::ok("ran"))
                    }
                    PageRequest::RemoveHighlights => {
                        PageResponse::HighlightsRemoved { success: true }
                    }
                    PageRequest::GetScrollInfo => PageResponse::ScrollInfo(ScrollInfo::default()),
                };
                let _ = reply.send(response);
            }
        });
        Arc::new(Self {
            channel,
            executed,
            captures,
            visited: Mutex::new(Vec::new()),
        })
    }

    fn unreachable() -> Arc<Self> {
        let (channel, rx) = PageChannel::new(1, Duration::from_secs(5));
        drop(rx);
        Arc::new(Self {
            channel,
            executed: Arc::new(Mutex::new(Vec::new())),
            captures: Arc::new(AtomicUsize::new(0)),
            visited: Mutex::new(Vec::new()),
        })
    }

    fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }
}

fn page_data() -> PageData {
    let mut data = PageData {
        title: "Fake".into(),
        url: "https://fake.test/".into(),
        clickable_elements: "[0]<a>Home</a>\n[1]<button>Go</button>".into(),
        ..Default::default()
    };
    data.xpaths.insert(0, "html/body/a".into());
    data.xpaths.insert(1, "html/body/button".into());
    data
}

#[async_trait]
impl TabControl for FakeTabs {
    async fn navigate(&self, url: &str) -> Result<(), TabError> {
        self.visited.lock().unwrap().push(url.to_string());
        Ok(())
    }

    async fn switch_tab(&self, id: TabId) -> Result<TabInfo, TabError> {
        Err(TabError::UnknownTab(id))
    }

    async fn open_tab(&self, url: &str) -> Result<TabInfo, TabError> {
        Err(TabError::InvalidUrl(url.to_string()))
    }

    async fn list_tabs(&self) -> Result<Vec<TabInfo>, TabError> {
        Ok(vec![TabInfo {
            id: TabId(0),
            url: "https://fake.test/".into(),
            title: "Fake".into(),
            active: true,
        }])
    }

    async fn screenshot(&self) -> Result<String, TabError> {
        Ok("UE5H".into())
    }

    async fn active_channel(&self) -> Result<PageChannel, TabError> {
        Ok(self.channel.clone())
    }
}

fn settings(rounds: u32) -> Arc<AgentSettings> {
    Arc::new(AgentSettings::default().max_rounds(rounds).vision(false))
}

fn agent(settings: Arc<AgentSettings>, client: Arc<ScriptedClient>, tabs: Arc<FakeTabs>) -> AgentLoop {
    AgentLoop::new(settings, client, tabs)
}

#[tokio::test]
async fn loop_without_done_stops_after_exactly_the_budget() {
    let client = ScriptedClient::new(Vec::<Result<String, &str>>::new());
    let tabs = FakeTabs::serving();
    let outcome = agent(settings(3), client.clone(), tabs.clone())
        .run("never finishes", &TraceContext::disabled())
        .await
        .unwrap();

    assert_eq!(outcome.status, OutcomeStatus::BudgetExhausted);
    assert_eq!(outcome.rounds, 3);
    assert_eq!(client.requests().len(), 3);
    assert_eq!(tabs.executed().len(), 3);
    assert_eq!(outcome.message, "round budget of 3 exhausted");
}

#[tokio::test]
async fn done_discards_the_rest_of_the_batch() {
    let client = ScriptedClient::new([Ok(
        r#"{"action":[{"click_element":{"index":1}},{"done":{"text":"x"}},{"scroll":{"amount":500}}]}"#,
    )]);
    let tabs = FakeTabs::serving();
    let outcome = agent(settings(5), client, tabs.clone())
        .run("click then finish", &TraceContext::disabled())
        .await
        .unwrap();

    assert_eq!(outcome.status, OutcomeStatus::Done);
    assert!(outcome.is_success());
    assert_eq!(outcome.message, "x");
    assert_eq!(outcome.rounds, 1);
    assert_eq!(tabs.executed(), vec![r#"{"click_element":{"index":1}}"#]);
    assert_eq!(outcome.history.len(), 2);
}

#[tokio::test]
async fn prose_reply_is_returned_as_plain_text() {
    let client = ScriptedClient::new([Ok("The page has no login form.")]);
    let tabs = FakeTabs::serving();
    let outcome = agent(settings(5), client.clone(), tabs)
        .run("log in", &TraceContext::disabled())
        .await
        .unwrap();

    assert_eq!(outcome.status, OutcomeStatus::PlainText);
    assert_eq!(outcome.message, "The page has no login form.");
    assert_eq!(outcome.rounds, 1);
    assert_eq!(client.requests().len(), 1);
}

#[tokio::test]
async fn empty_batch_ends_with_no_actions() {
    let client = ScriptedClient::new([Ok("```json\n{\"action\": []}\n```")]);
    let outcome = agent(settings(5), client, FakeTabs::serving())
        .run("anything", &TraceContext::disabled())
        .await
        .unwrap();
    assert_eq!(outcome.status, OutcomeStatus::NoActions);
    assert!(outcome.history.is_empty());
}

#[tokio::test]
async fn api_errors_consume_a_round_and_are_fed_back() {
    let client = ScriptedClient::new([
        Err("503 Service Unavailable"),
        Ok(r#"{"action":[{"done":{"text":"ok"}}]}"#),
    ]);
    let outcome = agent(settings(5), client.clone(), FakeTabs::serving())
        .run("retry", &TraceContext::disabled())
        .await
        .unwrap();

    assert_eq!(outcome.status, OutcomeStatus::Done);
    assert_eq!(outcome.rounds, 2);
    assert!(!outcome.history[0].result.success);
    assert_eq!(
        outcome.history[0].result.error.as_deref(),
        Some("API error: 503 Service Unavailable")
    );

    let second = &client.requests()[1];
    let user = second.messages[1].content.text();
    assert!(user.contains("round -> error: API error: 503 Service Unavailable"), "{user}");
}

#[tokio::test]
async fn rejected_entries_are_recorded_and_the_batch_continues() {
    let client = ScriptedClient::new([
        Ok(r#"{"current_state":{"memory":"home link is 0"},
               "actions":[{"bogus":{}},{"click_element":{"index":0}}]}"#),
        Ok(r#"{"action":[{"done":{"text":"finished"}}]}"#),
    ]);
    let tabs = FakeTabs::serving();
    let outcome = agent(settings(5), client.clone(), tabs.clone())
        .run("go home", &TraceContext::disabled())
        .await
        .unwrap();

    assert_eq!(outcome.status, OutcomeStatus::Done);
    assert_eq!(outcome.history.len(), 3);
    assert_eq!(
        outcome.history[0].result.error.as_deref(),
        Some("unknown action 'bogus'")
    );
    assert!(outcome.history[1].result.success);
    assert_eq!(tabs.executed(), vec![r#"{"click_element":{"index":0}}"#]);

    let user = client.requests()[1].messages[1].content.text();
    assert!(user.contains("Memory: home link is 0"));
    assert!(user.contains(r#"{"click_element":{"index":0}} -> success: ran"#));
}

#[tokio::test]
async fn entry_with_a_repeated_key_is_rejected_not_merged() {
    let client = ScriptedClient::new([Ok(
        r#"{"action":[{"click_element":{"index":1},"click_element":{"index":0}},{"done":{"text":"ok"}}]}"#,
    )]);
    let tabs = FakeTabs::serving();
    let outcome = agent(settings(2), client, tabs.clone())
        .run("click", &TraceContext::disabled())
        .await
        .unwrap();

    assert_eq!(outcome.status, OutcomeStatus::Done);
    assert!(tabs.executed().is_empty());
    assert_eq!(
        outcome.history[0].result.error.as_deref(),
        Some("invalid action format: expected exactly one action key, got 2")
    );
}

#[tokio::test]
async fn tab_actions_reach_the_tab_surface() {
    let client = ScriptedClient::new([Ok(
        r#"{"action":[{"search_google":{"query":"rust"}},{"done":{"text":"searched"}}]}"#,
    )]);
    let tabs = FakeTabs::serving();
    let outcome = agent(settings(2), client, tabs.clone())
        .run("search", &TraceContext::disabled())
        .await
        .unwrap();

    assert_eq!(outcome.status, OutcomeStatus::Done);
    assert_eq!(
        tabs.visited.lock().unwrap().as_slice(),
        ["https://www.google.com/search?q=rust"]
    );
}

#[tokio::test]
async fn vision_sends_the_screenshot_as_an_image_part() {
    let client = ScriptedClient::new([Ok(r#"{"action":[{"done":{"text":"seen"}}]}"#)]);
    let settings = Arc::new(AgentSettings::default().max_rounds(1).vision(true));
    agent(settings, client.clone(), FakeTabs::serving())
        .run("look", &TraceContext::disabled())
        .await
        .unwrap();

    let request = &client.requests()[0];
    assert_eq!(request.messages.len(), 2);
    assert!(request.messages[1].content.has_image());
    let body = serde_json::to_value(request).unwrap();
    assert_eq!(
        body["messages"][1]["content"][1]["image_url"]["url"],
        "data:image/png;base64,UE5H"
    );
}

#[tokio::test(start_paused = true)]
async fn unreachable_page_fails_after_fixed_retries() {
    let client = ScriptedClient::new(Vec::<Result<String, &str>>::new());
    let start = tokio::time::Instant::now();
    let outcome = agent(settings(5), client.clone(), FakeTabs::unreachable())
        .run("anything", &TraceContext::disabled())
        .await
        .unwrap();

    assert_eq!(outcome.status, OutcomeStatus::CaptureFailed);
    assert_eq!(outcome.rounds, 1);
    assert!(client.requests().is_empty());
    let waited = start.elapsed();
    assert!(waited >= Duration::from_secs(4), "{waited:?}");
    assert!(waited < Duration::from_secs(5), "{waited:?}");
}

#[tokio::test(start_paused = true)]
async fn destroyed_page_context_is_captured_again() {
    let client = ScriptedClient::new([Ok(r#"{"action":[{"done":{"text":"loaded"}}]}"#)]);
    let tabs = FakeTabs::failing_first_captures(2);
    let start = tokio::time::Instant::now();
    let outcome = agent(settings(5), client.clone(), tabs.clone())
        .run("wait for the page", &TraceContext::disabled())
        .await
        .unwrap();

    assert_eq!(outcome.status, OutcomeStatus::Done);
    assert_eq!(outcome.message, "loaded");
    assert_eq!(tabs.captures.load(Ordering::SeqCst), 3);
    assert_eq!(client.requests().len(), 1);
    let waited = start.elapsed();
    assert!(waited >= Duration::from_secs(2), "{waited:?}");
    assert!(waited < Duration::from_secs(3), "{waited:?}");
}

#[tokio::test(start_paused = true)]
async fn persistent_page_errors_exhaust_the_capture_retries() {
    let client = ScriptedClient::new(Vec::<Result<String, &str>>::new());
    let tabs = FakeTabs::failing_first_captures(usize::MAX);
    let outcome = agent(settings(5), client.clone(), tabs.clone())
        .run("anything", &TraceContext::disabled())
        .await
        .unwrap();

    assert_eq!(outcome.status, OutcomeStatus::CaptureFailed);
    assert_eq!(tabs.captures.load(Ordering::SeqCst), 5);
    assert!(client.requests().is_empty());
    assert!(outcome.message.contains("Execution context was destroyed."), "{}", outcome.message);
}

#[tokio::test]
async fn invalid_settings_are_an_error() {
    let client = ScriptedClient::new(Vec::<Result<String, &str>>::new());
    let result = agent(settings(0), client, FakeTabs::serving())
        .run("anything", &TraceContext::disabled())
        .await;
    assert!(matches!(result, Err(AgentError::Config(_))));
}
