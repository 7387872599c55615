use std::path::Path;
use std::sync::Arc;

use action_primitives::TabControl;
use agent_core::{AgentLoop, AgentOutcome, OpenAiCompletionClient, OutcomeStatus, TraceContext};
use anyhow::{bail, Result};
use clap::Args;
use tracing::info;

use super::output::{print_json, OutputFormat};
use super::session::BrowserSession;
use crate::config::SettingsLoader;

#[derive(Args, Clone, Debug)]
pub struct RunArgs {
    /// What the agent should accomplish
    pub goal: String,

    /// Page to open before the first round
    #[arg(long, value_name = "URL")]
    pub start_url: Option<String>,

    /// Show the browser window
    #[arg(long)]
    pub visible: bool,

    /// Override the round budget
    #[arg(long, value_name = "N")]
    pub max_rounds: Option<u32>,
}

pub async fn cmd_run(args: RunArgs, config: Option<&Path>, output: OutputFormat) -> Result<()> {
    let loader = SettingsLoader::discover(config).max_rounds(args.max_rounds);
    let settings = loader.load()?;
    let client = OpenAiCompletionClient::new(&settings)?;

    let session = BrowserSession::launch(args.visible, settings.extract_char_limit).await?;
    let tabs = session.tabs();
    let start_url = args.start_url.as_deref().unwrap_or("about:blank");
    let opened = tabs.open_tab(start_url).await;
    let outcome = match opened {
        Ok(tab) => {
            info!(tab = %tab.id, url = %tab.url, "starting agent");
            let trace = TraceContext::new(&args.goal, settings.log_prompts);
            let agent = AgentLoop::new(Arc::new(loader), Arc::new(client), tabs);
            agent.run(&args.goal, &trace).await
        }
        Err(err) => {
            drop(tabs);
            session.shutdown().await;
            bail!("Failed to open {start_url}: {err}");
        }
    };
    session.shutdown().await;

    let outcome = outcome?;
    match output {
        OutputFormat::Json => print_json(&outcome)?,
        OutputFormat::Human => print_outcome(&outcome),
    }
    if !outcome.is_success() && outcome.status != OutcomeStatus::PlainText {
        bail!("agent stopped without completing the goal");
    }
    Ok(())
}

fn print_outcome(outcome: &AgentOutcome) {
    for entry in &outcome.history {
        println!("[round {}] {}", entry.round, entry.feedback_line());
    }
    println!();
    println!(
        "{} after {} round(s): {}",
        status_label(outcome.status),
        outcome.rounds,
        outcome.message
    );
}

fn status_label(status: OutcomeStatus) -> &'static str {
    match status {
        OutcomeStatus::Done => "Done",
        OutcomeStatus::NoActions => "Stopped (no actions)",
        OutcomeStatus::PlainText => "Answered",
        OutcomeStatus::BudgetExhausted => "Round budget exhausted",
        OutcomeStatus::CaptureFailed => "Page capture failed",
    }
}
