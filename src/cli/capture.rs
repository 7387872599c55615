use std::path::Path;

use action_primitives::TabControl;
use anyhow::{Context, Result};
use clap::Args;
use tabpilot_core_types::PageData;

use super::output::{print_json, OutputFormat};
use super::session::BrowserSession;
use crate::config::SettingsLoader;

#[derive(Args, Clone, Debug)]
pub struct CaptureArgs {
    /// Page to capture
    pub url: String,

    /// Leave the index overlay painted (useful with --visible)
    #[arg(long)]
    pub highlight: bool,

    /// Show the browser window
    #[arg(long)]
    pub visible: bool,
}

pub async fn cmd_capture(
    args: CaptureArgs,
    config: Option<&Path>,
    output: OutputFormat,
) -> Result<()> {
    let settings = SettingsLoader::discover(config).load()?;
    let mut options = settings.capture_options();
    options.do_highlight = args.highlight;

    let session = BrowserSession::launch(args.visible, settings.extract_char_limit).await?;
    let tabs = session.tabs();
    let captured = async {
        tabs.open_tab(&args.url)
            .await
            .with_context(|| format!("Failed to open {}", args.url))?;
        let channel = tabs.active_channel().await?;
        let page = channel.get_page_data(options).await?;
        Ok::<_, anyhow::Error>(page)
    }
    .await;
    drop(tabs);
    session.shutdown().await;

    let page = captured?;
    match output {
        OutputFormat::Json => print_json(&page)?,
        OutputFormat::Human => print_page(&page),
    }
    Ok(())
}

fn print_page(page: &PageData) {
    println!("{} ({})", page.title, page.url);
    println!("{} indexed element(s)", page.element_count());
    println!();
    println!("{}", page.clickable_elements);
    println!();
    for (index, xpath) in &page.xpaths {
        println!("[{index}] {xpath}");
    }
}
