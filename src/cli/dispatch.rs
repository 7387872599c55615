use super::capture::cmd_capture;
use super::catalog::{cmd_actions, cmd_parse_action};
use super::env::CliArgs;
use super::output::OutputFormat;
use super::run::cmd_run;
use crate::cli::commands::Commands;
use anyhow::Result;

pub async fn dispatch(cli: &CliArgs) -> Result<()> {
    let output = OutputFormat::from_flag(cli.json);
    match cli.command.clone() {
        Commands::Run(args) => cmd_run(args, cli.config.as_deref(), output).await,
        Commands::Capture(args) => cmd_capture(args, cli.config.as_deref(), output).await,
        Commands::Actions => cmd_actions(output),
        Commands::ParseAction(args) => cmd_parse_action(args, output),
    }
}
