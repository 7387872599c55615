use clap::Subcommand;

use super::capture::CaptureArgs;
use super::catalog::ParseActionArgs;
use super::run::RunArgs;

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Launch Chromium and work towards a goal
    Run(RunArgs),

    /// Print the indexed elements and locator map of one page
    Capture(CaptureArgs),

    /// List the actions the model may request
    Actions,

    /// Validate one action object
    ParseAction(ParseActionArgs),
}
