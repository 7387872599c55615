//! `tabpilot` command-line surface.

pub mod app;
pub mod capture;
pub mod catalog;
pub mod commands;
pub mod dispatch;
pub mod env;
pub mod output;
pub mod run;
pub mod runtime;
pub mod session;

pub use app::run;
pub use env::CliArgs;
