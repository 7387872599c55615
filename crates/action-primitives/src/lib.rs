//! Action layer: the closed action catalog, its parser, and the executor that
//! routes each action to the tab surface or to the active page.
//!
//! - `schema` / `parser`: wire format `{"<kind>": {params}}` to a validated [`Action`]
//! - `primitives`: in-page operations (click, input, scroll, select, extract, keys)
//! - `channel` / `worker`: single-outstanding-request channel to a page task
//! - `tabs` / `executor`: tab management and action routing

pub mod channel;
pub mod errors;
pub mod executor;
pub mod page;
pub mod parser;
mod primitives;
pub mod schema;
mod scripts;
pub mod tabs;
pub mod types;
pub mod worker;

pub use channel::{Envelope, PageChannel, PageRequest, PageResponse};
pub use errors::*;
pub use executor::ActionExecutor;
pub use page::{PageContext, ScriptedPage};
pub use parser::{parse_action, parse_action_value, parse_raw_action, ParseError, RawAction};
pub use primitives::*;
pub use schema::*;
pub use tabs::{google_search_url, normalize_url, BrowserTabs, PageOpener, TabControl};
pub use types::*;
pub use worker::PageWorker;
