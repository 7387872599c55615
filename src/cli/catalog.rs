use action_primitives::{action_catalog, parse_action, ActionScope, ParseError};
use anyhow::{bail, Result};
use clap::Args;
use serde::Serialize;
use serde_json::Value;

use super::output::{print_json, OutputFormat};

#[derive(Args, Clone, Debug)]
pub struct ParseActionArgs {
    /// Action object, e.g. '{"click_element": {"index": 3}}'
    pub action: String,
}

#[derive(Serialize, Debug)]
struct CatalogRow {
    name: &'static str,
    scope: &'static str,
    description: &'static str,
    example: Value,
}

fn scope_label(scope: ActionScope) -> &'static str {
    match scope {
        ActionScope::Tab => "tab",
        ActionScope::Page => "page",
        ActionScope::Local => "local",
    }
}

pub fn cmd_actions(output: OutputFormat) -> Result<()> {
    let rows: Vec<CatalogRow> = action_catalog()
        .map(|entry| CatalogRow {
            name: entry.name,
            scope: scope_label(entry.kind.scope()),
            description: entry.description,
            example: serde_json::from_str(entry.example).unwrap_or(Value::Null),
        })
        .collect();

    match output {
        OutputFormat::Json => print_json(&rows)?,
        OutputFormat::Human => {
            for row in &rows {
                println!("{:<24} [{}] {}", row.name, row.scope, row.description);
                println!("{:<24} {}", "", row.example);
            }
        }
    }
    Ok(())
}

/// Verdict printed by `parse-action`.
#[derive(Serialize, Debug, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ParseVerdict {
    Valid { action: Value, scope: &'static str },
    Rejected { category: &'static str, error: String },
}

pub fn verdict(raw: &str) -> ParseVerdict {
    match parse_action(raw) {
        Ok(action) => ParseVerdict::Valid {
            scope: scope_label(action.kind().scope()),
            action: serde_json::to_value(&action).unwrap_or(Value::Null),
        },
        Err(err) => rejected(&err),
    }
}

fn rejected(err: &ParseError) -> ParseVerdict {
    ParseVerdict::Rejected {
        category: err.category(),
        error: err.to_string(),
    }
}

pub fn cmd_parse_action(args: ParseActionArgs, output: OutputFormat) -> Result<()> {
    let verdict = verdict(&args.action);
    match output {
        OutputFormat::Json => print_json(&verdict)?,
        OutputFormat::Human => match &verdict {
            ParseVerdict::Valid { action, scope } => println!("valid ({scope}): {action}"),
            ParseVerdict::Rejected { category, error } => println!("{category}: {error}"),
        },
    }
    if let ParseVerdict::Rejected { category, .. } = verdict {
        bail!("action rejected ({category})");
    }
    Ok(())
}
