//! # Find Command
//!
//! Searches decoded secret values of the selected namespaces for a term
//! (case-insensitive) and prints each match with two lines of context.

use super::{CommandStatus, NamespaceArgs, Session};
use crate::collector::collect_secrets;
use crate::constants::SEARCH_CONTEXT_LINES;
use crate::display::{bold, cyan, dim, highlight, highlight_matches};
use crate::error::{KubesecError, Result};
use crate::search::{search_secrets, SearchResult};
use clap::Args;
use std::io::Write;

#[derive(Debug, Clone, Default, Args)]
pub struct FindArgs {
    /// Text to look for
    #[arg(value_name = "TERM")]
    pub term: String,

    #[command(flatten)]
    pub namespaces: NamespaceArgs,
}

pub async fn find_command(
    session: &Session<'_>,
    args: &FindArgs,
    out: &mut dyn Write,
) -> Result<CommandStatus> {
    if args.term.is_empty() {
        return Err(KubesecError::validation("Search term must not be empty"));
    }

    let selector = args.namespaces.selector()?;
    let namespaces = selector.resolve(session.client, &session.context).await?;
    let set = collect_secrets(session.client, &session.context, &namespaces, &session.cancel).await?;

    let results = search_secrets(&set, &args.term, SEARCH_CONTEXT_LINES);
    if results.is_empty() {
        writeln!(out, "No matches found")?;
        return Ok(CommandStatus::Success);
    }

    for result in &results {
        print_result(out, result, &args.term)?;
    }

    let blocks: usize = results.iter().map(|r| r.matches.len()).sum();
    writeln!(
        out,
        "Found {} match block(s) in {} key(s)",
        blocks,
        results.len()
    )?;
    Ok(CommandStatus::Success)
}

fn print_result(out: &mut dyn Write, result: &SearchResult, term: &str) -> std::io::Result<()> {
    writeln!(
        out,
        "{}",
        bold(&format!("{}/{}", result.namespace, result.secret_name))
    )?;
    writeln!(out, "  Key: {}", cyan(&result.key_name))?;

    for block in &result.matches {
        writeln!(out, "  {}", dim(&format!("Line {}:", block.line_number)))?;
        for (index, line) in block.context_text.split('\n').enumerate() {
            if block.match_line_indices.contains(&index) {
                writeln!(out, "    > {}", highlight_matches(line, term, highlight))?;
            } else {
                writeln!(out, "      {line}")?;
            }
        }
    }
    writeln!(out)
}
