use owo_colors::OwoColorize;
use std::io::Read;

use notes_core::config::NotesConfig;
use notes_core::connectors::apple_notes::tools::{
    CreateNoteInput, GetNotesInput, ListNotesInput, SearchNotesInput,
};
use notes_core::connectors::apple_notes::AppleNotesConnector;
use notes_core::Connector;

use super::{CommandError, Result};
use crate::cli::OutputFormat;
use crate::output;

fn connector() -> Result<AppleNotesConnector> {
    let config = NotesConfig::load()?;
    Ok(AppleNotesConnector::new(&config))
}

/// Fail the command when the tool reported an error, after it was printed.
fn check(error: Option<&str>) -> Result<()> {
    match error {
        Some(e) => Err(CommandError::ToolError(e.to_string())),
        None => Ok(()),
    }
}

pub async fn list(format: OutputFormat, limit: i64, folder: Option<String>) -> Result<()> {
    let response = connector()?
        .list_notes(ListNotesInput { limit, folder })
        .await;
    output::print_list(&response, format)?;
    check(response.error.as_deref())
}

pub async fn get(format: OutputFormat, ids: Vec<String>) -> Result<()> {
    let response = connector()?.get_notes(GetNotesInput { ids }).await;
    output::print_notes(&response, format)?;
    check(response.error.as_deref())
}

pub async fn search(format: OutputFormat, query: String, limit: i64) -> Result<()> {
    let response = connector()?
        .search_notes(SearchNotesInput { query, limit })
        .await;
    output::print_search(&response, format)?;
    check(response.error.as_deref())
}

pub async fn create(
    format: OutputFormat,
    title: String,
    body: String,
    folder: Option<String>,
    account: Option<String>,
) -> Result<()> {
    let body = if body == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        body
    };

    let response = connector()?
        .create_note(CreateNoteInput {
            title,
            body,
            folder,
            account,
        })
        .await;
    output::print_created(&response, format)?;
    check(response.error.as_deref())
}

pub async fn doctor(format: OutputFormat) -> Result<()> {
    let config = NotesConfig::load()?;
    let connector = AppleNotesConnector::new(&config);
    let result = connector.check_access().await;

    match format {
        OutputFormat::Json => {
            let report = serde_json::json!({
                "ok": result.is_ok(),
                "database_path": config.resolved_database_path(),
                "osascript_path": config.osascript_path,
                "error": result.as_ref().err().map(|e| e.to_string()),
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Pretty => {
            if let Some(path) = config.resolved_database_path() {
                println!("{} {}", "Database:".dimmed(), path.display());
            }
            println!("{} {}", "osascript:".dimmed(), config.osascript_path.display());
            match &result {
                Ok(()) => println!("{}", "Notes.app and the Notes database are reachable".green()),
                Err(e) => println!("{} {}", "Problem:".red().bold(), e),
            }
        }
    }

    result.map_err(CommandError::from)
}
