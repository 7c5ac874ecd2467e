use owo_colors::OwoColorize;

use notes_core::config::NotesConfig;
use notes_core::{build_connector, Connector};

use super::Result;
use crate::cli::OutputFormat;

pub async fn run(format: OutputFormat) -> Result<()> {
    let config = NotesConfig::load()?;
    let connector = build_connector(&config);
    let tools = connector.list_tools(None).await?.tools;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&tools)?);
        }
        OutputFormat::Pretty => {
            println!();
            println!("{}  {}", connector.name().bold().cyan(), connector.description().dimmed());
            println!();
            for tool in &tools {
                println!("  {}", tool.name.bold());
                if let Some(description) = &tool.description {
                    println!("      {}", description);
                }
                let params: Vec<String> = tool
                    .input_schema
                    .get("properties")
                    .and_then(|p| p.as_object())
                    .map(|props| props.keys().cloned().collect())
                    .unwrap_or_default();
                if !params.is_empty() {
                    println!("      {} {}", "params:".dimmed(), params.join(", "));
                }
                println!();
            }
        }
    }
    Ok(())
}
