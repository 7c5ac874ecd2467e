use owo_colors::OwoColorize;
use serde::Serialize;

use notes_core::connectors::apple_notes::tools::{
    CreateNoteResponse, GetNotesResponse, ListNotesResponse, NoteRef, SearchNotesResponse,
};

use crate::cli::OutputFormat;
use crate::commands::Result;

/// Width of the plain-text excerpt shown for each fetched note.
const EXCERPT_CHARS: usize = 400;

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_refs(notes: &[NoteRef]) {
    for (i, note) in notes.iter().enumerate() {
        println!("{:>4}. {}", (i + 1).dimmed(), note.title.bold());
        println!("      {}", note.id.dimmed());
    }
}

fn print_footer(message: &str, error: Option<&str>) {
    println!();
    match error {
        Some(e) => println!("{} {}", "Error:".red().bold(), e),
        None => println!("{}", message.green()),
    }
}

pub fn print_list(response: &ListNotesResponse, format: OutputFormat) -> Result<()> {
    if format == OutputFormat::Json {
        return print_json(response);
    }
    println!();
    print_refs(&response.notes);
    print_footer(&response.message, response.error.as_deref());
    Ok(())
}

pub fn print_search(response: &SearchNotesResponse, format: OutputFormat) -> Result<()> {
    if format == OutputFormat::Json {
        return print_json(response);
    }
    println!();
    print_refs(&response.notes);
    print_footer(&response.message, response.error.as_deref());
    Ok(())
}

pub fn print_notes(response: &GetNotesResponse, format: OutputFormat) -> Result<()> {
    if format == OutputFormat::Json {
        return print_json(response);
    }
    for note in &response.notes {
        println!();
        println!("{}", note.name.bold().cyan());
        println!(
            "{} {} / {}",
            "in".dimmed(),
            note.account,
            note.folder
        );
        if let Some(modified) = &note.modification_date {
            println!("{} {}", "modified".dimmed(), modified);
        }
        println!("{}", note.id.dimmed());
        if note.password_protected {
            println!("{}", "(locked)".yellow());
        } else if !note.plaintext.is_empty() {
            println!();
            let excerpt: String = note.plaintext.chars().take(EXCERPT_CHARS).collect();
            println!("{}", excerpt);
            if note.plaintext.chars().count() > EXCERPT_CHARS {
                println!("{}", "... (use --output json for the full note)".dimmed());
            }
        }
    }
    if !response.not_found.is_empty() {
        println!();
        println!("{} {}", "Not found:".yellow(), response.not_found.join(", "));
    }
    print_footer(&response.message, response.error.as_deref());
    Ok(())
}

pub fn print_created(response: &CreateNoteResponse, format: OutputFormat) -> Result<()> {
    if format == OutputFormat::Json {
        return print_json(response);
    }
    if let Some(note) = &response.note {
        println!();
        println!("{}", note.name.bold().cyan());
        println!("{} {} / {}", "in".dimmed(), note.account, note.folder);
        println!("{}", note.id.dimmed());
        if !note.body_preview.is_empty() {
            println!();
            println!("{}", note.body_preview);
        }
    }
    print_footer(&response.message, response.error.as_deref());
    Ok(())
}
