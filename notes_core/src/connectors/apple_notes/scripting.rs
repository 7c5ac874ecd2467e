// Notes.app automation backend
//
// Used for the operations that must go through the application itself:
// fetching notes by their scripting ID and creating new notes.

use async_trait::async_trait;
use std::time::Duration;

use crate::config::NotesConfig;
use crate::connectors::apple_common::{
    applescript_string_list, escape_applescript_string, split_records, ScriptRunner,
    FIELD_SEPARATOR, RECORD_SEPARATOR, SCRIPT_HANDLERS,
};
use crate::error::ConnectorError;

/// A note as reported by Notes.app. Every attribute may be missing; dates
/// are still in their raw `stampOf` form and are normalized by the caller.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScriptedNote {
    pub id: Option<String>,
    pub name: Option<String>,
    pub body: Option<String>,
    pub plaintext: Option<String>,
    pub creation_date: Option<String>,
    pub modification_date: Option<String>,
    pub account: Option<String>,
    pub folder: Option<String>,
    pub password_protected: bool,
}

/// Parameters for a note to be created.
#[derive(Debug, Clone, PartialEq)]
pub struct NewNote {
    pub name: String,
    /// Body already rendered to HTML.
    pub html_body: String,
    pub folder: Option<String>,
    pub account: Option<String>,
}

#[async_trait]
pub trait NotesApp: Send + Sync {
    /// Look up notes by scripting ID. IDs that do not resolve are simply
    /// absent from the result.
    async fn notes_by_ids(&self, ids: &[String]) -> Result<Vec<ScriptedNote>, ConnectorError>;

    /// Create a note and return it as Notes.app sees it afterwards.
    async fn make_note(&self, note: &NewNote) -> Result<ScriptedNote, ConnectorError>;

    /// Cheap round-trip that fails when Notes cannot be automated.
    async fn check_access(&self) -> Result<(), ConnectorError>;
}

/// [`NotesApp`] backed by AppleScript.
pub struct ScriptingNotesApp {
    runner: ScriptRunner,
}

impl ScriptingNotesApp {
    pub fn new(runner: ScriptRunner) -> Self {
        Self { runner }
    }

    pub fn from_config(config: &NotesConfig) -> Self {
        Self::new(ScriptRunner::new(
            config.osascript_path.clone(),
            Duration::from_secs(config.script_timeout_secs),
        ))
    }
}

#[async_trait]
impl NotesApp for ScriptingNotesApp {
    async fn notes_by_ids(&self, ids: &[String]) -> Result<Vec<ScriptedNote>, ConnectorError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let output = self.runner.run_output(&script_notes_by_ids(ids)).await?;
        Ok(parse_scripted_notes(&output))
    }

    async fn make_note(&self, note: &NewNote) -> Result<ScriptedNote, ConnectorError> {
        let output = self.runner.run_output(&script_make_note(note)).await?;
        parse_scripted_notes(&output)
            .into_iter()
            .next()
            .ok_or_else(|| ConnectorError::Script("Notes.app returned no note".to_string()))
    }

    async fn check_access(&self) -> Result<(), ConnectorError> {
        let _ = self
            .runner
            .run_output(r#"tell application "Notes" to name"#)
            .await?;
        Ok(())
    }
}

// ============================================================================
// AppleScript Generators
// ============================================================================

/// Handler emitting one framed note record. Field order must match
/// [`parse_scripted_notes`].
const DESCRIBE_NOTE_HANDLER: &str = r#"
on describeNote(n)
    set fs to character id 31
    tell application "Notes"
        set nId to my textOf(id of n)
        set nName to ""
        set nBody to ""
        set nPlain to ""
        set nCreated to ""
        set nModified to ""
        set nFolder to ""
        set nAccount to ""
        set nLocked to "false"
        try
            set nName to my textOf(name of n)
        end try
        try
            set nLocked to (password protected of n) as text
        end try
        try
            set nBody to my textOf(body of n)
        end try
        try
            set nPlain to my textOf(plaintext of n)
        end try
        try
            set nCreated to my stampOf(creation date of n)
        end try
        try
            set nModified to my stampOf(modification date of n)
        end try
        try
            set nFolder to my textOf(name of container of n)
        end try
        try
            set nAccount to my textOf(name of account of container of n)
        on error
            try
                set nAccount to my textOf(name of container of container of n)
            end try
        end try
    end tell
    return nId & fs & nName & fs & nBody & fs & nPlain & fs & nCreated & fs & nModified & fs & nFolder & fs & nAccount & fs & nLocked
end describeNote
"#;

fn script_notes_by_ids(ids: &[String]) -> String {
    format!(
        r#"{handlers}
{describe}
set rs to character id 30
set output to ""
set wanted to {ids}
tell application "Notes"
    repeat with wantedId in wanted
        try
            set n to note id (wantedId as text)
            set output to output & my describeNote(n) & rs
        end try
    end repeat
end tell
return output
"#,
        handlers = SCRIPT_HANDLERS,
        describe = DESCRIBE_NOTE_HANDLER,
        ids = applescript_string_list(ids)
    )
}

fn script_make_note(note: &NewNote) -> String {
    let location = match (note.folder.as_deref(), note.account.as_deref()) {
        (Some(f), Some(a)) => format!(
            r#" at folder "{}" of account "{}""#,
            escape_applescript_string(f),
            escape_applescript_string(a)
        ),
        (Some(f), None) => format!(
            r#" at folder "{}" of default account"#,
            escape_applescript_string(f)
        ),
        (None, Some(a)) => format!(
            r#" at default folder of account "{}""#,
            escape_applescript_string(a)
        ),
        (None, None) => String::new(),
    };

    format!(
        r#"{handlers}
{describe}
tell application "Notes"
    set newNote to make new note{location} with properties {{name:"{name}", body:"{body}"}}
end tell
return my describeNote(newNote)
"#,
        handlers = SCRIPT_HANDLERS,
        describe = DESCRIBE_NOTE_HANDLER,
        location = location,
        name = escape_applescript_string(&note.name),
        body = escape_applescript_string(&note.html_body)
    )
}

// ============================================================================
// Parsing Functions
// ============================================================================

fn field(value: Option<&&str>) -> Option<String> {
    value
        .map(|v| v.to_string())
        .filter(|v| !v.is_empty() && v != "missing value")
}

pub(crate) fn parse_scripted_notes(output: &str) -> Vec<ScriptedNote> {
    split_records(output)
        .into_iter()
        .filter(|parts| !parts.is_empty())
        .map(|parts| ScriptedNote {
            id: field(parts.first()),
            name: field(parts.get(1)),
            body: field(parts.get(2)),
            plaintext: field(parts.get(3)),
            creation_date: field(parts.get(4)),
            modification_date: field(parts.get(5)),
            folder: field(parts.get(6)),
            account: field(parts.get(7)),
            password_protected: parts
                .get(8)
                .map(|v| v.trim().eq_ignore_ascii_case("true"))
                .unwrap_or(false),
        })
        .collect()
}
