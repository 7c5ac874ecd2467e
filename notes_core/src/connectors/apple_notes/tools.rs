// Tool inputs, responses and the four note operations.
//
// Each operation always produces a response object. Backend failures are
// reported through the `error` field rather than as protocol errors.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::database::{NotesIndex, StoredNote};
use super::scripting::{NewNote, NotesApp, ScriptedNote};
use crate::connectors::apple_common::parse_date_stamp;
use crate::error::ConnectorError;
use crate::markdown::markdown_to_html;

pub const LIST_LIMIT_MAX: i64 = 1000;
pub const SEARCH_LIMIT_MAX: i64 = 100;
const PREVIEW_CHARS: usize = 200;
const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

const UNTITLED: &str = "Untitled";
const UNKNOWN: &str = "Unknown";
const UNKNOWN_ID: &str = "unknown";

// ============================================================================
// Inputs
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ListNotesInput {
    /// Maximum number of notes to return (1-1000)
    #[serde(default = "default_list_limit")]
    #[schemars(default = "default_list_limit")]
    pub limit: i64,
    /// Only include notes whose folder name contains this text (case-insensitive)
    #[serde(default)]
    pub folder: Option<String>,
}

fn default_list_limit() -> i64 {
    50
}

impl Default for ListNotesInput {
    fn default() -> Self {
        Self {
            limit: default_list_limit(),
            folder: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct GetNotesInput {
    /// Note IDs as returned by list_notes or search_notes
    #[serde(default)]
    pub ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SearchNotesInput {
    /// Text to find in note titles and bodies, or '#tag' to find notes with a hashtag
    pub query: String,
    /// Maximum number of results (1-100)
    #[serde(default = "default_search_limit")]
    #[schemars(default = "default_search_limit")]
    pub limit: i64,
}

fn default_search_limit() -> i64 {
    10
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CreateNoteInput {
    /// Note title
    pub title: String,
    /// Note body in Markdown
    #[serde(default)]
    pub body: String,
    /// Folder to create the note in
    #[serde(default)]
    pub folder: Option<String>,
    /// Account to create the note in (e.g. 'iCloud')
    #[serde(default)]
    pub account: Option<String>,
}

// ============================================================================
// Responses
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NoteRef {
    pub title: String,
    pub id: String,
}

impl From<&StoredNote> for NoteRef {
    fn from(note: &StoredNote) -> Self {
        Self {
            title: title_or_untitled(note.title.as_deref()),
            id: note.id.clone().unwrap_or_else(|| UNKNOWN_ID.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ListNotesResponse {
    pub notes: Vec<NoteRef>,
    pub total_count: usize,
    pub returned_count: usize,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ListNotesResponse {
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NoteDetail {
    pub name: String,
    pub id: String,
    pub body: String,
    pub plaintext: String,
    pub creation_date: Option<String>,
    pub modification_date: Option<String>,
    pub account: String,
    pub folder: String,
    pub password_protected: bool,
}

impl TryFrom<ScriptedNote> for NoteDetail {
    type Error = ConnectorError;

    fn try_from(note: ScriptedNote) -> Result<Self, Self::Error> {
        Ok(Self {
            creation_date: format_stamp(note.creation_date.as_deref())?,
            modification_date: format_stamp(note.modification_date.as_deref())?,
            name: title_or_untitled(note.name.as_deref()),
            id: note.id.unwrap_or_else(|| UNKNOWN_ID.to_string()),
            body: note.body.unwrap_or_default(),
            plaintext: note.plaintext.unwrap_or_default(),
            account: note.account.unwrap_or_else(|| UNKNOWN.to_string()),
            folder: note.folder.unwrap_or_else(|| UNKNOWN.to_string()),
            password_protected: note.password_protected,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GetNotesResponse {
    pub notes: Vec<NoteDetail>,
    pub found_count: usize,
    pub not_found: Vec<String>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl GetNotesResponse {
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SearchType {
    Empty,
    Tag,
    Body,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchNotesResponse {
    pub notes: Vec<NoteRef>,
    pub found_count: usize,
    pub query: String,
    pub search_type: SearchType,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SearchNotesResponse {
    pub fn is_error(&self) -> bool {
        self.search_type == SearchType::Error
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreatedNoteSummary {
    pub name: String,
    pub id: String,
    pub body_preview: String,
    pub creation_date: Option<String>,
    pub account: String,
    pub folder: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreateNoteResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<CreatedNoteSummary>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CreateNoteResponse {
    pub fn is_error(&self) -> bool {
        !self.success
    }

    fn failed(error: String, message: &str) -> Self {
        Self {
            success: false,
            note: None,
            message: message.to_string(),
            error: Some(error),
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn title_or_untitled(title: Option<&str>) -> String {
    match title.map(str::trim) {
        Some(t) if !t.is_empty() => t.to_string(),
        _ => UNTITLED.to_string(),
    }
}

fn format_stamp(stamp: Option<&str>) -> Result<Option<String>, ConnectorError> {
    let parsed = match stamp {
        Some(s) => parse_date_stamp(s)?,
        None => None,
    };
    Ok(parsed.map(|d| d.format(DATE_FORMAT).to_string()))
}

/// First `PREVIEW_CHARS` characters, with an ellipsis when cut.
pub fn body_preview(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}

fn dedupe_ids(ids: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.into_iter()
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty() && seen.insert(id.clone()))
        .collect()
}

/// Run a blocking index query on the blocking pool.
async fn query_index<T, F>(index: &Arc<dyn NotesIndex>, f: F) -> Result<T, ConnectorError>
where
    T: Send + 'static,
    F: FnOnce(&dyn NotesIndex) -> Result<T, ConnectorError> + Send + 'static,
{
    let index = Arc::clone(index);
    tokio::task::spawn_blocking(move || f(index.as_ref()))
        .await
        .map_err(|e| ConnectorError::InternalError(format!("Index query task failed: {}", e)))?
}

fn database_error(err: &ConnectorError) -> String {
    match err {
        ConnectorError::Unavailable(msg) => format!("Notes database not available: {}", msg),
        other => other.to_string(),
    }
}

// ============================================================================
// Operations
// ============================================================================

pub async fn list_notes(index: &Arc<dyn NotesIndex>, input: ListNotesInput) -> ListNotesResponse {
    let limit = input.limit.clamp(1, LIST_LIMIT_MAX) as usize;
    let folder = input
        .folder
        .map(|f| f.trim().to_lowercase())
        .filter(|f| !f.is_empty());

    let notes = match query_index(index, |idx| idx.all_notes()).await {
        Ok(notes) => notes,
        Err(err) => {
            warn!(error = %err, "list_notes failed");
            return ListNotesResponse {
                notes: Vec::new(),
                total_count: 0,
                returned_count: 0,
                message: "Failed to list notes".to_string(),
                error: Some(format!("Error listing notes: {}", database_error(&err))),
            };
        }
    };

    let matching: Vec<&StoredNote> = notes
        .iter()
        .filter(|note| match &folder {
            Some(wanted) => note
                .folder
                .as_deref()
                .map(|name| name.to_lowercase().contains(wanted.as_str()))
                .unwrap_or(false),
            None => true,
        })
        .collect();
    let total_count = matching.len();
    let refs: Vec<NoteRef> = matching.into_iter().take(limit).map(NoteRef::from).collect();
    let returned_count = refs.len();
    debug!(total_count, returned_count, limit, "list_notes");

    let message = if total_count > returned_count {
        format!("Showing {} of {} notes", returned_count, total_count)
    } else {
        format!("Found {} notes", returned_count)
    };

    ListNotesResponse {
        notes: refs,
        total_count,
        returned_count,
        message,
        error: None,
    }
}

pub async fn get_notes(app: &dyn NotesApp, input: GetNotesInput) -> GetNotesResponse {
    let ids = dedupe_ids(input.ids);
    if ids.is_empty() {
        return GetNotesResponse {
            notes: Vec::new(),
            found_count: 0,
            not_found: Vec::new(),
            message: "No IDs provided".to_string(),
            error: None,
        };
    }

    let scripted = match app.notes_by_ids(&ids).await {
        Ok(notes) => notes,
        Err(err) => {
            warn!(error = %err, "get_notes failed");
            let error = if let ConnectorError::Unavailable(msg) = &err {
                format!("Notes scripting backend not available: {}", msg)
            } else {
                format!("Error retrieving notes: {}", err)
            };
            return GetNotesResponse {
                notes: Vec::new(),
                found_count: 0,
                not_found: ids,
                message: "Failed to retrieve notes".to_string(),
                error: Some(error),
            };
        }
    };

    let mut notes = Vec::new();
    let mut found = HashSet::new();
    for note in scripted {
        let raw_id = note.id.clone();
        match NoteDetail::try_from(note) {
            Ok(detail) => {
                if found.insert(detail.id.clone()) {
                    notes.push(detail);
                }
            }
            Err(err) => warn!(id = ?raw_id, error = %err, "Skipping note that could not be read"),
        }
    }

    let not_found: Vec<String> = ids.iter().filter(|id| !found.contains(*id)).cloned().collect();
    let message = format!("Retrieved {} of {} requested notes", notes.len(), ids.len());

    GetNotesResponse {
        found_count: notes.len(),
        notes,
        not_found,
        message,
        error: None,
    }
}

pub async fn search_notes(
    index: &Arc<dyn NotesIndex>,
    input: SearchNotesInput,
) -> SearchNotesResponse {
    let query = input.query.trim().to_string();
    let tag = query.strip_prefix('#').map(|t| t.trim().to_string());

    if query.is_empty() || matches!(tag.as_deref(), Some("")) {
        return SearchNotesResponse {
            notes: Vec::new(),
            found_count: 0,
            query,
            search_type: SearchType::Empty,
            message: "Empty search query".to_string(),
            error: None,
        };
    }

    let limit = input.limit.clamp(1, SEARCH_LIMIT_MAX) as usize;
    let (search_type, result) = match tag {
        Some(tag) => (
            SearchType::Tag,
            query_index(index, move |idx| idx.notes_by_tag(&tag)).await,
        ),
        None => {
            let needle = query.clone();
            (
                SearchType::Body,
                query_index(index, move |idx| idx.search(&needle)).await,
            )
        }
    };

    match result {
        Ok(found) => {
            let notes: Vec<NoteRef> = found.iter().take(limit).map(NoteRef::from).collect();
            debug!(?search_type, matches = found.len(), returned = notes.len(), "search_notes");
            SearchNotesResponse {
                found_count: notes.len(),
                message: format!("Found {} notes matching '{}'", notes.len(), query),
                notes,
                query,
                search_type,
                error: None,
            }
        }
        Err(err) => {
            warn!(error = %err, "search_notes failed");
            SearchNotesResponse {
                notes: Vec::new(),
                found_count: 0,
                message: format!("Search for '{}' failed", query),
                query,
                search_type: SearchType::Error,
                error: Some(format!("Error searching notes: {}", database_error(&err))),
            }
        }
    }
}

pub async fn create_note(
    app: &dyn NotesApp,
    default_account: Option<&str>,
    input: CreateNoteInput,
) -> CreateNoteResponse {
    let title = input.title.trim().to_string();
    if title.is_empty() {
        return CreateNoteResponse::failed(
            "Note title cannot be empty".to_string(),
            "Please provide a valid note title",
        );
    }

    let non_blank = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
    let new_note = NewNote {
        name: title.clone(),
        html_body: markdown_to_html(&input.body),
        folder: non_blank(input.folder),
        account: non_blank(input.account).or_else(|| non_blank(default_account.map(str::to_string))),
    };

    let created = match app.make_note(&new_note).await {
        Ok(note) => note,
        Err(ConnectorError::Unavailable(msg)) => {
            warn!(error = %msg, "create_note: scripting backend unavailable");
            return CreateNoteResponse::failed(
                format!("Notes scripting backend not available: {}", msg),
                "Failed to access Apple Notes",
            );
        }
        Err(err) => {
            warn!(error = %err, "create_note failed");
            return CreateNoteResponse::failed(
                format!("Failed to create note: {}", err),
                "Failed to create note in Apple Notes",
            );
        }
    };

    let creation_date = format_stamp(created.creation_date.as_deref()).unwrap_or_else(|err| {
        warn!(error = %err, "Created note has an unreadable creation date");
        None
    });
    let preview_source = created.plaintext.as_deref().unwrap_or(input.body.as_str());
    let summary = CreatedNoteSummary {
        name: created.name.clone().unwrap_or_else(|| title.clone()),
        id: created.id.clone().unwrap_or_else(|| UNKNOWN_ID.to_string()),
        body_preview: body_preview(preview_source),
        creation_date,
        account: created
            .account
            .clone()
            .or(new_note.account)
            .unwrap_or_else(|| UNKNOWN.to_string()),
        folder: created
            .folder
            .clone()
            .or(new_note.folder)
            .unwrap_or_else(|| UNKNOWN.to_string()),
    };
    info!(id = %summary.id, "Created note");

    CreateNoteResponse {
        success: true,
        note: Some(summary),
        message: format!("Successfully created note '{}'", title),
        error: None,
    }
}
