// Apple Notes Connector - Notes.app scripting plus direct NoteStore.sqlite reads
//
// Listing and searching read the Notes database directly, which is fast and
// needs no automation permission. Fetching full notes by ID and creating
// notes go through Notes.app.

pub mod body;
pub mod database;
pub mod scripting;
pub mod tools;

use async_trait::async_trait;
use rmcp::model::*;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map as JsonMap, Value};
use std::borrow::Cow;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::NotesConfig;
use crate::connectors::apple_common::apple_connector_capabilities;
use crate::error::ConnectorError;

use self::database::{NoteDatabase, NotesIndex};
use self::scripting::{NotesApp, ScriptingNotesApp};
use self::tools::{CreateNoteInput, GetNotesInput, ListNotesInput, SearchNotesInput};

pub const LIST_NOTES: &str = "list_notes";
pub const GET_NOTES: &str = "get_notes";
pub const SEARCH_NOTES: &str = "search_notes";
pub const CREATE_NOTE: &str = "create_note";

/// Apple Notes connector backed by a [`NotesApp`] and a [`NotesIndex`].
pub struct AppleNotesConnector {
    app: Arc<dyn NotesApp>,
    index: Arc<dyn NotesIndex>,
    default_account: Option<String>,
}

impl AppleNotesConnector {
    pub fn new(config: &NotesConfig) -> Self {
        let index = NoteDatabase::from_config(config);
        match index.path() {
            Some(path) => debug!(path = %path.display(), "Using Notes database"),
            None => warn!("No home directory, Notes database unavailable"),
        }
        Self::with_backends(
            Arc::new(ScriptingNotesApp::from_config(config)),
            Arc::new(index),
            config.default_account.clone(),
        )
    }

    pub fn with_backends(
        app: Arc<dyn NotesApp>,
        index: Arc<dyn NotesIndex>,
        default_account: Option<String>,
    ) -> Self {
        Self {
            app,
            index,
            default_account,
        }
    }

    pub async fn list_notes(&self, input: ListNotesInput) -> tools::ListNotesResponse {
        tools::list_notes(&self.index, input).await
    }

    pub async fn get_notes(&self, input: GetNotesInput) -> tools::GetNotesResponse {
        tools::get_notes(self.app.as_ref(), input).await
    }

    pub async fn search_notes(&self, input: SearchNotesInput) -> tools::SearchNotesResponse {
        tools::search_notes(&self.index, input).await
    }

    pub async fn create_note(&self, input: CreateNoteInput) -> tools::CreateNoteResponse {
        tools::create_note(self.app.as_ref(), self.default_account.as_deref(), input).await
    }
}

fn input_schema<T: JsonSchema>() -> Result<Arc<JsonObject>, ConnectorError> {
    match serde_json::to_value(schemars::schema_for!(T))? {
        Value::Object(map) => Ok(Arc::new(map)),
        _ => Err(ConnectorError::InternalError(
            "Tool schema is not an object".to_string(),
        )),
    }
}

fn parse_args<T: DeserializeOwned>(args: JsonMap<String, Value>) -> Result<T, ConnectorError> {
    serde_json::from_value(Value::Object(args))
        .map_err(|e| ConnectorError::InvalidParams(e.to_string()))
}

/// Tool result with the response as structured content and as a JSON text block.
pub fn structured_result<T: Serialize>(
    data: &T,
    is_error: bool,
) -> Result<CallToolResult, ConnectorError> {
    let value = serde_json::to_value(data)?;
    let text = serde_json::to_string_pretty(&value)?;
    Ok(CallToolResult {
        content: vec![Content::text(text)],
        structured_content: Some(value),
        is_error: Some(is_error),
        meta: None,
    })
}

fn tool(
    name: &'static str,
    title: &str,
    description: &'static str,
    input_schema: Arc<JsonObject>,
    read_only: bool,
) -> Tool {
    Tool {
        name: Cow::Borrowed(name),
        title: Some(title.to_string()),
        description: Some(Cow::Borrowed(description)),
        input_schema,
        output_schema: None,
        annotations: Some(ToolAnnotations {
            title: None,
            read_only_hint: Some(read_only),
            destructive_hint: Some(false),
            idempotent_hint: Some(read_only),
            open_world_hint: Some(false),
        }),
        icons: None,
    }
}

#[async_trait]
impl crate::Connector for AppleNotesConnector {
    fn name(&self) -> &'static str {
        "apple-notes"
    }

    fn description(&self) -> &'static str {
        "Apple Notes for macOS. List, search, read and create notes across iCloud and On My Mac accounts."
    }

    async fn capabilities(&self) -> ServerCapabilities {
        apple_connector_capabilities()
    }

    async fn check_access(&self) -> Result<(), ConnectorError> {
        self.app.check_access().await?;
        let index = Arc::clone(&self.index);
        tokio::task::spawn_blocking(move || index.all_notes().map(|_| ()))
            .await
            .map_err(|e| ConnectorError::InternalError(e.to_string()))?
    }

    async fn initialize(
        &self,
        _request: InitializeRequestParam,
    ) -> Result<InitializeResult, ConnectorError> {
        Ok(InitializeResult {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: self.capabilities().await,
            server_info: Implementation {
                name: self.name().to_string(),
                title: Some("Apple Notes".to_string()),
                version: env!("CARGO_PKG_VERSION").to_string(),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Use list_notes or search_notes to find note IDs, then get_notes for full content. Search with '#tag' for hashtags. create_note accepts Markdown. First use may trigger a Notes automation permission prompt."
                    .to_string(),
            ),
        })
    }

    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParam>,
    ) -> Result<ListResourcesResult, ConnectorError> {
        Ok(ListResourcesResult {
            resources: vec![],
            next_cursor: None,
        })
    }

    async fn read_resource(
        &self,
        _request: ReadResourceRequestParam,
    ) -> Result<Vec<ResourceContents>, ConnectorError> {
        Err(ConnectorError::ResourceNotFound)
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
    ) -> Result<ListToolsResult, ConnectorError> {
        let tools = vec![
            tool(
                LIST_NOTES,
                "List Notes",
                "List notes, most recently modified first. Returns titles and IDs; optionally filter by folder name.",
                input_schema::<ListNotesInput>()?,
                true,
            ),
            tool(
                GET_NOTES,
                "Get Notes",
                "Fetch full notes by ID: HTML body, plain text, dates, account, folder and lock state. Unknown IDs are reported in not_found.",
                input_schema::<GetNotesInput>()?,
                true,
            ),
            tool(
                SEARCH_NOTES,
                "Search Notes",
                "Search note titles and bodies (case-insensitive). Start the query with '#' to find notes carrying a hashtag.",
                input_schema::<SearchNotesInput>()?,
                true,
            ),
            tool(
                CREATE_NOTE,
                "Create Note",
                "Create a note from a title and a Markdown body, optionally in a specific folder or account.",
                input_schema::<CreateNoteInput>()?,
                false,
            ),
        ];

        Ok(ListToolsResult {
            tools,
            next_cursor: None,
        })
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
    ) -> Result<CallToolResult, ConnectorError> {
        let name = request.name.as_ref();
        let args = request.arguments.unwrap_or_default();
        debug!(tool = name, "call_tool");

        match name {
            LIST_NOTES => {
                let response = self.list_notes(parse_args(args)?).await;
                structured_result(&response, response.is_error())
            }
            GET_NOTES => {
                let response = self.get_notes(parse_args(args)?).await;
                structured_result(&response, response.is_error())
            }
            SEARCH_NOTES => {
                let response = self.search_notes(parse_args(args)?).await;
                structured_result(&response, response.is_error())
            }
            CREATE_NOTE => {
                let response = self.create_note(parse_args(args)?).await;
                structured_result(&response, response.is_error())
            }
            _ => Err(ConnectorError::ToolNotFound),
        }
    }

    async fn list_prompts(
        &self,
        _request: Option<PaginatedRequestParam>,
    ) -> Result<ListPromptsResult, ConnectorError> {
        Ok(ListPromptsResult {
            prompts: vec![],
            next_cursor: None,
        })
    }

    async fn get_prompt(&self, _name: &str) -> Result<Prompt, ConnectorError> {
        Err(ConnectorError::ResourceNotFound)
    }
}
