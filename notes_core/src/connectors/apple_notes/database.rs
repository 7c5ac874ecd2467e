// NoteStore.sqlite reader
//
// Listing and searching go straight to the Core Data store instead of
// Notes.app. The store is opened read-only with a fresh connection per call;
// all work here is blocking and is driven from `spawn_blocking` by callers.

use chrono::{DateTime, Local, NaiveDateTime};
use regex::Regex;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::body::decode_note_text;
use crate::config::NotesConfig;
use crate::error::ConnectorError;

/// Seconds between the Unix epoch and the Core Data reference date
/// (2001-01-01T00:00:00Z).
const CORE_DATA_EPOCH_OFFSET: f64 = 978_307_200.0;
const HASHTAG_UTI: &str = "com.apple.notes.inlinetextattachment.hashtag";
const TRASH_FOLDER_TYPE: i64 = 1;

/// A note row read from the store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoredNote {
    pub pk: i64,
    /// Scripting-style identifier, when the store UUID is known.
    pub id: Option<String>,
    pub title: Option<String>,
    pub folder: Option<String>,
    pub account: Option<String>,
    pub creation_date: Option<NaiveDateTime>,
    pub modification_date: Option<NaiveDateTime>,
    /// Decoded body text. `None` for locked notes and undecodable bodies.
    pub text: Option<String>,
    pub password_protected: bool,
}

impl StoredNote {
    fn matches(&self, needle_lower: &str) -> bool {
        let hit = |v: &Option<String>| {
            v.as_deref()
                .map(|s| s.to_lowercase().contains(needle_lower))
                .unwrap_or(false)
        };
        hit(&self.title) || hit(&self.text)
    }
}

/// Read access to the note index. Results are ordered newest-modified first
/// and exclude trashed notes.
pub trait NotesIndex: Send + Sync {
    fn all_notes(&self) -> Result<Vec<StoredNote>, ConnectorError>;

    /// Case-insensitive substring match on title and body text.
    fn search(&self, query: &str) -> Result<Vec<StoredNote>, ConnectorError> {
        let needle = query.to_lowercase();
        Ok(self
            .all_notes()?
            .into_iter()
            .filter(|note| note.matches(&needle))
            .collect())
    }

    /// Notes carrying `#tag`, compared case-insensitively. `tag` has no `#`.
    fn notes_by_tag(&self, tag: &str) -> Result<Vec<StoredNote>, ConnectorError>;
}

/// [`NotesIndex`] over a NoteStore.sqlite file.
#[derive(Debug, Clone)]
pub struct NoteDatabase {
    path: Option<PathBuf>,
}

/// Column layout discovered for the current store.
#[derive(Debug, Default)]
struct Schema {
    columns: HashSet<String>,
    entities: HashMap<String, i64>,
    store_uuid: Option<String>,
}

impl Schema {
    fn probe(conn: &Connection) -> Result<Self, ConnectorError> {
        let mut stmt = conn.prepare("PRAGMA table_info(ZICCLOUDSYNCINGOBJECT)")?;
        let columns = stmt
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<Result<HashSet<_>, _>>()?;
        if columns.is_empty() {
            return Err(ConnectorError::Unavailable(
                "Notes database has no ZICCLOUDSYNCINGOBJECT table".to_string(),
            ));
        }

        let mut entities = HashMap::new();
        if table_exists(conn, "Z_PRIMARYKEY")? {
            let mut stmt = conn.prepare("SELECT Z_NAME, Z_ENT FROM Z_PRIMARYKEY")?;
            let rows =
                stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?;
            for row in rows {
                let (name, ent) = row?;
                entities.insert(name, ent);
            }
        }

        let store_uuid = if table_exists(conn, "Z_METADATA")? {
            conn.query_row("SELECT Z_UUID FROM Z_METADATA LIMIT 1", [], |row| {
                row.get::<_, Option<String>>(0)
            })
            .optional()?
            .flatten()
        } else {
            None
        };

        debug!(
            columns = columns.len(),
            entities = entities.len(),
            has_uuid = store_uuid.is_some(),
            "Probed NoteStore schema"
        );
        Ok(Self {
            columns,
            entities,
            store_uuid,
        })
    }

    fn has(&self, column: &str) -> bool {
        self.columns.contains(column)
    }

    /// `alias.column` if the column exists, otherwise `fallback`.
    fn col(&self, alias: &str, column: &str, fallback: &str) -> String {
        if self.has(column) {
            format!("{}.{}", alias, column)
        } else {
            fallback.to_string()
        }
    }

    fn note_id(&self, pk: i64) -> String {
        match &self.store_uuid {
            Some(uuid) => format!("x-coredata://{}/ICNote/p{}", uuid, pk),
            None => pk.to_string(),
        }
    }

    fn notes_query(&self) -> String {
        let creation = if self.has("ZCREATIONDATE3") {
            "n.ZCREATIONDATE3".to_string()
        } else {
            self.col("n", "ZCREATIONDATE1", "NULL")
        };
        let note_filter = match self.entities.get("ICNote") {
            Some(ent) => format!("n.Z_ENT = {}", ent),
            None => "EXISTS (SELECT 1 FROM ZICNOTEDATA x WHERE x.ZNOTE = n.Z_PK)".to_string(),
        };
        let folder_join = if self.has("ZFOLDER") {
            "LEFT JOIN ZICCLOUDSYNCINGOBJECT f ON f.Z_PK = n.ZFOLDER"
        } else {
            "LEFT JOIN ZICCLOUDSYNCINGOBJECT f ON 0"
        };
        let account_join = if self.has("ZOWNER") {
            "LEFT JOIN ZICCLOUDSYNCINGOBJECT a ON a.Z_PK = f.ZOWNER"
        } else {
            "LEFT JOIN ZICCLOUDSYNCINGOBJECT a ON 0"
        };

        format!(
            "SELECT n.Z_PK, {title}, {folder}, {account}, {creation}, {modified}, {locked}, d.ZDATA
             FROM ZICCLOUDSYNCINGOBJECT n
             {folder_join}
             {account_join}
             LEFT JOIN ZICNOTEDATA d ON d.ZNOTE = n.Z_PK
             WHERE {note_filter}
               AND COALESCE({deleted}, 0) = 0
               AND COALESCE({folder_type}, 0) != {trash}
             ORDER BY {modified} DESC, n.Z_PK DESC",
            title = self.col("n", "ZTITLE1", "NULL"),
            folder = self.col("f", "ZTITLE2", "NULL"),
            account = self.col("a", "ZNAME", "NULL"),
            creation = creation,
            modified = self.col("n", "ZMODIFICATIONDATE1", "NULL"),
            locked = self.col("n", "ZISPASSWORDPROTECTED", "0"),
            folder_join = folder_join,
            account_join = account_join,
            note_filter = note_filter,
            deleted = self.col("n", "ZMARKEDFORDELETION", "0"),
            folder_type = self.col("f", "ZFOLDERTYPE", "0"),
            trash = TRASH_FOLDER_TYPE,
        )
    }

    /// Hashtag attachment query, when this store records them.
    fn tag_query(&self) -> Option<String> {
        let note_column = if self.has("ZNOTE1") {
            "ZNOTE1"
        } else if self.has("ZNOTE") {
            "ZNOTE"
        } else {
            return None;
        };
        if !self.has("ZTYPEUTI1") || !self.has("ZALTTEXT") {
            return None;
        }
        Some(format!(
            "SELECT DISTINCT {note} FROM ZICCLOUDSYNCINGOBJECT
             WHERE ZTYPEUTI1 = ?1 AND LOWER(ZALTTEXT) = LOWER(?2) AND {note} IS NOT NULL",
            note = note_column
        ))
    }
}

fn table_exists(conn: &Connection, name: &str) -> Result<bool, ConnectorError> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [name],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

/// Convert a Core Data timestamp to local wall-clock time.
pub fn core_data_timestamp(seconds: f64) -> Option<NaiveDateTime> {
    if !seconds.is_finite() {
        return None;
    }
    let unix = seconds + CORE_DATA_EPOCH_OFFSET;
    let whole = unix.floor();
    let nanos = ((unix - whole) * 1e9) as u32;
    DateTime::from_timestamp(whole as i64, nanos).map(|utc| utc.with_timezone(&Local).naive_local())
}

impl NoteDatabase {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    /// Configured override, else the Notes group container. Without a home
    /// directory there is no location and every query reports `Unavailable`.
    pub fn from_config(config: &NotesConfig) -> Self {
        Self {
            path: config.resolved_database_path(),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn open(&self) -> Result<Connection, ConnectorError> {
        let path = self.path.as_deref().ok_or_else(|| {
            ConnectorError::Unavailable(
                "Notes database location unknown: no home directory".to_string(),
            )
        })?;
        if !path.exists() {
            return Err(ConnectorError::Unavailable(format!(
                "Notes database not found at {}",
                path.display()
            )));
        }
        Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| {
            ConnectorError::Unavailable(format!(
                "Cannot open Notes database at {}: {}",
                path.display(),
                e
            ))
        })
    }

    fn load_notes(&self, conn: &Connection, schema: &Schema) -> Result<Vec<StoredNote>, ConnectorError> {
        let sql = schema.notes_query();
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query([])?;
        let mut notes = Vec::new();

        while let Some(row) = rows.next()? {
            let pk: i64 = row.get(0)?;
            let password_protected = row.get::<_, Option<i64>>(6)?.unwrap_or(0) != 0;
            let data: Option<Vec<u8>> = row.get(7)?;

            let text = match data {
                Some(blob) if !password_protected => {
                    let decoded = decode_note_text(&blob);
                    if decoded.is_none() {
                        warn!(pk, "Could not decode note body");
                    }
                    decoded
                }
                _ => None,
            };

            notes.push(StoredNote {
                pk,
                id: Some(schema.note_id(pk)),
                title: row.get(1)?,
                folder: row.get(2)?,
                account: row.get(3)?,
                creation_date: row.get::<_, Option<f64>>(4)?.and_then(core_data_timestamp),
                modification_date: row.get::<_, Option<f64>>(5)?.and_then(core_data_timestamp),
                text,
                password_protected,
            });
        }

        debug!(count = notes.len(), "Loaded notes from store");
        Ok(notes)
    }

    fn tagged_pks(&self, conn: &Connection, schema: &Schema, tag: &str) -> Result<HashSet<i64>, ConnectorError> {
        let Some(sql) = schema.tag_query() else {
            return Ok(HashSet::new());
        };
        let mut stmt = conn.prepare(&sql)?;
        let pks = stmt
            .query_map(params![HASHTAG_UTI, format!("#{}", tag)], |row| row.get::<_, i64>(0))?
            .collect::<Result<HashSet<_>, _>>()?;
        Ok(pks)
    }
}

impl NotesIndex for NoteDatabase {
    fn all_notes(&self) -> Result<Vec<StoredNote>, ConnectorError> {
        let conn = self.open()?;
        let schema = Schema::probe(&conn)?;
        self.load_notes(&conn, &schema)
    }

    fn notes_by_tag(&self, tag: &str) -> Result<Vec<StoredNote>, ConnectorError> {
        let conn = self.open()?;
        let schema = Schema::probe(&conn)?;
        let tagged = self.tagged_pks(&conn, &schema, tag)?;
        let pattern = hashtag_pattern(tag)?;

        Ok(self
            .load_notes(&conn, &schema)?
            .into_iter()
            .filter(|note| {
                tagged.contains(&note.pk)
                    || note
                        .text
                        .as_deref()
                        .map(|text| pattern.is_match(text))
                        .unwrap_or(false)
            })
            .collect())
    }
}

/// `#tag` as a whole token, case-insensitive.
fn hashtag_pattern(tag: &str) -> Result<Regex, ConnectorError> {
    Regex::new(&format!(r"(?i)(?:^|[^\w#])#{}(?:[^\w]|$)", regex::escape(tag)))
        .map_err(|e| ConnectorError::InternalError(format!("Invalid tag pattern: {}", e)))
}
