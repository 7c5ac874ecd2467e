#![allow(dead_code)]

use async_trait::async_trait;
use flate2::write::GzEncoder;
use flate2::Compression;
use rusqlite::{params, Connection};
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use notes_core::connectors::apple_notes::database::{NoteDatabase, NotesIndex};
use notes_core::connectors::apple_notes::scripting::{NewNote, NotesApp, ScriptedNote};
use notes_core::connectors::apple_notes::AppleNotesConnector;
use notes_core::ConnectorError;

pub const STORE_UUID: &str = "6C1A2B3C-0000-4D5E-8F90-ABCDEF012345";
pub const HASHTAG_UTI: &str = "com.apple.notes.inlinetextattachment.hashtag";

const ENT_ACCOUNT: i64 = 14;
const ENT_FOLDER: i64 = 15;
const ENT_NOTE: i64 = 12;
const ENT_ATTACHMENT: i64 = 9;

// ============================================================================
// NoteStore.sqlite fixture
// ============================================================================

fn varint(mut v: u64, out: &mut Vec<u8>) {
    while v >= 0x80 {
        out.push((v as u8) | 0x80);
        v >>= 7;
    }
    out.push(v as u8);
}

fn bytes_field(number: u64, payload: &[u8], out: &mut Vec<u8>) {
    varint(number << 3 | 2, out);
    varint(payload.len() as u64, out);
    out.extend_from_slice(payload);
}

/// Gzip-compressed protobuf body in the NoteStore layout.
pub fn encode_note_body(text: &str) -> Vec<u8> {
    let mut note = Vec::new();
    bytes_field(2, text.as_bytes(), &mut note);
    let mut document = Vec::new();
    varint(2 << 3, &mut document);
    varint(0, &mut document);
    bytes_field(3, &note, &mut document);
    let mut root = Vec::new();
    bytes_field(2, &document, &mut root);

    let mut gz = GzEncoder::new(Vec::new(), Compression::default());
    gz.write_all(&root).unwrap();
    gz.finish().unwrap()
}

/// A throwaway NoteStore.sqlite with the tables the reader uses.
pub struct NoteStoreFixture {
    _dir: TempDir,
    path: PathBuf,
    conn: Connection,
    next_pk: i64,
}

impl NoteStoreFixture {
    pub fn new() -> Self {
        Self::build(true)
    }

    /// Store without `Z_METADATA`, so note IDs fall back to primary keys.
    pub fn without_metadata() -> Self {
        Self::build(false)
    }

    fn build(with_metadata: bool) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("NoteStore.sqlite");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE Z_PRIMARYKEY (Z_ENT INTEGER PRIMARY KEY, Z_NAME VARCHAR, Z_SUPER INTEGER, Z_MAX INTEGER);
             CREATE TABLE ZICCLOUDSYNCINGOBJECT (
                 Z_PK INTEGER PRIMARY KEY,
                 Z_ENT INTEGER,
                 ZTITLE1 VARCHAR,
                 ZTITLE2 VARCHAR,
                 ZNAME VARCHAR,
                 ZFOLDER INTEGER,
                 ZOWNER INTEGER,
                 ZCREATIONDATE3 TIMESTAMP,
                 ZMODIFICATIONDATE1 TIMESTAMP,
                 ZISPASSWORDPROTECTED INTEGER,
                 ZMARKEDFORDELETION INTEGER,
                 ZFOLDERTYPE INTEGER,
                 ZTYPEUTI1 VARCHAR,
                 ZALTTEXT VARCHAR,
                 ZNOTE1 INTEGER
             );
             CREATE TABLE ZICNOTEDATA (Z_PK INTEGER PRIMARY KEY, ZNOTE INTEGER, ZDATA BLOB);",
        )
        .unwrap();
        for (ent, name) in [
            (ENT_ATTACHMENT, "ICInlineAttachment"),
            (ENT_NOTE, "ICNote"),
            (ENT_ACCOUNT, "ICAccount"),
            (ENT_FOLDER, "ICFolder"),
        ] {
            conn.execute(
                "INSERT INTO Z_PRIMARYKEY (Z_ENT, Z_NAME, Z_SUPER, Z_MAX) VALUES (?1, ?2, 0, 0)",
                params![ent, name],
            )
            .unwrap();
        }
        if with_metadata {
            conn.execute_batch(
                "CREATE TABLE Z_METADATA (Z_VERSION INTEGER PRIMARY KEY, Z_UUID VARCHAR(255), Z_PLIST BLOB);",
            )
            .unwrap();
            conn.execute(
                "INSERT INTO Z_METADATA (Z_VERSION, Z_UUID) VALUES (1, ?1)",
                params![STORE_UUID],
            )
            .unwrap();
        }

        Self {
            _dir: dir,
            path,
            conn,
            next_pk: 1,
        }
    }

    pub fn path(&self) -> PathBuf {
        self.path.clone()
    }

    pub fn database(&self) -> NoteDatabase {
        NoteDatabase::new(self.path())
    }

    pub fn index(&self) -> Arc<dyn NotesIndex> {
        Arc::new(self.database())
    }

    fn take_pk(&mut self) -> i64 {
        let pk = self.next_pk;
        self.next_pk += 1;
        pk
    }

    pub fn account(&mut self, name: &str) -> i64 {
        let pk = self.take_pk();
        self.conn
            .execute(
                "INSERT INTO ZICCLOUDSYNCINGOBJECT (Z_PK, Z_ENT, ZNAME) VALUES (?1, ?2, ?3)",
                params![pk, ENT_ACCOUNT, name],
            )
            .unwrap();
        pk
    }

    pub fn folder(&mut self, name: &str, account: i64) -> i64 {
        self.folder_of_type(name, account, 0)
    }

    pub fn trash_folder(&mut self, account: i64) -> i64 {
        self.folder_of_type("Recently Deleted", account, 1)
    }

    fn folder_of_type(&mut self, name: &str, account: i64, folder_type: i64) -> i64 {
        let pk = self.take_pk();
        self.conn
            .execute(
                "INSERT INTO ZICCLOUDSYNCINGOBJECT (Z_PK, Z_ENT, ZTITLE2, ZOWNER, ZFOLDERTYPE) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![pk, ENT_FOLDER, name, account, folder_type],
            )
            .unwrap();
        pk
    }

    /// Insert a note. `modified` is a Core Data timestamp.
    pub fn note(&mut self, folder: i64, title: Option<&str>, text: &str, modified: f64) -> i64 {
        let pk = self.insert_note(folder, title, modified, false);
        self.body(pk, &encode_note_body(text));
        pk
    }

    pub fn locked_note(&mut self, folder: i64, title: &str, modified: f64) -> i64 {
        let pk = self.insert_note(folder, Some(title), modified, true);
        self.body(pk, b"\x00encrypted");
        pk
    }

    pub fn note_with_raw_body(&mut self, folder: i64, title: &str, data: &[u8], modified: f64) -> i64 {
        let pk = self.insert_note(folder, Some(title), modified, false);
        self.body(pk, data);
        pk
    }

    fn insert_note(&mut self, folder: i64, title: Option<&str>, modified: f64, locked: bool) -> i64 {
        let pk = self.take_pk();
        self.conn
            .execute(
                "INSERT INTO ZICCLOUDSYNCINGOBJECT
                     (Z_PK, Z_ENT, ZTITLE1, ZFOLDER, ZCREATIONDATE3, ZMODIFICATIONDATE1, ZISPASSWORDPROTECTED, ZMARKEDFORDELETION)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0)",
                params![pk, ENT_NOTE, title, folder, modified - 3600.0, modified, locked as i64],
            )
            .unwrap();
        pk
    }

    fn body(&mut self, note: i64, data: &[u8]) {
        self.conn
            .execute(
                "INSERT INTO ZICNOTEDATA (ZNOTE, ZDATA) VALUES (?1, ?2)",
                params![note, data],
            )
            .unwrap();
    }

    pub fn mark_deleted(&mut self, note: i64) {
        self.conn
            .execute(
                "UPDATE ZICCLOUDSYNCINGOBJECT SET ZMARKEDFORDELETION = 1 WHERE Z_PK = ?1",
                params![note],
            )
            .unwrap();
    }

    /// Inline hashtag attachment, as Notes stores `#tag` tokens.
    pub fn hashtag(&mut self, note: i64, alt_text: &str) {
        let pk = self.take_pk();
        self.conn
            .execute(
                "INSERT INTO ZICCLOUDSYNCINGOBJECT (Z_PK, Z_ENT, ZTYPEUTI1, ZALTTEXT, ZNOTE1) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![pk, ENT_ATTACHMENT, HASHTAG_UTI, alt_text, note],
            )
            .unwrap();
    }

    pub fn note_id(pk: i64) -> String {
        format!("x-coredata://{}/ICNote/p{}", STORE_UUID, pk)
    }
}

/// Standard store used across tests:
/// iCloud/Notes: "Groceries" (newest), "Work plan" (#work attachment)
/// iCloud/Work Projects: "Roadmap" (#Work in text), "Workshop" (#workshop)
/// iCloud/Recently Deleted: "Old idea"
/// plus one note marked for deletion.
pub struct SampleStore {
    pub fixture: NoteStoreFixture,
    pub groceries: i64,
    pub work_plan: i64,
    pub roadmap: i64,
    pub workshop: i64,
    pub trashed: i64,
    pub deleted: i64,
}

pub fn sample_store() -> SampleStore {
    let mut fixture = NoteStoreFixture::new();
    let icloud = fixture.account("iCloud");
    let notes = fixture.folder("Notes", icloud);
    let work = fixture.folder("Work Projects", icloud);
    let trash = fixture.trash_folder(icloud);

    let workshop = fixture.note(work, Some("Workshop"), "Workshop\nBring laptops #workshop", 700_000_100.0);
    let roadmap = fixture.note(work, Some("Roadmap"), "Roadmap\nQ3 goals for #Work and hiring", 700_000_200.0);
    let work_plan = fixture.note(notes, Some("Work plan"), "Work plan\nMeet \u{fffc} the team", 700_000_300.0);
    fixture.hashtag(work_plan, "#work");
    let groceries = fixture.note(notes, Some("Groceries"), "Groceries\nMilk, eggs, Coffee beans", 700_000_400.0);
    let trashed = fixture.note(trash, Some("Old idea"), "Old idea about coffee #work", 700_000_500.0);
    let deleted = fixture.note(notes, Some("Gone"), "Gone coffee #work", 700_000_600.0);
    fixture.mark_deleted(deleted);

    SampleStore {
        fixture,
        groceries,
        work_plan,
        roadmap,
        workshop,
        trashed,
        deleted,
    }
}

// ============================================================================
// Fake Notes.app
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailMode {
    Unavailable,
    Script,
}

/// In-memory [`NotesApp`] recording every call.
#[derive(Default)]
pub struct FakeNotesApp {
    pub notes: Mutex<Vec<ScriptedNote>>,
    pub created: Mutex<Vec<NewNote>>,
    pub fail: Mutex<Option<FailMode>>,
    pub calls: AtomicUsize,
    /// Plain text reported for newly created notes.
    pub created_plaintext: Mutex<Option<String>>,
}

impl FakeNotesApp {
    pub fn with_notes(notes: Vec<ScriptedNote>) -> Self {
        Self {
            notes: Mutex::new(notes),
            ..Default::default()
        }
    }

    pub fn failing(mode: FailMode) -> Self {
        Self {
            fail: Mutex::new(Some(mode)),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn check_fail(&self) -> Result<(), ConnectorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match *self.fail.lock().unwrap() {
            Some(FailMode::Unavailable) => Err(ConnectorError::Unavailable(
                "Notes.app refused automation access".to_string(),
            )),
            Some(FailMode::Script) => Err(ConnectorError::Script("Notes got an error".to_string())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl NotesApp for FakeNotesApp {
    async fn notes_by_ids(&self, ids: &[String]) -> Result<Vec<ScriptedNote>, ConnectorError> {
        self.check_fail()?;
        let notes = self.notes.lock().unwrap();
        Ok(ids
            .iter()
            .filter_map(|id| notes.iter().find(|n| n.id.as_deref() == Some(id.as_str())).cloned())
            .collect())
    }

    async fn make_note(&self, note: &NewNote) -> Result<ScriptedNote, ConnectorError> {
        self.check_fail()?;
        let mut created = self.created.lock().unwrap();
        created.push(note.clone());
        Ok(ScriptedNote {
            id: Some(format!("x-coredata://FAKE/ICNote/p{}", 100 + created.len())),
            name: Some(note.name.clone()),
            body: Some(note.html_body.clone()),
            plaintext: self.created_plaintext.lock().unwrap().clone(),
            creation_date: Some("2025-3-14-3600".to_string()),
            modification_date: Some("2025-3-14-3600".to_string()),
            account: Some(note.account.clone().unwrap_or_else(|| "iCloud".to_string())),
            folder: Some(note.folder.clone().unwrap_or_else(|| "Notes".to_string())),
            password_protected: false,
        })
    }

    async fn check_access(&self) -> Result<(), ConnectorError> {
        self.check_fail()
    }
}

pub fn scripted(id: &str, name: &str) -> ScriptedNote {
    ScriptedNote {
        id: Some(id.to_string()),
        name: Some(name.to_string()),
        body: Some(format!("<div>{}</div>", name)),
        plaintext: Some(name.to_string()),
        creation_date: Some("2025-1-15-50400".to_string()),
        modification_date: Some("2025-1-16-3600".to_string()),
        account: Some("iCloud".to_string()),
        folder: Some("Notes".to_string()),
        password_protected: false,
    }
}

pub fn connector(app: Arc<FakeNotesApp>, index: Arc<dyn NotesIndex>) -> AppleNotesConnector {
    AppleNotesConnector::with_backends(app, index, None)
}

pub fn missing_index() -> Arc<dyn NotesIndex> {
    Arc::new(NoteDatabase::new("/nonexistent/NoteStore.sqlite"))
}
