// Apple Common - AppleScript execution and output helpers for Notes.app
//
// Scripts are fed to osascript on stdin. Output is framed with the ASCII
// record (0x1E) and unit (0x1F) separators so note bodies can contain any
// printable text without breaking the parser.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConnectorError;

pub const RECORD_SEPARATOR: char = '\u{1e}';
pub const FIELD_SEPARATOR: char = '\u{1f}';

/// Result of running an AppleScript
#[derive(Debug, Clone)]
pub struct ScriptResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl ScriptResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Runs AppleScript through `osascript` with a wall-clock timeout.
#[derive(Debug, Clone)]
pub struct ScriptRunner {
    osascript: PathBuf,
    timeout: Duration,
}

impl ScriptRunner {
    pub fn new(osascript: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            osascript: osascript.into(),
            timeout,
        }
    }

    /// Execute an AppleScript and return the raw result
    #[cfg(target_os = "macos")]
    pub async fn run(&self, script: &str) -> Result<ScriptResult, ConnectorError> {
        use std::process::Stdio;
        use tokio::io::AsyncWriteExt;
        use tokio::process::Command;

        let mut cmd = Command::new(&self.osascript);
        cmd.stdin(Stdio::piped());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| {
            ConnectorError::Unavailable(format!(
                "Failed to spawn {}: {}",
                self.osascript.display(),
                e
            ))
        })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(script.as_bytes())
                .await
                .map_err(|e| ConnectorError::Other(format!("Failed to write script: {}", e)))?;
        }

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| {
                ConnectorError::Timeout(format!(
                    "osascript did not finish within {}s",
                    self.timeout.as_secs()
                ))
            })?
            .map_err(|e| ConnectorError::Other(format!("Failed to wait for osascript: {}", e)))?;

        Ok(ScriptResult {
            stdout: String::from_utf8_lossy(&output.stdout)
                .trim_end_matches(['\n', '\r'])
                .to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            exit_code: output.status.code().unwrap_or(-1),
        })
    }

    #[cfg(not(target_os = "macos"))]
    pub async fn run(&self, _script: &str) -> Result<ScriptResult, ConnectorError> {
        Err(ConnectorError::Unavailable(
            "Notes.app scripting is only available on macOS".to_string(),
        ))
    }

    /// Execute AppleScript and return stdout, or error if failed
    pub async fn run_output(&self, script: &str) -> Result<String, ConnectorError> {
        let result = self.run(script).await?;
        if result.success() {
            Ok(result.stdout)
        } else {
            Err(classify_script_error(&result.stderr))
        }
    }
}

/// Automation-permission failures (-1743) and "application isn't running"
/// (-600) mean Notes cannot be reached at all.
fn classify_script_error(stderr: &str) -> ConnectorError {
    if stderr.contains("-1743") || stderr.contains("Not authorized") || stderr.contains("(-600)")
    {
        ConnectorError::Unavailable(format!(
            "Notes.app refused automation access. Allow it under System Settings > Privacy & Security > Automation. ({})",
            stderr
        ))
    } else {
        ConnectorError::Script(stderr.to_string())
    }
}

/// Escape a string for use in AppleScript
pub fn escape_applescript_string(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Render a slice as an AppleScript list literal: `{"a", "b"}`
pub fn applescript_string_list(items: &[String]) -> String {
    let quoted: Vec<String> = items
        .iter()
        .map(|item| format!("\"{}\"", escape_applescript_string(item)))
        .collect();
    format!("{{{}}}", quoted.join(", "))
}

/// Split framed output into records of fields. Empty records are dropped.
pub fn split_records(output: &str) -> Vec<Vec<&str>> {
    output
        .split(RECORD_SEPARATOR)
        .map(|record| record.trim_start_matches(['\n', '\r']))
        .filter(|record| !record.is_empty())
        .map(|record| record.split(FIELD_SEPARATOR).collect())
        .collect()
}

/// Parse a date emitted by the `stampOf` handler: `year-month-day-seconds`
/// where seconds count from local midnight. Empty input is a missing date.
pub fn parse_date_stamp(stamp: &str) -> Result<Option<NaiveDateTime>, ConnectorError> {
    let stamp = stamp.trim();
    if stamp.is_empty() || stamp == "missing value" {
        return Ok(None);
    }

    let invalid = || ConnectorError::Other(format!("Invalid date stamp '{}'", stamp));
    let parts: Vec<&str> = stamp.split('-').collect();
    if parts.len() != 4 {
        return Err(invalid());
    }
    let year: i32 = parts[0].parse().map_err(|_| invalid())?;
    let month: u32 = parts[1].parse().map_err(|_| invalid())?;
    let day: u32 = parts[2].parse().map_err(|_| invalid())?;
    let seconds: u32 = parts[3].parse().map_err(|_| invalid())?;

    let date = NaiveDate::from_ymd_opt(year, month, day).ok_or_else(invalid)?;
    let time = NaiveTime::from_num_seconds_from_midnight_opt(seconds, 0).ok_or_else(invalid)?;
    Ok(Some(date.and_time(time)))
}

/// AppleScript handlers shared by the Notes scripts. `stampOf` produces the
/// locale-independent format read by [`parse_date_stamp`].
pub const SCRIPT_HANDLERS: &str = r#"
on stampOf(d)
    if d is missing value then return ""
    return ((year of d) as integer as text) & "-" & ((month of d) as integer as text) & "-" & ((day of d) as integer as text) & "-" & ((time of d) as integer as text)
end stampOf

on textOf(v)
    if v is missing value then return ""
    return v as text
end textOf
"#;

/// Standard connector capabilities for Apple connectors
pub fn apple_connector_capabilities() -> rmcp::model::ServerCapabilities {
    rmcp::model::ServerCapabilities {
        tools: Some(rmcp::model::ToolsCapability { list_changed: None }),
        ..Default::default()
    }
}
