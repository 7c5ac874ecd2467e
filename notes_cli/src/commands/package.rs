//! `.dxt` desktop extension bundle builder.
//!
//! A bundle is a zip holding `manifest.json`, the server binary at the
//! manifest's `server.entry_point`, and optional README/LICENSE/icon files
//! found next to the manifest.

use owo_colors::OwoColorize;
use serde_json::Value;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::{CommandError, Result};
use crate::cli::OutputFormat;

const REQUIRED_FIELDS: &[&str] = &["dxt_version", "name", "version", "description"];
const OPTIONAL_FILES: &[&str] = &["README.md", "LICENSE"];
const DEFAULT_ICON: &str = "icon.png";

/// Fields of a validated manifest needed to lay out the bundle.
#[derive(Debug, Clone, PartialEq)]
pub struct ManifestInfo {
    pub name: String,
    pub version: String,
    pub entry_point: String,
    pub icon: String,
}

impl ManifestInfo {
    pub fn bundle_name(&self) -> String {
        format!("{}-{}.dxt", self.name, self.version)
    }
}

/// Check the manifest has everything a host needs to launch the server.
pub fn validate_manifest(manifest: &Value) -> Result<ManifestInfo> {
    let str_field = |value: &Value, key: &str| {
        value
            .get(key)
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };

    let missing: Vec<&str> = REQUIRED_FIELDS
        .iter()
        .copied()
        .filter(|key| str_field(manifest, key).is_none())
        .collect();
    if !missing.is_empty() {
        return Err(CommandError::InvalidManifest(format!(
            "missing required fields: {}",
            missing.join(", ")
        )));
    }

    let server = manifest
        .get("server")
        .filter(|s| s.is_object())
        .ok_or_else(|| CommandError::InvalidManifest("missing required field: server".into()))?;
    let entry_point = str_field(server, "entry_point").ok_or_else(|| {
        CommandError::InvalidManifest("missing required field: server.entry_point".into())
    })?;
    match str_field(server, "type").as_deref() {
        Some("binary") => {}
        Some(other) => {
            return Err(CommandError::InvalidManifest(format!(
                "server.type must be 'binary', found '{}'",
                other
            )))
        }
        None => {
            return Err(CommandError::InvalidManifest(
                "missing required field: server.type".into(),
            ))
        }
    }

    Ok(ManifestInfo {
        name: str_field(manifest, "name").unwrap_or_default(),
        version: str_field(manifest, "version").unwrap_or_default(),
        entry_point: entry_point.trim_start_matches("./").to_string(),
        icon: str_field(manifest, "icon").unwrap_or_else(|| DEFAULT_ICON.to_string()),
    })
}

/// Build the bundle and return its path.
pub fn build_bundle(manifest_path: &Path, binary: &Path, out_dir: &Path) -> Result<PathBuf> {
    let manifest_bytes = fs::read(manifest_path)?;
    let manifest: Value = serde_json::from_slice(&manifest_bytes)?;
    let info = validate_manifest(&manifest)?;
    if !binary.is_file() {
        return Err(CommandError::InvalidManifest(format!(
            "server binary not found: {}",
            binary.display()
        )));
    }

    fs::create_dir_all(out_dir)?;
    let bundle_path = out_dir.join(info.bundle_name());
    let mut zip = ZipWriter::new(File::create(&bundle_path)?);
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o644);

    zip.start_file("manifest.json", options)?;
    zip.write_all(&manifest_bytes)?;

    zip.start_file(info.entry_point.as_str(), options.unix_permissions(0o755))?;
    zip.write_all(&fs::read(binary)?)?;
    debug!(entry_point = %info.entry_point, "Added server binary");

    let base = manifest_path.parent().unwrap_or_else(|| Path::new("."));
    let extras = OPTIONAL_FILES.iter().map(|s| s.to_string()).chain([info.icon.clone()]);
    for name in extras {
        let path = base.join(&name);
        if path.is_file() {
            zip.start_file(name.as_str(), options)?;
            zip.write_all(&fs::read(&path)?)?;
            debug!(file = %name, "Added bundle file");
        }
    }

    zip.finish()?;
    info!(path = %bundle_path.display(), "Built extension bundle");
    Ok(bundle_path)
}

pub fn run(format: OutputFormat, manifest: &Path, binary: &Path, out_dir: &Path) -> Result<()> {
    let bundle = build_bundle(manifest, binary, out_dir)?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::json!({ "bundle": bundle })),
        OutputFormat::Pretty => println!("{} {}", "Created".green().bold(), bundle.display()),
    }
    Ok(())
}
