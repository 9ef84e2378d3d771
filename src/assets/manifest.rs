//! Build manifest resolution
//!
//! Reads the Vite manifest (`.vite/manifest.json`) and picks the entry chunk
//! whose script and stylesheets go into the HTML shell.

use serde::Deserialize;
use thiserror::Error;

/// Location of the manifest inside the build bundle
pub const MANIFEST_PATH: &str = ".vite/manifest.json";

/// Manifest key of the application entry module
pub const CANONICAL_ENTRY: &str = "src/main.ts";

/// One record of the manifest; fields the server does not need are ignored
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ManifestChunk {
    #[serde(default)]
    pub file: String,
    #[serde(default)]
    pub css: Vec<String>,
    #[serde(default, rename = "isEntry")]
    pub is_entry: bool,
}

/// Public paths of the entry script and its stylesheets
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryAssets {
    pub script_path: String,
    pub style_paths: Vec<String>,
}

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("manifest is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("entry not found in manifest (no \"src/main.ts\" key and no record with isEntry)")]
    EntryNotFound,
    #[error("entry \"{0}\" has no emitted file")]
    EntryFileMissing(String),
    #[error("manifest path \"{0}\" is malformed")]
    MalformedPath(String),
}

/// Resolve the entry script and stylesheets from raw manifest bytes
///
/// The record keyed `src/main.ts` wins; otherwise the first record in
/// document order flagged `isEntry`. The result only depends on the bytes.
pub fn resolve_entry(manifest: &[u8]) -> Result<EntryAssets, ManifestError> {
    // preserve_order keeps document order, which makes the fallback deterministic
    let records = serde_json::from_slice::<serde_json::Map<String, serde_json::Value>>(manifest)?
        .into_iter()
        .map(|(key, value)| serde_json::from_value::<ManifestChunk>(value).map(|chunk| (key, chunk)))
        .collect::<Result<Vec<_>, serde_json::Error>>()?;

    let (key, chunk) = records
        .iter()
        .find(|(key, _)| key == CANONICAL_ENTRY)
        .or_else(|| records.iter().find(|(_, chunk)| chunk.is_entry))
        .ok_or(ManifestError::EntryNotFound)?;

    if chunk.file.is_empty() {
        return Err(ManifestError::EntryFileMissing(key.clone()));
    }

    let script_path = public_path(&chunk.file)?;
    let style_paths = chunk
        .css
        .iter()
        .filter(|css| !css.is_empty())
        .map(|css| public_path(css))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(EntryAssets {
        script_path,
        style_paths,
    })
}

/// Turn a bundle-relative file into a root-relative URL path with exactly one
/// leading slash
fn public_path(file: &str) -> Result<String, ManifestError> {
    let trimmed = file.trim_start_matches('/');
    let malformed = trimmed.is_empty()
        || trimmed.contains('\\')
        || trimmed.contains("://")
        || trimmed.split('/').any(|segment| segment == "..");

    if malformed {
        return Err(ManifestError::MalformedPath(file.to_string()));
    }
    Ok(format!("/{trimmed}"))
}
