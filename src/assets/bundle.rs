//! Immutable build-output bundle
//!
//! The front-end build is compiled into the binary. A `server.dist_dir`
//! override is read into memory once at startup and never touched again.

use hyper::body::Bytes;
use include_dir::Dir;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;

use super::EMBEDDED_DIST;

/// In-memory snapshot of a build output directory, keyed by `/`-separated
/// relative path (e.g. `assets/main-4f2a.js`)
#[derive(Debug, Default)]
pub struct AssetBundle {
    files: HashMap<String, Bytes>,
}

impl AssetBundle {
    /// The build output embedded at compile time
    pub fn embedded() -> Self {
        let mut files = Vec::new();
        collect_embedded(&EMBEDDED_DIST, &mut files);
        Self::from_files(files)
    }

    /// Read every file under `root` into memory
    ///
    /// Fails if `root` is not a readable directory.
    pub fn load(root: &Path) -> io::Result<Self> {
        let mut files = HashMap::new();
        let mut pending = vec![(root.to_path_buf(), String::new())];

        while let Some((dir, prefix)) = pending.pop() {
            for entry in fs::read_dir(&dir)? {
                let entry = entry?;
                let name = entry.file_name().to_string_lossy().into_owned();
                let key = if prefix.is_empty() {
                    name
                } else {
                    format!("{prefix}/{name}")
                };

                let path = entry.path();
                let metadata = fs::metadata(&path)?;
                if metadata.is_dir() {
                    pending.push((path, key));
                } else if metadata.is_file() {
                    files.insert(key, Bytes::from(fs::read(&path)?));
                }
            }
        }

        Ok(Self { files })
    }

    /// Build a bundle from in-memory files
    pub fn from_files<I, K, V>(files: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Bytes>,
    {
        Self {
            files: files
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Look up a file by request-relative path
    ///
    /// Empty and `.` segments are ignored; any `..` segment or backslash makes
    /// the lookup fail. Directories are never matched.
    pub fn get(&self, path: &str) -> Option<&Bytes> {
        let key = normalize_key(path)?;
        self.files.get(&key)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Total size of all files, for the startup banner
    pub fn total_bytes(&self) -> usize {
        self.files.values().map(Bytes::len).sum()
    }
}

fn collect_embedded(dir: &'static Dir<'static>, files: &mut Vec<(String, Bytes)>) {
    for file in dir.files() {
        // Paths are relative to the embedded root
        let key: Vec<&str> = file
            .path()
            .components()
            .filter_map(|c| c.as_os_str().to_str())
            .collect();
        files.push((key.join("/"), Bytes::from_static(file.contents())));
    }
    for sub in dir.dirs() {
        collect_embedded(sub, files);
    }
}

fn normalize_key(path: &str) -> Option<String> {
    if path.contains('\\') {
        return None;
    }

    let mut segments = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => return None,
            s => segments.push(s),
        }
    }

    if segments.is_empty() {
        return None;
    }
    Some(segments.join("/"))
}
