//! First-run installer
//!
//! Makes sure `config.yml` and the `default` skin exist before the server
//! loads anything. Files that already exist are never touched, so an
//! administrator's edits survive every restart.

use std::fs;
use std::io;
use std::path::Path;

use super::{DEFAULT_CONFIG, DEFAULT_LAYOUT, DEFAULT_STYLE};
use crate::config::{CONFIG_FILE, DEFAULT_SKIN};
use crate::logger;
use crate::skin::{LAYOUT_FILE, SKINS_DIR, STYLE_FILE};

/// Install missing defaults under `root` (the working directory in production)
///
/// Every step is idempotent. Any I/O error other than "not found" aborts.
pub fn ensure_defaults(root: &Path) -> io::Result<()> {
    write_if_missing(&root.join(CONFIG_FILE), DEFAULT_CONFIG)?;

    let skin_dir = root.join(SKINS_DIR).join(DEFAULT_SKIN);
    fs::create_dir_all(&skin_dir)?;

    write_if_missing(&skin_dir.join(LAYOUT_FILE), DEFAULT_LAYOUT)?;
    write_if_missing(&skin_dir.join(STYLE_FILE), DEFAULT_STYLE)?;

    Ok(())
}

/// Write `contents` to `path` only if nothing exists there yet
///
/// Returns whether the file was written.
fn write_if_missing(path: &Path, contents: &str) -> io::Result<bool> {
    match fs::metadata(path) {
        Ok(_) => Ok(false),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            fs::write(path, contents)?;
            logger::log_info(&format!("[Defaults] Created {}", path.display()));
            Ok(true)
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    fn snapshot(root: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
        let mut files = BTreeMap::new();
        let mut pending = vec![root.to_path_buf()];
        while let Some(dir) = pending.pop() {
            for entry in fs::read_dir(dir).unwrap() {
                let path = entry.unwrap().path();
                if path.is_dir() {
                    pending.push(path);
                } else {
                    let contents = fs::read(&path).unwrap();
                    files.insert(path, contents);
                }
            }
        }
        files
    }

    #[test]
    fn test_installs_everything_into_empty_root() {
        let dir = tempfile::tempdir().unwrap();
        ensure_defaults(dir.path()).unwrap();

        let skin = dir.path().join("skins/default");
        assert_eq!(
            fs::read(skin.join("layout.html")).unwrap(),
            DEFAULT_LAYOUT.as_bytes()
        );
        assert_eq!(
            fs::read(skin.join("style.css")).unwrap(),
            DEFAULT_STYLE.as_bytes()
        );
        assert_eq!(
            fs::read(dir.path().join("config.yml")).unwrap(),
            DEFAULT_CONFIG.as_bytes()
        );
    }

    #[test]
    fn test_second_run_changes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        ensure_defaults(dir.path()).unwrap();
        let first = snapshot(dir.path());

        ensure_defaults(dir.path()).unwrap();
        assert_eq!(snapshot(dir.path()), first);
    }

    #[test]
    fn test_custom_files_are_preserved() {
        let dir = tempfile::tempdir().unwrap();
        let skin = dir.path().join("skins/default");
        fs::create_dir_all(&skin).unwrap();
        fs::write(skin.join("layout.html"), "<p>custom</p>").unwrap();
        fs::write(dir.path().join("config.yml"), "wiki_name: Mine\n").unwrap();

        ensure_defaults(dir.path()).unwrap();

        assert_eq!(
            fs::read_to_string(skin.join("layout.html")).unwrap(),
            "<p>custom</p>"
        );
        assert_eq!(
            fs::read_to_string(dir.path().join("config.yml")).unwrap(),
            "wiki_name: Mine\n"
        );
        // The missing half of the skin is still filled in
        assert_eq!(
            fs::read_to_string(skin.join("style.css")).unwrap(),
            DEFAULT_STYLE
        );
    }

    #[test]
    fn test_write_if_missing_reports_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("file.txt");
        assert!(write_if_missing(&path, "a").unwrap());
        assert!(!write_if_missing(&path, "b").unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap(), "a");
    }

    #[test]
    fn test_stat_failure_other_than_missing_aborts() {
        let dir = tempfile::tempdir().unwrap();
        // A regular file where a directory is expected: stat fails with ENOTDIR
        let root = dir.path().join("file");
        fs::write(&root, "not a directory").unwrap();

        let err = write_if_missing(&root.join(CONFIG_FILE), DEFAULT_CONFIG).unwrap_err();
        assert_ne!(err.kind(), io::ErrorKind::NotFound);
        assert!(ensure_defaults(&root).is_err());
        assert_eq!(fs::read_to_string(&root).unwrap(), "not a directory");
    }

    #[test]
    fn test_default_config_loads() {
        let dir = tempfile::tempdir().unwrap();
        ensure_defaults(dir.path()).unwrap();

        let cfg = crate::config::Config::load_from(&dir.path().join(CONFIG_FILE)).unwrap();
        assert_eq!(cfg.site.wiki_name, "LibreArca");
        assert_eq!(cfg.site.bbs_name, "LibreArca");
        assert_eq!(cfg.site.skin, DEFAULT_SKIN);
        assert_eq!(cfg.server.port, 8088);
    }
}
