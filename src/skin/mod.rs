//! Skin module
//!
//! A skin is a directory under `./skins/` holding the HTML shell
//! (`layout.html`), its base stylesheet (`style.css`) and any other files the
//! shell references through `/skin-assets/`.

mod template;

use std::path::{Path, PathBuf};

use crate::assets::EntryAssets;
use crate::config::SiteConfig;

pub use template::LayoutTemplate;

/// Root directory of all skins, relative to the working directory
pub const SKINS_DIR: &str = "skins";

/// Layout template inside a skin directory
pub const LAYOUT_FILE: &str = "layout.html";

/// Base stylesheet inside a skin directory
pub const STYLE_FILE: &str = "style.css";

/// URL prefix under which the active skin directory is served
pub const SKIN_ASSETS_PREFIX: &str = "/skin-assets/";

/// Locations of the active skin on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkinPaths {
    pub dir: PathBuf,
    pub layout: PathBuf,
}

impl SkinPaths {
    /// Compute where the configured skin lives; nothing is checked on disk
    pub fn resolve(skins_root: &Path, site: &SiteConfig) -> Self {
        let dir = skins_root.join(&site.skin);
        let layout = dir.join(LAYOUT_FILE);
        Self { dir, layout }
    }

    pub fn exists(&self) -> bool {
        self.dir.is_dir()
    }
}

/// Values a layout template can reference
///
/// Built once at startup; only the template itself is re-read per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutContext {
    pub app_title: String,
    pub script_path: String,
    pub style_paths: Vec<String>,
    pub skin_style_path: String,
}

impl LayoutContext {
    pub fn new(site: &SiteConfig, entry: EntryAssets) -> Self {
        Self {
            app_title: site.wiki_name.clone(),
            script_path: entry.script_path,
            style_paths: entry.style_paths,
            skin_style_path: format!("{SKIN_ASSETS_PREFIX}{STYLE_FILE}"),
        }
    }

    /// Scalar lookup for `{{ name }}`
    pub fn scalar(&self, name: &str) -> Option<&str> {
        match name {
            "app_title" => Some(&self.app_title),
            "script_path" => Some(&self.script_path),
            "skin_style_path" => Some(&self.skin_style_path),
            _ => None,
        }
    }

    /// List lookup for `{{#each name}}`
    pub fn list(&self, name: &str) -> Option<&[String]> {
        match name {
            "style_paths" => Some(&self.style_paths),
            _ => None,
        }
    }
}
