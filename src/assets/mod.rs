//! Asset module
//!
//! Everything the server reads but does not own:
//! - Content compiled into the binary (default config and default skin)
//! - The front-end build output, embedded and served from an immutable bundle
//! - The build manifest that names the entry script and stylesheets

use include_dir::{include_dir, Dir};

mod bundle;
pub mod defaults;
pub mod manifest;

pub use bundle::AssetBundle;
pub use defaults::ensure_defaults;
pub use manifest::{resolve_entry, EntryAssets, ManifestError, MANIFEST_PATH};

/// Default `config.yml` written when none exists
pub const DEFAULT_CONFIG: &str = include_str!("../../defaults/config.yml");

/// Layout of the built-in `default` skin
pub const DEFAULT_LAYOUT: &str = include_str!("../../defaults/skins/default/layout.html");

/// Stylesheet of the built-in `default` skin
pub const DEFAULT_STYLE: &str = include_str!("../../defaults/skins/default/style.css");

/// Front-end build output compiled into the binary
pub static EMBEDDED_DIST: Dir<'static> = include_dir!("$CARGO_MANIFEST_DIR/ui/dist");
