// Application state module
// Everything a request handler may read, frozen before the first accept

use super::types::{Config, RouterMode, SiteConfig};
use crate::assets::AssetBundle;
use crate::skin::{LayoutContext, SkinPaths};

/// Application state
///
/// Built once during startup and shared behind an `Arc`. Nothing in here is
/// mutated after construction, so handlers read it without locks.
pub struct AppState {
    pub config: Config,
    pub bundle: AssetBundle,
    pub skin: SkinPaths,
    /// `None` in the SPA modes, where no layout is rendered
    pub layout: Option<LayoutContext>,
}

impl AppState {
    pub const fn new(
        config: Config,
        bundle: AssetBundle,
        skin: SkinPaths,
        layout: Option<LayoutContext>,
    ) -> Self {
        Self {
            config,
            bundle,
            skin,
            layout,
        }
    }

    pub const fn site(&self) -> &SiteConfig {
        &self.config.site
    }

    pub const fn mode(&self) -> RouterMode {
        self.config.server.mode
    }

    pub const fn access_log(&self) -> bool {
        self.config.logging.access_log
    }
}
