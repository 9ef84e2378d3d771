use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

mod assets;
mod config;
mod error;
mod handler;
mod http;
mod logger;
mod server;
mod skin;

use assets::{AssetBundle, MANIFEST_PATH};
use config::{AppState, Config, RouterMode, CONFIG_FILE};
use error::StartupError;
use skin::{LayoutContext, SkinPaths, SKINS_DIR};

fn main() -> ExitCode {
    match start() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            logger::log_error(&format!("Startup failed: {e}"));
            ExitCode::FAILURE
        }
    }
}

fn start() -> Result<(), StartupError> {
    assets::ensure_defaults(Path::new(".")).map_err(StartupError::Defaults)?;
    let cfg = Config::load_from(Path::new(CONFIG_FILE))?;
    logger::init(&cfg).map_err(StartupError::Logger)?;

    // Create Tokio runtime, thread count follows server.workers
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers.max(1));
    }
    let runtime = runtime_builder.build().map_err(StartupError::Runtime)?;

    let state = build_state(cfg)?;
    runtime.block_on(async_main(state))
}

/// Pick the bundle, resolve the entry and locate the skin
///
/// Everything here happens once; the result is never mutated.
fn build_state(cfg: Config) -> Result<AppState, StartupError> {
    let bundle = match cfg.server.dist_dir.as_deref().map(Path::new) {
        Some(dist_dir) => {
            let bundle = AssetBundle::load(dist_dir).map_err(|source| StartupError::Bundle {
                path: dist_dir.to_path_buf(),
                source,
            })?;
            if bundle.is_empty() {
                logger::log_warning(&format!(
                    "Bundle directory '{}' contains no files",
                    dist_dir.display()
                ));
            }
            bundle
        }
        None => AssetBundle::embedded(),
    };

    let layout = match cfg.server.mode {
        RouterMode::Skin => {
            let manifest = bundle
                .get(MANIFEST_PATH)
                .ok_or_else(|| StartupError::ManifestMissing(MANIFEST_PATH.to_string()))?;
            let entry = assets::resolve_entry(manifest)?;
            logger::log_entry_resolved(&entry.script_path, entry.style_paths.len());
            Some(LayoutContext::new(&cfg.site, entry))
        }
        RouterMode::Spa | RouterMode::SpaConfig => None,
    };

    let skin = SkinPaths::resolve(Path::new(SKINS_DIR), &cfg.site);
    if cfg.server.mode.uses_skin() && !skin.exists() {
        if cfg.server.strict_skin {
            return Err(StartupError::SkinMissing(skin.dir));
        }
        logger::log_warning(&format!(
            "Skin '{}' not found at '{}', pages will fail until it exists",
            cfg.site.skin,
            skin.dir.display()
        ));
    }

    Ok(AppState::new(cfg, bundle, skin, layout))
}

async fn async_main(state: AppState) -> Result<(), StartupError> {
    let addr = state.config.get_socket_addr().map_err(StartupError::Address)?;
    let listener =
        server::create_listener(addr).map_err(|source| StartupError::Bind { addr, source })?;

    logger::log_server_start(
        &addr,
        &state.config,
        state.bundle.len(),
        state.bundle.total_bytes(),
    );

    server::run(listener, Arc::new(state)).await;
    Ok(())
}
