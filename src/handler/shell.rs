//! HTML shell and runtime configuration
//!
//! The shell is the skin's `layout.html`, read and parsed again for every
//! request so administrators can edit it without a restart. In the SPA modes
//! the bundle's own `index.html` plays that role.

use crate::config::{AppState, SiteConfig};
use crate::handler::router::RequestContext;
use crate::handler::static_files::{self, INDEX_FILE};
use crate::http::{self, mime, CachePolicy};
use crate::logger;
use crate::skin::LayoutTemplate;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::Response;

/// Path of the generated runtime configuration script
pub const CONFIG_SCRIPT_PATH: &str = "/config.js";

/// Global the front end reads its configuration from
const CONFIG_GLOBAL: &str = "window.__WIKI_CONFIG__";

/// Render `window.__WIKI_CONFIG__ = {...};`
///
/// Serialization cannot realistically fail for [`SiteConfig`]; if it ever
/// does the script is empty rather than the request failing.
pub fn render_config_script(site: &SiteConfig) -> String {
    match serde_json::to_string(site) {
        Ok(json) => format!("{CONFIG_GLOBAL} = {json};"),
        Err(e) => {
            logger::log_error(&format!("Failed to serialize site config: {e}"));
            String::new()
        }
    }
}

pub fn serve_config_script(ctx: &RequestContext<'_>, site: &SiteConfig) -> Response<Full<Bytes>> {
    http::build_script_response(render_config_script(site), ctx.is_head)
}

/// Render the active skin's layout
///
/// Any failure is logged with its cause and answered with a generic 500.
pub async fn serve_layout(ctx: &RequestContext<'_>, state: &AppState) -> Response<Full<Bytes>> {
    let Some(layout_ctx) = state.layout.as_ref() else {
        logger::log_error("Layout requested but no layout context was built");
        return http::build_500_response();
    };

    let layout_path = &state.skin.layout;
    let source = match tokio::fs::read_to_string(layout_path).await {
        Ok(source) => source,
        Err(e) => {
            logger::log_error(&format!(
                "Failed to read layout '{}': {e}",
                layout_path.display()
            ));
            return http::build_500_response();
        }
    };

    match LayoutTemplate::parse(&source).and_then(|template| template.render(layout_ctx)) {
        Ok(html) => http::build_html_response(html, ctx.is_head),
        Err(e) => {
            logger::log_error(&format!(
                "Failed to render layout '{}': {e}",
                layout_path.display()
            ));
            http::build_500_response()
        }
    }
}

/// SPA fallback: existing bundle files as-is, everything else `index.html`
pub fn serve_spa(ctx: &RequestContext<'_>, state: &AppState) -> Response<Full<Bytes>> {
    let relative = ctx.path.trim_start_matches('/');
    let relative = if relative.is_empty() { INDEX_FILE } else { relative };

    if state.bundle.contains(relative) {
        return static_files::serve_bundle_file(ctx, &state.bundle, relative);
    }

    match state.bundle.get(INDEX_FILE) {
        Some(index) => static_files::build_static_file_response(
            ctx,
            index.clone(),
            mime::HTML,
            CachePolicy::NoCache,
        ),
        None => http::build_404_response(),
    }
}
