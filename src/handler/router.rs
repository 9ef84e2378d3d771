//! Request routing dispatch module
//!
//! Entry point for HTTP request processing: method validation, route
//! matching by path prefix, access logging.

use crate::config::AppState;
use crate::handler::{shell, static_files};
use crate::http;
use crate::logger::{self, AccessLogEntry};
use crate::skin::SKIN_ASSETS_PREFIX;
use http_body_util::Full;
use hyper::body::{Body, Bytes};
use percent_encoding::percent_decode_str;
use hyper::http::request::Parts;
use hyper::{Method, Request, Response};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

/// URL prefix of the immutable build assets
pub const ASSETS_PREFIX: &str = "/assets/";

/// Bundle directory the `/assets/` prefix maps onto
const BUNDLE_ASSETS_DIR: &str = "assets";

/// Request context encapsulating information needed for request processing
pub struct RequestContext<'a> {
    pub path: &'a str,
    pub is_head: bool,
    pub if_none_match: Option<String>,
}

/// Main entry point for HTTP request handling
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
    peer_addr: SocketAddr,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let started = Instant::now();
    // No route reads a body, so only the head is kept
    let (parts, _) = req.into_parts();

    let response = match check_http_method(&parts.method) {
        Some(resp) => resp,
        None => match decode_path(parts.uri.path()) {
            Some(path) => {
                let ctx = RequestContext {
                    path: &path,
                    is_head: parts.method == Method::HEAD,
                    if_none_match: header_value(&parts, "if-none-match"),
                };
                route_request(&ctx, &state).await
            }
            None => http::build_404_response(),
        },
    };

    if state.access_log() {
        log_access(&parts, &response, peer_addr, started, &state);
    }

    Ok(response)
}

/// Check HTTP method and return appropriate response for non-GET/HEAD methods
fn check_http_method(method: &Method) -> Option<Response<Full<Bytes>>> {
    match *method {
        Method::GET | Method::HEAD => None,
        Method::OPTIONS => Some(http::build_options_response()),
        _ => {
            logger::log_warning(&format!("Method not allowed: {method}"));
            Some(http::build_405_response())
        }
    }
}

/// Percent-decode the request path
///
/// Invalid UTF-8 and NUL bytes yield `None`. Traversal checks happen later,
/// on the decoded value.
fn decode_path(raw: &str) -> Option<String> {
    let decoded = percent_decode_str(raw).decode_utf8().ok()?;
    if decoded.contains('\0') {
        return None;
    }
    Some(decoded.into_owned())
}

/// Route request based on path and routing mode
///
/// Prefixes are checked longest-first; everything unmatched gets the shell.
async fn route_request(ctx: &RequestContext<'_>, state: &AppState) -> Response<Full<Bytes>> {
    let mode = state.mode();

    if mode.serves_config_script() && ctx.path == shell::CONFIG_SCRIPT_PATH {
        return shell::serve_config_script(ctx, state.site());
    }

    if !mode.uses_skin() {
        return shell::serve_spa(ctx, state);
    }

    if let Some(rest) = ctx.path.strip_prefix(SKIN_ASSETS_PREFIX) {
        return static_files::serve_skin_file(ctx, &state.skin.dir, rest).await;
    }

    if let Some(rest) = ctx.path.strip_prefix(ASSETS_PREFIX) {
        let key = format!("{BUNDLE_ASSETS_DIR}/{rest}");
        return static_files::serve_bundle_file(ctx, &state.bundle, &key);
    }

    // Bare prefixes name directories, which are never listed
    if [ASSETS_PREFIX, SKIN_ASSETS_PREFIX]
        .iter()
        .any(|prefix| ctx.path == prefix.trim_end_matches('/'))
    {
        return http::build_404_response();
    }

    shell::serve_layout(ctx, state).await
}

fn header_value(parts: &Parts, name: &str) -> Option<String> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string)
}

fn log_access(
    parts: &Parts,
    response: &Response<Full<Bytes>>,
    peer_addr: SocketAddr,
    started: Instant,
    state: &AppState,
) {
    let mut entry = AccessLogEntry::new(
        peer_addr.ip().to_string(),
        parts.method.to_string(),
        parts.uri.path().to_string(),
    );
    entry.query = parts.uri.query().map(ToString::to_string);
    entry.http_version = format!("{:?}", parts.version)
        .trim_start_matches("HTTP/")
        .to_string();
    entry.status = response.status().as_u16();
    entry.body_bytes = response
        .body()
        .size_hint()
        .exact()
        .and_then(|n| usize::try_from(n).ok())
        .unwrap_or(0);
    entry.referer = header_value(parts, "referer");
    entry.user_agent = header_value(parts, "user-agent");
    entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);

    logger::log_access(&entry, &state.config.logging.access_log_format);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{self, AssetBundle};
    use crate::config::{Config, RouterMode};
    use crate::skin::{LayoutContext, SkinPaths, LAYOUT_FILE, SKINS_DIR, STYLE_FILE};
    use http_body_util::BodyExt;
    use std::fs;
    use std::path::Path;

    const MANIFEST: &str = r#"{
        "src/other.ts": { "file": "assets/other.js", "isEntry": true },
        "src/main.ts": { "file": "assets/main.js", "css": ["assets/main.css"], "isEntry": true }
    }"#;

    struct Fixture {
        _root: tempfile::TempDir,
        state: Arc<AppState>,
    }

    /// Boot the same way `main` does, inside a temporary working directory
    fn fixture(config_yaml: &str) -> Fixture {
        let root = tempfile::tempdir().unwrap();
        fs::write(root.path().join("config.yml"), config_yaml).unwrap();
        assets::ensure_defaults(root.path()).unwrap();

        let config = Config::load_from(&root.path().join("config.yml")).unwrap();
        let bundle = AssetBundle::from_files([
            (".vite/manifest.json", MANIFEST.as_bytes().to_vec()),
            ("assets/main.js", b"console.log('main')".to_vec()),
            ("assets/main.css", b"body{}".to_vec()),
            ("assets/app.abc123.js", b"app()".to_vec()),
            ("assets/my font.woff2", b"font".to_vec()),
            ("index.html", b"<html>spa</html>".to_vec()),
        ]);

        let skin = SkinPaths::resolve(&root.path().join(SKINS_DIR), &config.site);
        let layout = if config.server.mode.uses_skin() {
            let manifest = bundle.get(assets::MANIFEST_PATH).unwrap();
            let entry = assets::resolve_entry(manifest).unwrap();
            Some(LayoutContext::new(&config.site, entry))
        } else {
            None
        };

        let state = Arc::new(AppState::new(config, bundle, skin, layout));
        Fixture { _root: root, state }
    }

    fn skin_dir(fixture: &Fixture) -> &Path {
        &fixture.state.skin.dir
    }

    async fn request(state: &Arc<AppState>, method: Method, uri: &str) -> Response<Full<Bytes>> {
        request_with(state, Request::builder().method(method).uri(uri)).await
    }

    async fn request_with(
        state: &Arc<AppState>,
        builder: hyper::http::request::Builder,
    ) -> Response<Full<Bytes>> {
        let req = builder.body(()).unwrap();
        let peer: SocketAddr = "127.0.0.1:50000".parse().unwrap();
        handle_request(req, Arc::clone(state), peer).await.unwrap()
    }

    async fn body_of(resp: Response<Full<Bytes>>) -> String {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    const QUIET: &str = "logging:\n  access_log: false\n";

    #[tokio::test]
    async fn test_config_script_end_to_end() {
        let fixture = fixture(&format!("wiki_name: \"MyWiki\"\n{QUIET}"));
        let resp = request(&fixture.state, Method::GET, "/config.js").await;

        assert_eq!(resp.status(), 200);
        assert_eq!(resp.headers()["Content-Type"], "application/javascript");
        let body = body_of(resp).await;
        assert!(body.starts_with("window.__WIKI_CONFIG__ = "));
        assert!(body.ends_with(';'));
        assert!(body.contains(r#""wiki_name":"MyWiki""#));
        assert!(body.contains(r#""bbs_name":"MyWiki""#));
        assert!(body.contains(r#""skin":"default""#));

        let json = body
            .trim_start_matches("window.__WIKI_CONFIG__ = ")
            .trim_end_matches(';');
        let value: serde_json::Value = serde_json::from_str(json).unwrap();
        assert_eq!(value, serde_json::to_value(fixture.state.site()).unwrap());
    }

    #[tokio::test]
    async fn test_bundle_assets() {
        let fixture = fixture(QUIET);

        let resp = request(&fixture.state, Method::GET, "/assets/app.abc123.js").await;
        assert_eq!(resp.status(), 200);
        assert_eq!(resp.headers()["Content-Type"], "application/javascript");
        assert_eq!(
            resp.headers()["Cache-Control"],
            "public, max-age=31536000, immutable"
        );
        assert_eq!(body_of(resp).await, "app()");

        let resp = request(&fixture.state, Method::GET, "/assets/does-not-exist.js").await;
        assert_eq!(resp.status(), 404);
    }

    #[tokio::test]
    async fn test_bundle_assets_do_not_list_or_escape() {
        let fixture = fixture(QUIET);
        for uri in ["/assets/", "/assets/../index.html", "/assets/%2e%2e/index.html"] {
            let resp = request(&fixture.state, Method::GET, uri).await;
            assert_eq!(resp.status(), 404, "{uri}");
        }
    }

    #[tokio::test]
    async fn test_etag_revalidation() {
        let fixture = fixture(QUIET);
        let resp = request(&fixture.state, Method::GET, "/assets/main.css").await;
        let etag = resp.headers()["ETag"].to_str().unwrap().to_string();

        let resp = request_with(
            &fixture.state,
            Request::builder()
                .uri("/assets/main.css")
                .header("If-None-Match", etag.as_str()),
        )
        .await;
        assert_eq!(resp.status(), 304);
        assert!(body_of(resp).await.is_empty());
    }

    #[tokio::test]
    async fn test_skin_assets_follow_disk() {
        let fixture = fixture(QUIET);

        let resp = request(&fixture.state, Method::GET, "/skin-assets/style.css").await;
        assert_eq!(resp.status(), 200);
        assert_eq!(resp.headers()["Cache-Control"], "no-cache");
        assert_eq!(body_of(resp).await, assets::DEFAULT_STYLE);

        fs::write(skin_dir(&fixture).join(STYLE_FILE), "body{color:red}").unwrap();
        fs::write(skin_dir(&fixture).join("logo.svg"), "<svg/>").unwrap();

        let resp = request(&fixture.state, Method::GET, "/skin-assets/style.css").await;
        assert_eq!(body_of(resp).await, "body{color:red}");

        let resp = request(&fixture.state, Method::GET, "/skin-assets/logo.svg").await;
        assert_eq!(resp.headers()["Content-Type"], "image/svg+xml");

        let resp = request(&fixture.state, Method::GET, "/skin-assets/missing.png").await;
        assert_eq!(resp.status(), 404);

        let resp = request(&fixture.state, Method::GET, "/skin-assets/../../config.yml").await;
        assert_eq!(resp.status(), 404);
    }

    #[tokio::test]
    async fn test_layout_renders_for_any_other_path() {
        let fixture = fixture(&format!("wiki_name: MyWiki\n{QUIET}"));

        for uri in ["/", "/wiki/FrontPage", "/bbs/1?page=2", "/assetsx"] {
            let resp = request(&fixture.state, Method::GET, uri).await;
            assert_eq!(resp.status(), 200, "{uri}");
            assert_eq!(resp.headers()["Content-Type"], "text/html; charset=utf-8");

            let body = body_of(resp).await;
            assert!(body.contains("<title>MyWiki</title>"));
            assert!(body.contains(r#"src="/assets/main.js""#));
            assert!(body.contains(r#"href="/assets/main.css""#));
            assert!(body.contains(r#"href="/skin-assets/style.css""#));
        }
    }

    #[tokio::test]
    async fn test_bare_asset_prefixes_are_404() {
        let fixture = fixture(QUIET);
        for uri in ["/assets", "/skin-assets"] {
            let resp = request(&fixture.state, Method::GET, uri).await;
            assert_eq!(resp.status(), 404, "{uri}");
        }
    }

    #[tokio::test]
    async fn test_percent_encoded_file_names() {
        let fixture = fixture(QUIET);
        fs::write(skin_dir(&fixture).join("my logo.svg"), "<svg/>").unwrap();
        fs::write(skin_dir(&fixture).join("로고.svg"), "<svg>ko</svg>").unwrap();

        let resp = request(&fixture.state, Method::GET, "/skin-assets/my%20logo.svg").await;
        assert_eq!(resp.status(), 200);
        assert_eq!(body_of(resp).await, "<svg/>");

        let resp = request(
            &fixture.state,
            Method::GET,
            "/skin-assets/%EB%A1%9C%EA%B3%A0.svg",
        )
        .await;
        assert_eq!(resp.status(), 200);
        assert_eq!(body_of(resp).await, "<svg>ko</svg>");

        let resp = request(&fixture.state, Method::GET, "/assets/my%20font.woff2").await;
        assert_eq!(resp.status(), 200);
        assert_eq!(body_of(resp).await, "font");
    }

    #[tokio::test]
    async fn test_undecodable_paths_are_404() {
        let fixture = fixture(QUIET);
        for uri in [
            "/assets/%FF.js",
            "/skin-assets/style.css%00",
            "/skin-assets/%2e%2e/%2e%2e/config.yml",
            "/skin-assets/..%2F..%2Fconfig.yml",
        ] {
            let resp = request(&fixture.state, Method::GET, uri).await;
            assert_eq!(resp.status(), 404, "{uri}");
        }
    }

    #[test]
    fn test_decode_path() {
        assert_eq!(decode_path("/a%20b").as_deref(), Some("/a b"));
        assert_eq!(decode_path("/plain").as_deref(), Some("/plain"));
        assert_eq!(decode_path("/%C3%A9").as_deref(), Some("/é"));
        assert_eq!(decode_path("/%FF"), None);
        assert_eq!(decode_path("/x%00"), None);
    }

    #[tokio::test]
    async fn test_layout_edits_apply_without_restart() {
        let fixture = fixture(QUIET);
        fs::write(
            skin_dir(&fixture).join(LAYOUT_FILE),
            "<main data-script=\"{{ script_path }}\"></main>",
        )
        .unwrap();

        let resp = request(&fixture.state, Method::GET, "/").await;
        assert_eq!(body_of(resp).await, "<main data-script=\"/assets/main.js\"></main>");
    }

    #[tokio::test]
    async fn test_broken_layout_is_a_generic_500() {
        let fixture = fixture(QUIET);
        fs::write(skin_dir(&fixture).join(LAYOUT_FILE), "<p>{{ app_title</p>").unwrap();

        let resp = request(&fixture.state, Method::GET, "/").await;
        assert_eq!(resp.status(), 500);
        let body = body_of(resp).await;
        assert_eq!(body, "500 Internal Server Error");
        assert!(!body.contains("layout.html"));
    }

    #[tokio::test]
    async fn test_missing_skin_is_a_500_not_a_crash() {
        let fixture = fixture(&format!("wiki_name: W\nskin: ghost\n{QUIET}"));

        let resp = request(&fixture.state, Method::GET, "/").await;
        assert_eq!(resp.status(), 500);

        let resp = request(&fixture.state, Method::GET, "/skin-assets/style.css").await;
        assert_eq!(resp.status(), 404);

        // Other routes keep working
        let resp = request(&fixture.state, Method::GET, "/config.js").await;
        assert_eq!(resp.status(), 200);
    }

    #[tokio::test]
    async fn test_method_policy() {
        let fixture = fixture(QUIET);

        let resp = request(&fixture.state, Method::POST, "/").await;
        assert_eq!(resp.status(), 405);

        let resp = request(&fixture.state, Method::OPTIONS, "/").await;
        assert_eq!(resp.status(), 204);

        let resp = request(&fixture.state, Method::HEAD, "/assets/main.js").await;
        assert_eq!(resp.status(), 200);
        assert_eq!(resp.headers()["Content-Length"], "19");
        assert!(body_of(resp).await.is_empty());
    }

    #[tokio::test]
    async fn test_spa_mode() {
        let fixture = fixture(&format!("wiki_name: W\nserver:\n  mode: spa\n{QUIET}"));
        assert_eq!(fixture.state.mode(), RouterMode::Spa);

        let resp = request(&fixture.state, Method::GET, "/assets/app.abc123.js").await;
        assert_eq!(body_of(resp).await, "app()");

        for uri in ["/", "/wiki/Page", "/assets/missing.js", "/config.js"] {
            let resp = request(&fixture.state, Method::GET, uri).await;
            assert_eq!(resp.status(), 200, "{uri}");
            assert_eq!(body_of(resp).await, "<html>spa</html>", "{uri}");
        }
    }

    #[tokio::test]
    async fn test_spa_config_mode() {
        let fixture = fixture(&format!("wiki_name: W\nserver:\n  mode: spa_config\n{QUIET}"));

        let resp = request(&fixture.state, Method::GET, "/config.js").await;
        assert!(body_of(resp).await.starts_with("window.__WIKI_CONFIG__"));

        let resp = request(&fixture.state, Method::GET, "/skin-assets/style.css").await;
        assert_eq!(body_of(resp).await, "<html>spa</html>");
    }

    #[tokio::test]
    async fn test_access_log_enabled_path() {
        let fixture = fixture("wiki_name: W\nlogging:\n  access_log: true\n  access_log_format: json\n");
        let resp = request_with(
            &fixture.state,
            Request::builder()
                .uri("/config.js?x=1")
                .header("User-Agent", "test"),
        )
        .await;
        assert_eq!(resp.status(), 200);
    }
}
