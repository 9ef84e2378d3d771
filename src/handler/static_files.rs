//! Static file serving module
//!
//! Two sources: the in-memory build bundle and the active skin directory on
//! disk. Neither lists directories; anything that is not a regular file is a
//! 404.

use crate::assets::AssetBundle;
use crate::handler::router::RequestContext;
use crate::http::{self, cache, mime, CachePolicy};
use crate::logger;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::Response;
use std::path::Path;
use tokio::fs;

/// Entry document of the bundle in the SPA modes
pub const INDEX_FILE: &str = "index.html";

/// Serve `key` from the build bundle
pub fn serve_bundle_file(
    ctx: &RequestContext<'_>,
    bundle: &AssetBundle,
    key: &str,
) -> Response<Full<Bytes>> {
    match bundle.get(key) {
        Some(data) => build_static_file_response(
            ctx,
            data.clone(),
            mime::content_type_for(key),
            bundle_policy(key),
        ),
        None => http::build_404_response(),
    }
}

/// Serve `relative` from the skin directory, re-read on every request
pub async fn serve_skin_file(
    ctx: &RequestContext<'_>,
    skin_dir: &Path,
    relative: &str,
) -> Response<Full<Bytes>> {
    match load_from_directory(skin_dir, relative).await {
        Some((content, content_type)) => build_static_file_response(
            ctx,
            Bytes::from(content),
            content_type,
            CachePolicy::NoCache,
        ),
        None => http::build_404_response(),
    }
}

/// Cache policy for a bundle key
///
/// Files under `assets/` carry a content hash in their name; `index.html` is
/// the one file whose name stays put across builds.
fn bundle_policy(key: &str) -> CachePolicy {
    let key = key.trim_start_matches('/');
    if key.starts_with("assets/") {
        CachePolicy::Immutable
    } else if key == INDEX_FILE {
        CachePolicy::NoCache
    } else {
        CachePolicy::default()
    }
}

/// Load a regular file from `dir`, refusing anything that resolves outside it
pub async fn load_from_directory(dir: &Path, relative: &str) -> Option<(Vec<u8>, &'static str)> {
    let relative = relative.trim_start_matches('/');
    if relative.is_empty()
        || relative.contains('\\')
        || relative.split('/').any(|segment| segment == "..")
    {
        return None;
    }

    let dir_canonical = match fs::canonicalize(dir).await {
        Ok(p) => p,
        Err(e) => {
            logger::log_warning(&format!(
                "Skin directory not found or inaccessible '{}': {e}",
                dir.display()
            ));
            return None;
        }
    };

    // File not found is common (404), no need to log at warning level
    let file_canonical = fs::canonicalize(dir.join(relative)).await.ok()?;
    if !file_canonical.starts_with(&dir_canonical) {
        logger::log_warning(&format!(
            "Path traversal attempt blocked: {relative} -> {}",
            file_canonical.display()
        ));
        return None;
    }

    if !fs::metadata(&file_canonical).await.ok()?.is_file() {
        return None;
    }

    let content = match fs::read(&file_canonical).await {
        Ok(c) => c,
        Err(e) => {
            logger::log_error(&format!(
                "Failed to read file '{}': {e}",
                file_canonical.display()
            ));
            return None;
        }
    };

    Some((content, mime::content_type_for(relative)))
}

/// Build static file response with `ETag` support
pub fn build_static_file_response(
    ctx: &RequestContext<'_>,
    data: Bytes,
    content_type: &str,
    policy: CachePolicy,
) -> Response<Full<Bytes>> {
    let etag = cache::generate_etag(&data);

    if cache::check_etag_match(ctx.if_none_match.as_deref(), &etag) {
        return http::build_304_response(&etag, policy);
    }

    http::build_cached_response(data, content_type, &etag, policy, ctx.is_head)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs as std_fs;

    #[test]
    fn test_bundle_policy() {
        assert_eq!(bundle_policy("assets/app.abc123.js"), CachePolicy::Immutable);
        assert_eq!(bundle_policy("index.html"), CachePolicy::NoCache);
        assert_eq!(bundle_policy("favicon.ico"), CachePolicy::Public(3600));
    }

    #[tokio::test]
    async fn test_load_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std_fs::create_dir_all(dir.path().join("img")).unwrap();
        std_fs::write(dir.path().join("style.css"), "body{}").unwrap();
        std_fs::write(dir.path().join("img/logo.svg"), "<svg/>").unwrap();

        let (content, content_type) = load_from_directory(dir.path(), "style.css").await.unwrap();
        assert_eq!(content, b"body{}");
        assert_eq!(content_type, "text/css; charset=utf-8");

        assert!(load_from_directory(dir.path(), "img/logo.svg").await.is_some());
        assert!(load_from_directory(dir.path(), "missing.css").await.is_none());
    }

    #[tokio::test]
    async fn test_load_from_directory_refuses_directories_and_traversal() {
        let root = tempfile::tempdir().unwrap();
        let skin = root.path().join("skin");
        std_fs::create_dir_all(skin.join("img")).unwrap();
        std_fs::write(root.path().join("secret.txt"), "secret").unwrap();

        assert!(load_from_directory(&skin, "").await.is_none());
        assert!(load_from_directory(&skin, "img").await.is_none());
        assert!(load_from_directory(&skin, "../secret.txt").await.is_none());
        assert!(load_from_directory(&skin, "img/../../secret.txt").await.is_none());
    }

    #[tokio::test]
    async fn test_load_from_missing_directory() {
        let root = tempfile::tempdir().unwrap();
        assert!(load_from_directory(&root.path().join("nope"), "style.css")
            .await
            .is_none());
    }
}
