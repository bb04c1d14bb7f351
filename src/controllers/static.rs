use crate::AppContext;
use axum::{
    extract::Path,
    http::{header, HeaderValue, StatusCode},
    response::IntoResponse,
    Extension,
};
use std::{
    fs,
    path::{Component, Path as FsPath, PathBuf},
    sync::Arc,
};
use tracing as log;

fn content_type_for(path: &FsPath) -> HeaderValue {
    HeaderValue::from_static(match path.extension().and_then(|s| s.to_str()) {
        Some("css") => "text/css",
        Some("js") => "text/javascript",
        Some("html") | Some("htm") => "text/html",
        _ => "text/plain",
    })
}

/// Resolves a request path inside `root`, refusing anything that could escape it.
fn resolve(root: &FsPath, requested: &str) -> Option<PathBuf> {
    let requested = FsPath::new(requested.trim_start_matches('/'));
    if requested
        .components()
        .any(|c| !matches!(c, Component::Normal(_)))
    {
        return None;
    }
    Some(root.join(requested))
}

/// Serves the stylesheet and other assets out of the static directory.
pub(crate) async fn get(
    Path(path): Path<String>,
    Extension(ctx): Extension<Arc<AppContext>>,
) -> Result<impl IntoResponse, StatusCode> {
    let path = resolve(&ctx.config.static_dir, &path).ok_or(StatusCode::NOT_FOUND)?;
    if !path.is_file() {
        return Err(StatusCode::NOT_FOUND);
    }

    // Assets are all text.
    let content = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(err) => {
            log::error!("unable to read file @ {path:?}: {err}");
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    Ok(([(header::CONTENT_TYPE, content_type_for(&path))], content))
}
