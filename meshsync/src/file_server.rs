use std::path::{Component, Path, PathBuf};

use axum::body::Body;
use axum::extract::{Path as AxumPath, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use tracing::{info, warn};

/// Exposes the managed root read-only over HTTP: `GET /<relative-path>`
/// returns the file's bytes verbatim (§4.E, §9 Open Question — binary-safe,
/// never treated as text). No directory listing, no range support.
#[derive(Debug, Clone)]
struct ServerState {
    managed_root: PathBuf,
}

pub fn router(managed_root: PathBuf) -> Router {
    Router::new()
        .route("/{*path}", get(serve_file))
        .with_state(ServerState { managed_root })
}

async fn serve_file(
    State(state): State<ServerState>,
    AxumPath(requested): AxumPath<String>,
) -> Result<Response, StatusCode> {
    let Some(target) = resolve(&state.managed_root, &requested) else {
        warn!(path = %requested, "rejected path escaping the managed root");
        return Err(StatusCode::NOT_FOUND);
    };

    match tokio::fs::read(&target).await {
        Ok(bytes) => {
            info!(path = %requested, bytes = bytes.len(), "served file");
            Ok(Response::builder()
                .status(StatusCode::OK)
                .body(Body::from(bytes))
                .expect("response with a fixed status and body never fails to build"))
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Err(StatusCode::NOT_FOUND),
        Err(err) => {
            warn!(path = %requested, %err, "failed reading file for peer pull");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Joins `requested` onto `managed_root`, rejecting any path that would
/// escape it (`..` components, absolute paths) or resolve to a directory.
fn resolve(managed_root: &Path, requested: &str) -> Option<PathBuf> {
    let requested = requested.trim_start_matches('/');
    let candidate = Path::new(requested);
    if candidate
        .components()
        .any(|c| !matches!(c, Component::Normal(_)))
    {
        return None;
    }
    Some(managed_root.join(candidate))
}
