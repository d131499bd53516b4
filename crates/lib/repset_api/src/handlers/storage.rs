//! Avatar blob handlers.
//!
//! Keys live under the `avatars/` prefix. Uploads are upserts: re-uploading
//! a key replaces the bytes in place.

use axum::body::Bytes;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::{
    Extension, Json,
    extract::{Path, State},
};
use serde::Serialize;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthenticatedUser;

/// Avatars larger than this are rejected outright.
const MAX_AVATAR_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    /// Storage key the bytes landed under.
    pub key: String,
    /// Public address for the key, when the deployment exposes one.
    pub address: Option<String>,
}

/// File names own the caller's id: `{sub}` or `{sub}.{ext}`.
fn owns_file(sub: &str, file: &str) -> bool {
    match file.strip_prefix(sub) {
        Some("") => true,
        Some(rest) => rest.starts_with('.'),
        None => false,
    }
}

/// `PUT /storage/avatars/{file}` — upsert the caller's avatar bytes.
pub async fn put_avatar_handler(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(claims)): Extension<AuthenticatedUser>,
    Path(file): Path<String>,
    body: Bytes,
) -> AppResult<(StatusCode, Json<UploadResponse>)> {
    if file.is_empty() || file.contains('/') || file.contains("..") {
        return Err(AppError::Validation("Invalid avatar file name".into()));
    }
    if !owns_file(&claims.sub, &file) {
        return Err(AppError::Forbidden(
            "Avatars can only be uploaded under the authenticated subject's id".into(),
        ));
    }
    if body.is_empty() {
        return Err(AppError::Validation("Avatar upload is empty".into()));
    }
    if body.len() > MAX_AVATAR_BYTES {
        return Err(AppError::Validation("Avatar exceeds 5 MiB".into()));
    }

    let key = format!("avatars/{file}");
    state.blobs.upload(&key, &body).await?;
    let address = state.blobs.public_address(&key).await?;
    Ok((StatusCode::OK, Json(UploadResponse { key, address })))
}

/// `GET /storage/avatars/{file}` — serve avatar bytes. Public: avatar
/// addresses are embedded in pages without credentials.
pub async fn get_avatar_handler(
    State(state): State<AppState>,
    Path(file): Path<String>,
) -> AppResult<Response> {
    if file.is_empty() || file.contains('/') || file.contains("..") {
        return Err(AppError::Validation("Invalid avatar file name".into()));
    }

    let key = format!("avatars/{file}");
    let bytes = state
        .blobs
        .fetch(&key)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No avatar at {key}")))?;

    let content_type = content_type_for(&file);
    Ok(([(header::CONTENT_TYPE, content_type)], bytes).into_response())
}

fn content_type_for(file: &str) -> &'static str {
    match file.rsplit_once('.').map(|(_, ext)| ext) {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("svg") => "image/svg+xml",
        _ => "application/octet-stream",
    }
}
