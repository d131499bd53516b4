//! Profile row handlers.

use axum::http::StatusCode;
use axum::{
    Extension, Json,
    extract::{Path, State},
};
use repset_core::models::ProfileRecord;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthenticatedUser;

/// `GET /rest/profiles/{id}` — read one profile row.
///
/// Any authenticated caller may read any row; nicknames and avatar
/// addresses are public within the app.
pub async fn get_profile_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<ProfileRecord>> {
    let record = state
        .profiles
        .read_one(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No profile for {id}")))?;
    Ok(Json(record))
}

/// `POST /rest/profiles` — insert a profile row for the caller.
///
/// The row id must match the authenticated subject. A second insert for the
/// same id reports 409 so provisioners can fall back to re-reading.
pub async fn create_profile_handler(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(claims)): Extension<AuthenticatedUser>,
    Json(body): Json<ProfileRecord>,
) -> AppResult<(StatusCode, Json<ProfileRecord>)> {
    if body.id.is_empty() {
        return Err(AppError::Validation("Profile id must not be empty".into()));
    }
    if body.id != claims.sub {
        return Err(AppError::Forbidden(
            "Profiles can only be created for the authenticated subject".into(),
        ));
    }
    if body.nickname.is_empty() {
        return Err(AppError::Validation("Nickname must not be empty".into()));
    }

    state.profiles.insert(&body).await?;
    Ok((StatusCode::CREATED, Json(body)))
}
