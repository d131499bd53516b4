//! Authentication request handlers.

use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum::{Extension, Json, extract::State};

use crate::AppState;
use crate::error::AppResult;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{
    IdentityBody, LoginRequest, LogoutResponse, SessionResponse, SignupRequest, TokenResponse,
};
use crate::services::auth;

/// `POST /auth/signup` — create a new account and sign it in.
pub async fn signup_handler(
    State(state): State<AppState>,
    Json(body): Json<SignupRequest>,
) -> AppResult<Json<TokenResponse>> {
    let resp = auth::signup(
        state.accounts.as_ref(),
        &body.email,
        &body.password,
        state.config.jwt_secret.as_bytes(),
    )
    .await?;
    Ok(Json(resp))
}

/// `POST /auth/login` — authenticate with email + password.
pub async fn login_handler(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> AppResult<Json<TokenResponse>> {
    let resp = auth::login(
        state.accounts.as_ref(),
        &body.email,
        &body.password,
        state.config.jwt_secret.as_bytes(),
    )
    .await?;
    Ok(Json(resp))
}

/// `POST /auth/logout` — revoke the presented access token. Requires
/// authentication, so the token is known to be present and valid.
pub async fn logout_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<Json<LogoutResponse>> {
    if let Some(token) = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
    {
        state.revoked.revoke(token);
    }
    Ok(Json(LogoutResponse { success: true }))
}

/// `GET /auth/session` — identity behind the presented token.
pub async fn session_handler(
    Extension(AuthenticatedUser(claims)): Extension<AuthenticatedUser>,
) -> AppResult<Json<SessionResponse>> {
    Ok(Json(SessionResponse {
        identity: IdentityBody {
            id: claims.sub,
            email: claims.email,
        },
    }))
}
