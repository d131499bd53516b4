//! # repset_api
//!
//! HTTP API library for Repset: identity, profile rows, avatar storage, and
//! the workout catalog. The router speaks the wire surface the client crate
//! consumes; storage backends are trait objects so tests and the server's
//! memory mode run without PostgreSQL or a filesystem root.

pub mod accounts;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod store;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post, put};
use repset_core::store::{BlobStore, ProfileStore};
use sqlx::PgPool;
use tower_http::cors::{Any, CorsLayer};

use crate::accounts::AccountStore;
use crate::config::ApiConfig;
use crate::handlers::{auth, health, profiles, storage, workouts};
use crate::services::token::RevocationList;

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Credential records.
    pub accounts: Arc<dyn AccountStore>,
    /// Profile rows.
    pub profiles: Arc<dyn ProfileStore>,
    /// Avatar bytes.
    pub blobs: Arc<dyn BlobStore>,
    /// Access tokens revoked by logout.
    pub revoked: RevocationList,
    /// API configuration.
    pub config: ApiConfig,
}

/// Run embedded database migrations.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

/// Builds the Axum router with all routes and shared state.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Public routes (no auth required)
    let public = Router::new()
        .route("/health", get(health::health_handler))
        .route("/auth/signup", post(auth::signup_handler))
        .route("/auth/login", post(auth::login_handler))
        .route("/storage/avatars/{file}", get(storage::get_avatar_handler));

    // Protected routes (require auth)
    let protected = Router::new()
        .route("/auth/logout", post(auth::logout_handler))
        .route("/auth/session", get(auth::session_handler))
        .route("/rest/profiles/{id}", get(profiles::get_profile_handler))
        .route("/rest/profiles", post(profiles::create_profile_handler))
        .route("/storage/avatars/{file}", put(storage::put_avatar_handler))
        .route("/workouts", get(workouts::list_workouts_handler))
        .route("/workouts/{kind}", get(workouts::get_workout_handler))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_auth,
        ));

    Router::new()
        .merge(public)
        .merge(protected)
        .layer(cors)
        .with_state(state)
}
