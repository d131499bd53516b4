//! API server configuration.

use std::path::PathBuf;

use crate::services::token::resolve_jwt_secret;

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Address to bind the HTTP listener (e.g. "127.0.0.1:4600").
    pub bind_addr: String,
    /// PostgreSQL connection URL.
    pub pg_connection_url: String,
    /// JWT signing secret.
    pub jwt_secret: String,
    /// Directory that holds uploaded avatar files.
    pub avatar_dir: PathBuf,
    /// Base URL under which storage keys resolve to public addresses.
    pub public_base: String,
}

impl ApiConfig {
    /// Reads configuration from environment variables with sensible defaults.
    ///
    /// | Variable           | Default                                      |
    /// |--------------------|----------------------------------------------|
    /// | `BIND_ADDR`        | `127.0.0.1:4600`                             |
    /// | `DATABASE_URL`     | `postgres://localhost:5432/repset`           |
    /// | `JWT_SECRET` / `AUTH_SECRET` | generated & persisted to file      |
    /// | `AVATAR_DIR`       | `<data dir>/repset/avatars`                  |
    /// | `PUBLIC_BASE`      | `http://<BIND_ADDR>`                         |
    pub fn from_env() -> Self {
        let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:4600".into());
        let public_base =
            std::env::var("PUBLIC_BASE").unwrap_or_else(|_| format!("http://{bind_addr}"));
        Self {
            bind_addr,
            pg_connection_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://localhost:5432/repset".into()),
            jwt_secret: resolve_jwt_secret(),
            avatar_dir: std::env::var("AVATAR_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| default_avatar_dir()),
            public_base,
        }
    }
}

fn default_avatar_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("repset")
        .join("avatars")
}
