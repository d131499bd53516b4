//! End-to-end tests: a memory-backed API server on a loopback port, driven
//! through `ApiClient` by the core session manager, provisioner, and flows.

use std::path::PathBuf;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use repset_api::accounts::MemoryAccountStore;
use repset_api::config::ApiConfig;
use repset_api::services::token::RevocationList;
use repset_api::{AppState, router};
use repset_api_client::ApiClient;
use repset_core::flows::{self, Destination, RecordingNavigator};
use repset_core::memory::{MemoryBlobStore, MemoryProfileStore};
use repset_core::models::{AvatarUpload, NewProfileHints};
use repset_core::provision::{ProfileProvisioner, ProvisionerConfig};
use repset_core::session::SessionManager;
use repset_core::store::{BlobStore, ProfileStore, StoreError};

/// Bind a memory-backed server on an ephemeral port, returning its base URL.
async fn spawn_server() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind loopback");
    let addr = listener.local_addr().expect("local addr");
    let base = format!("http://{addr}");

    let state = AppState {
        accounts: Arc::new(MemoryAccountStore::new()),
        profiles: Arc::new(MemoryProfileStore::new()),
        blobs: Arc::new(MemoryBlobStore::with_public_base(format!("{base}/storage"))),
        revoked: RevocationList::new(),
        config: ApiConfig {
            bind_addr: addr.to_string(),
            pg_connection_url: "postgres://unused".into(),
            jwt_secret: "loopback-test-secret".into(),
            avatar_dir: std::env::temp_dir(),
            public_base: base.clone(),
        },
    };

    tokio::spawn(async move {
        axum::serve(listener, router(state)).await.expect("serve");
    });
    base
}

fn wire_core(client: Arc<ApiClient>) -> (SessionManager, ProfileProvisioner) {
    let session = SessionManager::new(client.clone());
    let provisioner = ProfileProvisioner::new(
        client.clone(),
        client,
        ProvisionerConfig::default(),
    );
    (session, provisioner)
}

fn session_path(dir: &tempfile::TempDir) -> PathBuf {
    dir.path().join("session.json")
}

#[tokio::test]
async fn sign_up_provisions_profile_and_lands_on_dashboard() {
    let base = spawn_server().await;
    let client = Arc::new(ApiClient::new(base.as_str()));
    let (session, provisioner) = wire_core(client.clone());
    let navigator = RecordingNavigator::new();

    let profile = flows::sign_up(
        &session,
        &provisioner,
        navigator.as_ref(),
        "lifter@gym.com",
        "password1",
        "password1",
        NewProfileHints {
            nickname: Some("Lifter".into()),
            avatar: None,
        },
        &CancellationToken::new(),
    )
    .await
    .expect("sign up flow");

    assert_eq!(profile.nickname, "Lifter");
    assert_eq!(profile.avatar_address.as_deref(), Some("/default-avatar.png"));
    assert_eq!(navigator.last(), Some(Destination::Dashboard));
}

#[tokio::test]
async fn avatar_upload_resolves_to_served_bytes() {
    let base = spawn_server().await;
    let client = Arc::new(ApiClient::new(base.as_str()));
    let (session, provisioner) = wire_core(client.clone());
    let navigator = RecordingNavigator::new();

    let profile = flows::sign_up(
        &session,
        &provisioner,
        navigator.as_ref(),
        "lifter@gym.com",
        "password1",
        "password1",
        NewProfileHints {
            nickname: None,
            avatar: Some(AvatarUpload {
                file_name: "me.png".into(),
                bytes: b"pixels".to_vec(),
            }),
        },
        &CancellationToken::new(),
    )
    .await
    .expect("sign up flow");

    // Nickname falls back to the email local part.
    assert_eq!(profile.nickname, "lifter");

    let address = profile.avatar_address.expect("avatar address");
    let id = profile.id;
    assert_eq!(address, format!("{base}/storage/avatars/{id}.png"));

    let bytes = client
        .fetch(&format!("avatars/{id}.png"))
        .await
        .expect("fetch");
    assert_eq!(bytes, Some(b"pixels".to_vec()));
}

#[tokio::test]
async fn persisted_session_survives_a_client_restart() {
    let base = spawn_server().await;
    let dir = tempfile::tempdir().expect("tempdir");

    // First run: sign up with persistence on.
    {
        let client = Arc::new(ApiClient::with_persistence(base.as_str(), session_path(&dir)));
        let (session, provisioner) = wire_core(client);
        let navigator = RecordingNavigator::new();
        flows::sign_up(
            &session,
            &provisioner,
            navigator.as_ref(),
            "lifter@gym.com",
            "password1",
            "password1",
            NewProfileHints {
                nickname: Some("Lifter".into()),
                avatar: None,
            },
            &CancellationToken::new(),
        )
        .await
        .expect("sign up flow");
    }

    // Second run: a fresh client restores the session and finds the
    // existing profile without hints.
    let client = Arc::new(ApiClient::with_persistence(base.as_str(), session_path(&dir)));
    let (session, provisioner) = wire_core(client);
    let navigator = RecordingNavigator::new();

    let profile = flows::bootstrap_dashboard(
        &session,
        &provisioner,
        navigator.as_ref(),
        &CancellationToken::new(),
    )
    .await
    .expect("bootstrap")
    .expect("profile present");

    assert_eq!(profile.nickname, "Lifter");
    assert!(session.snapshot().is_authenticated());
    assert!(navigator.visits().is_empty());
}

#[tokio::test]
async fn sign_out_clears_persistence_and_redirects_to_login() {
    let base = spawn_server().await;
    let dir = tempfile::tempdir().expect("tempdir");

    let client = Arc::new(ApiClient::with_persistence(base.as_str(), session_path(&dir)));
    let (session, provisioner) = wire_core(client);
    let navigator = RecordingNavigator::new();
    flows::sign_up(
        &session,
        &provisioner,
        navigator.as_ref(),
        "lifter@gym.com",
        "password1",
        "password1",
        NewProfileHints {
            nickname: None,
            avatar: None,
        },
        &CancellationToken::new(),
    )
    .await
    .expect("sign up flow");

    flows::sign_out(&session, navigator.as_ref())
        .await
        .expect("sign out flow");
    assert_eq!(navigator.last(), Some(Destination::Login));
    assert!(!session.snapshot().is_authenticated());

    // A restarted client sees no session and bootstraps to login.
    let client = Arc::new(ApiClient::with_persistence(base.as_str(), session_path(&dir)));
    let (session, provisioner) = wire_core(client);
    let navigator = RecordingNavigator::new();
    let profile = flows::bootstrap_dashboard(
        &session,
        &provisioner,
        navigator.as_ref(),
        &CancellationToken::new(),
    )
    .await
    .expect("bootstrap");
    assert!(profile.is_none());
    assert_eq!(navigator.last(), Some(Destination::Login));
}

#[tokio::test]
async fn revoked_token_reads_surface_unauthenticated() {
    let base = spawn_server().await;
    let dir = tempfile::tempdir().expect("tempdir");

    let client = Arc::new(ApiClient::with_persistence(base.as_str(), session_path(&dir)));
    let (session, provisioner) = wire_core(client);
    let navigator = RecordingNavigator::new();
    let profile = flows::sign_up(
        &session,
        &provisioner,
        navigator.as_ref(),
        "lifter@gym.com",
        "password1",
        "password1",
        NewProfileHints {
            nickname: None,
            avatar: None,
        },
        &CancellationToken::new(),
    )
    .await
    .expect("sign up flow");

    // A second client loads the persisted token just before the sign-out
    // revokes it server-side.
    let stale = Arc::new(ApiClient::with_persistence(base.as_str(), session_path(&dir)));
    flows::sign_out(&session, navigator.as_ref())
        .await
        .expect("sign out flow");

    let err = stale.read_one(&profile.id).await.unwrap_err();
    assert!(matches!(err, StoreError::Unauthenticated));
}

#[tokio::test]
async fn wrong_password_fails_the_sign_in_flow() {
    let base = spawn_server().await;
    let client = Arc::new(ApiClient::new(base.as_str()));
    let (session, provisioner) = wire_core(client.clone());
    let navigator = RecordingNavigator::new();

    flows::sign_up(
        &session,
        &provisioner,
        navigator.as_ref(),
        "lifter@gym.com",
        "password1",
        "password1",
        NewProfileHints {
            nickname: None,
            avatar: None,
        },
        &CancellationToken::new(),
    )
    .await
    .expect("sign up flow");
    flows::sign_out(&session, navigator.as_ref())
        .await
        .expect("sign out flow");

    let err = flows::sign_in(
        &session,
        &provisioner,
        navigator.as_ref(),
        "lifter@gym.com",
        "wrong-password",
        &CancellationToken::new(),
    )
    .await
    .unwrap_err();
    assert!(matches!(
        err,
        repset_core::flows::FlowError::Provider(
            repset_core::provider::ProviderError::InvalidCredentials
        )
    ));
    assert_eq!(navigator.last(), Some(Destination::Login));
}
