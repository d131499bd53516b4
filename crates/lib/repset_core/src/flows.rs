//! View-facing flows.
//!
//! The consistent, step-ordered versions of the login / sign-up / dashboard
//! sequences: authenticate first, provision second, navigate only on
//! unambiguous success. Each flow takes a [`CancellationToken`]; a consumer
//! that goes away mid-flight cancels it, and the flow then discards the
//! async result instead of navigating or reporting success.

use std::sync::Arc;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::models::{NewProfileHints, Profile};
use crate::provider::ProviderError;
use crate::provision::{ProfileProvisioner, ProvisionError};
use crate::session::SessionManager;
use crate::workouts::WorkoutKind;

/// Logical destinations; a navigation collaborator maps them to screens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    Login,
    Dashboard,
    Workout(WorkoutKind),
}

/// Fire-and-forget navigation service.
pub trait Navigator: Send + Sync {
    fn go_to(&self, destination: Destination);
}

/// Failures surfaced to the view layer, shown as a message near the form.
#[derive(Debug, Clone, Error)]
pub enum FlowError {
    #[error("Passwords do not match")]
    PasswordMismatch,

    #[error("Not signed in")]
    Unauthenticated,

    /// The consumer went away; the result was discarded.
    #[error("Cancelled")]
    Cancelled,

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Provision(ProvisionError),
}

impl From<ProvisionError> for FlowError {
    fn from(err: ProvisionError) -> Self {
        match err {
            // A backend that stops honoring the token mid-flow is a
            // sign-in problem, not a provisioning one.
            ProvisionError::Unauthenticated => FlowError::Unauthenticated,
            other => FlowError::Provision(other),
        }
    }
}

/// Sign in and resolve the existing profile, then navigate to the
/// dashboard.
///
/// No hints are passed: a missing profile for an established account is a
/// data-integrity problem and surfaces as `NotFound` instead of being
/// silently papered over.
pub async fn sign_in(
    session: &SessionManager,
    provisioner: &ProfileProvisioner,
    navigator: &dyn Navigator,
    email: &str,
    password: &str,
    cancel: &CancellationToken,
) -> Result<Profile, FlowError> {
    let provider = session.provider();
    let identity = provider.sign_in(email, password).await?;
    if cancel.is_cancelled() {
        return Err(FlowError::Cancelled);
    }

    let profile = provisioner.ensure_profile(&identity, None).await?;
    if cancel.is_cancelled() {
        return Err(FlowError::Cancelled);
    }

    info!(id = %identity.id, "signed in");
    navigator.go_to(Destination::Dashboard);
    Ok(profile)
}

/// Create an account, provision its profile from the sign-up hints, and
/// navigate to the dashboard.
#[allow(clippy::too_many_arguments)]
pub async fn sign_up(
    session: &SessionManager,
    provisioner: &ProfileProvisioner,
    navigator: &dyn Navigator,
    email: &str,
    password: &str,
    confirm_password: &str,
    hints: NewProfileHints,
    cancel: &CancellationToken,
) -> Result<Profile, FlowError> {
    if password != confirm_password {
        return Err(FlowError::PasswordMismatch);
    }

    let provider = session.provider();
    let identity = provider.sign_up(email, password).await?;
    if cancel.is_cancelled() {
        return Err(FlowError::Cancelled);
    }

    let profile = provisioner.ensure_profile(&identity, Some(hints)).await?;
    if cancel.is_cancelled() {
        return Err(FlowError::Cancelled);
    }

    info!(id = %identity.id, "account created and provisioned");
    navigator.go_to(Destination::Dashboard);
    Ok(profile)
}

/// Resolve what the dashboard should show.
///
/// An anonymous session redirects to login and yields nothing; an
/// authenticated one resolves the profile for display.
pub async fn bootstrap_dashboard(
    session: &SessionManager,
    provisioner: &ProfileProvisioner,
    navigator: &dyn Navigator,
    cancel: &CancellationToken,
) -> Result<Option<Profile>, FlowError> {
    session.initialize().await;
    if cancel.is_cancelled() {
        return Err(FlowError::Cancelled);
    }

    let snapshot = session.snapshot();
    let Some(identity) = snapshot.identity else {
        navigator.go_to(Destination::Login);
        return Ok(None);
    };

    let profile = provisioner.ensure_profile(&identity, None).await?;
    if cancel.is_cancelled() {
        return Err(FlowError::Cancelled);
    }
    Ok(Some(profile))
}

/// Sign out and return to the login screen. Navigation only happens once
/// the provider confirms the invalidation.
pub async fn sign_out(
    session: &SessionManager,
    navigator: &dyn Navigator,
) -> Result<(), FlowError> {
    session.sign_out().await?;
    navigator.go_to(Destination::Login);
    Ok(())
}

/// Recorded destinations, for tests and the terminal frontend.
#[derive(Default)]
pub struct RecordingNavigator {
    visits: std::sync::Mutex<Vec<Destination>>,
}

impl RecordingNavigator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn visits(&self) -> Vec<Destination> {
        self.visits.lock().expect("navigator poisoned").clone()
    }

    pub fn last(&self) -> Option<Destination> {
        self.visits().last().copied()
    }
}

impl Navigator for RecordingNavigator {
    fn go_to(&self, destination: Destination) {
        self.visits
            .lock()
            .expect("navigator poisoned")
            .push(destination);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryBlobStore, MemoryIdentityProvider, MemoryProfileStore};
    use crate::models::Identity;
    use crate::provider::IdentityProvider;
    use crate::provision::ProvisionerConfig;
    use crate::store::{BlobStore, ProfileStore, StoreError};

    struct Fixture {
        provider: Arc<MemoryIdentityProvider>,
        profiles: Arc<MemoryProfileStore>,
        session: SessionManager,
        provisioner: ProfileProvisioner,
        navigator: Arc<RecordingNavigator>,
    }

    fn fixture() -> Fixture {
        let provider = Arc::new(MemoryIdentityProvider::new());
        let profiles = Arc::new(MemoryProfileStore::new());
        let blobs = Arc::new(MemoryBlobStore::with_public_base("http://localhost/storage"));
        let session = SessionManager::new(Arc::clone(&provider) as Arc<dyn IdentityProvider>);
        let provisioner = ProfileProvisioner::new(
            Arc::clone(&profiles) as Arc<dyn ProfileStore>,
            blobs as Arc<dyn BlobStore>,
            ProvisionerConfig::default(),
        );
        Fixture {
            provider,
            profiles,
            session,
            provisioner,
            navigator: RecordingNavigator::new(),
        }
    }

    #[tokio::test]
    async fn sign_up_provisions_and_lands_on_the_dashboard() {
        let fx = fixture();
        fx.session.initialize().await;

        let profile = sign_up(
            &fx.session,
            &fx.provisioner,
            fx.navigator.as_ref(),
            "a@b.com",
            "secret",
            "secret",
            NewProfileHints::default(),
            &CancellationToken::new(),
        )
        .await
        .expect("sign up");

        assert_eq!(profile.nickname, "a");
        assert_eq!(profile.avatar_address.as_deref(), Some("/default-avatar.png"));
        assert_eq!(fx.navigator.last(), Some(Destination::Dashboard));
    }

    #[tokio::test]
    async fn mismatched_passwords_never_reach_the_provider() {
        let fx = fixture();
        let err = sign_up(
            &fx.session,
            &fx.provisioner,
            fx.navigator.as_ref(),
            "a@b.com",
            "secret",
            "other",
            NewProfileHints::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, FlowError::PasswordMismatch));
        assert!(fx.navigator.visits().is_empty());
        assert!(
            fx.provider.current_identity().await.expect("query").is_none(),
            "no account may be created"
        );
    }

    #[tokio::test]
    async fn sign_in_for_an_unprovisioned_account_surfaces_not_found() {
        let fx = fixture();
        fx.provider.register("a@b.com", "secret");

        let err = sign_in(
            &fx.session,
            &fx.provisioner,
            fx.navigator.as_ref(),
            "a@b.com",
            "secret",
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, FlowError::Provision(ProvisionError::NotFound)));
        assert!(fx.navigator.visits().is_empty(), "no navigation on failure");
    }

    #[tokio::test]
    async fn sign_in_resolves_the_existing_profile() {
        let fx = fixture();
        let identity = fx.provider.register("a@b.com", "secret");
        fx.provisioner
            .ensure_profile(&identity, Some(NewProfileHints::default()))
            .await
            .expect("seed profile");

        let profile = sign_in(
            &fx.session,
            &fx.provisioner,
            fx.navigator.as_ref(),
            "a@b.com",
            "secret",
            &CancellationToken::new(),
        )
        .await
        .expect("sign in");

        assert_eq!(profile.nickname, "a");
        assert_eq!(fx.navigator.last(), Some(Destination::Dashboard));
    }

    #[tokio::test]
    async fn cancelled_flow_discards_its_result() {
        let fx = fixture();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = sign_up(
            &fx.session,
            &fx.provisioner,
            fx.navigator.as_ref(),
            "a@b.com",
            "secret",
            "secret",
            NewProfileHints::default(),
            &cancel,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, FlowError::Cancelled));
        assert!(fx.navigator.visits().is_empty(), "no navigation after teardown");
    }

    #[tokio::test]
    async fn cancelled_dashboard_bootstrap_never_navigates() {
        let fx = fixture();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = bootstrap_dashboard(
            &fx.session,
            &fx.provisioner,
            fx.navigator.as_ref(),
            &cancel,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, FlowError::Cancelled));
        assert!(
            fx.navigator.visits().is_empty(),
            "no login redirect after teardown"
        );
    }

    #[tokio::test]
    async fn anonymous_dashboard_redirects_to_login() {
        let fx = fixture();

        let shown = bootstrap_dashboard(
            &fx.session,
            &fx.provisioner,
            fx.navigator.as_ref(),
            &CancellationToken::new(),
        )
        .await
        .expect("bootstrap");

        assert!(shown.is_none());
        assert_eq!(fx.navigator.last(), Some(Destination::Login));
    }

    #[tokio::test]
    async fn authenticated_dashboard_shows_the_profile() {
        let fx = fixture();
        let identity = fx.provider.sign_up("a@b.com", "secret").await.expect("sign up");
        fx.provisioner
            .ensure_profile(&identity, Some(NewProfileHints::default()))
            .await
            .expect("seed profile");

        let shown = bootstrap_dashboard(
            &fx.session,
            &fx.provisioner,
            fx.navigator.as_ref(),
            &CancellationToken::new(),
        )
        .await
        .expect("bootstrap")
        .expect("profile");

        assert_eq!(shown.nickname, "a");
    }

    /// Store whose backing session was revoked behind the client's back.
    struct DeadSessionStore;

    #[async_trait::async_trait]
    impl ProfileStore for DeadSessionStore {
        async fn read_one(
            &self,
            _: &str,
        ) -> Result<Option<crate::models::ProfileRecord>, StoreError> {
            Err(StoreError::Unauthenticated)
        }

        async fn insert(&self, _: &crate::models::ProfileRecord) -> Result<(), StoreError> {
            Err(StoreError::Unauthenticated)
        }
    }

    #[tokio::test]
    async fn revoked_backend_session_surfaces_unauthenticated() {
        let provider = Arc::new(MemoryIdentityProvider::new());
        provider.sign_up("a@b.com", "secret").await.expect("sign up");
        let session = SessionManager::new(Arc::clone(&provider) as Arc<dyn IdentityProvider>);
        let provisioner = ProfileProvisioner::new(
            Arc::new(DeadSessionStore) as Arc<dyn ProfileStore>,
            Arc::new(MemoryBlobStore::new()) as Arc<dyn BlobStore>,
            ProvisionerConfig::default(),
        );
        let navigator = RecordingNavigator::new();

        let err = bootstrap_dashboard(
            &session,
            &provisioner,
            navigator.as_ref(),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, FlowError::Unauthenticated));
        assert!(navigator.visits().is_empty(), "no navigation on failure");
    }

    #[tokio::test]
    async fn sign_out_navigates_back_to_login() {
        let fx = fixture();
        fx.provider.sign_up("a@b.com", "secret").await.expect("sign up");
        fx.session.initialize().await;

        sign_out(&fx.session, fx.navigator.as_ref())
            .await
            .expect("sign out");

        assert!(fx.session.snapshot().identity.is_none());
        assert_eq!(fx.navigator.last(), Some(Destination::Login));
    }

    #[tokio::test]
    async fn in_flight_provisioning_does_not_reauthenticate_after_sign_out() {
        let fx = fixture();
        let identity = fx.provider.sign_up("a@b.com", "secret").await.expect("sign up");
        fx.session.initialize().await;

        // The provisioning call is "in flight" while the user signs out.
        let provisioning = fx
            .provisioner
            .ensure_profile(&identity, Some(NewProfileHints::default()));
        fx.session.sign_out().await.expect("sign out");

        let profile = provisioning.await.expect("provisioning still completes");
        assert_eq!(profile.id, identity.id);

        // The resolved profile must not flip the session back.
        let snapshot = fx.session.snapshot();
        assert!(snapshot.identity.is_none());
        assert!(!snapshot.is_loading);
    }

    #[tokio::test]
    async fn seeded_profile_row_for_other_identity_is_untouched() {
        let fx = fixture();
        fx.profiles
            .insert(&crate::models::ProfileRecord {
                id: "other".into(),
                nickname: "o".into(),
                avatar_address: None,
            })
            .await
            .expect("seed");

        let _ = sign_up(
            &fx.session,
            &fx.provisioner,
            fx.navigator.as_ref(),
            "a@b.com",
            "secret",
            "secret",
            NewProfileHints::default(),
            &CancellationToken::new(),
        )
        .await
        .expect("sign up");

        assert_eq!(fx.profiles.len(), 2);
        let other = fx
            .profiles
            .read_one("other")
            .await
            .expect("read")
            .expect("row");
        assert_eq!(other.nickname, "o");
        assert_eq!(
            fx.provisioner
                .ensure_profile(&Identity::new("other", "o@b.com"), None)
                .await
                .expect("read other")
                .nickname,
            "o"
        );
    }
}
