//! Session bootstrap and change propagation.
//!
//! One [`SessionManager`] lives for the process lifetime. It initializes the
//! session once from the identity provider, listens for provider change
//! events, and fans immutable snapshots out to subscribers. Consumers never
//! poll the provider themselves.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};

use tokio::sync::OnceCell;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use crate::models::{Identity, SessionSnapshot};
use crate::provider::{IdentityProvider, ProviderError, SessionChange};

/// Lifecycle of the cached session state.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Phase {
    Uninitialized,
    Loading,
    Authenticated(Identity),
    Anonymous,
}

type Listener = dyn Fn(&SessionSnapshot) + Send + Sync;

struct Inner {
    phase: Phase,
    next_listener: u64,
    listeners: HashMap<u64, Arc<Listener>>,
}

struct Shared {
    inner: Mutex<Inner>,
}

impl Shared {
    fn snapshot_locked(inner: &Inner) -> SessionSnapshot {
        match &inner.phase {
            Phase::Uninitialized | Phase::Loading => SessionSnapshot {
                identity: None,
                is_loading: true,
            },
            Phase::Authenticated(identity) => SessionSnapshot {
                identity: Some(identity.clone()),
                is_loading: false,
            },
            Phase::Anonymous => SessionSnapshot {
                identity: None,
                is_loading: false,
            },
        }
    }

    /// Apply a new phase last-write-wins and notify subscribers outside the
    /// lock. Identical consecutive states are not re-announced.
    fn apply(&self, phase: Phase) {
        let (snapshot, listeners) = {
            let mut inner = self.inner.lock().expect("session state poisoned");
            if inner.phase == phase {
                return;
            }
            inner.phase = phase;
            let snapshot = Self::snapshot_locked(&inner);
            let listeners: Vec<Arc<Listener>> = inner.listeners.values().cloned().collect();
            (snapshot, listeners)
        };
        for listener in listeners {
            listener(&snapshot);
        }
    }
}

/// Guard for a session subscription. Dropping it (or calling
/// [`SessionSubscription::dispose`]) guarantees the callback is never
/// invoked again.
pub struct SessionSubscription {
    shared: Weak<Shared>,
    id: u64,
}

impl SessionSubscription {
    /// Explicitly unregister. Equivalent to dropping the guard.
    pub fn dispose(self) {}
}

impl Drop for SessionSubscription {
    fn drop(&mut self) {
        if let Some(shared) = self.shared.upgrade() {
            let mut inner = shared.inner.lock().expect("session state poisoned");
            inner.listeners.remove(&self.id);
        }
    }
}

/// Authoritative view of "who is currently authenticated".
pub struct SessionManager {
    provider: Arc<dyn IdentityProvider>,
    shared: Arc<Shared>,
    init: OnceCell<()>,
}

impl SessionManager {
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        Self {
            provider,
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner {
                    phase: Phase::Uninitialized,
                    next_listener: 0,
                    listeners: HashMap::new(),
                }),
            }),
            init: OnceCell::new(),
        }
    }

    /// The provider this manager was built around, for flows that need the
    /// sign-in / sign-up operations.
    pub fn provider(&self) -> Arc<dyn IdentityProvider> {
        Arc::clone(&self.provider)
    }

    /// Query the provider once for an existing session and start listening
    /// for change events.
    ///
    /// Always leaves `is_loading == false`. Provider errors are logged and
    /// resolve to the anonymous state; bootstrap runs before any consumer
    /// can handle an error, so none is surfaced. Safe to call repeatedly:
    /// later calls await the first and never duplicate the subscription.
    pub async fn initialize(&self) {
        self.init
            .get_or_init(|| async {
                self.shared.apply(Phase::Loading);

                let phase = match self.provider.current_identity().await {
                    Ok(Some(identity)) => Phase::Authenticated(identity),
                    Ok(None) => Phase::Anonymous,
                    Err(err) => {
                        warn!(error = %err, "session bootstrap failed, treating as signed out");
                        Phase::Anonymous
                    }
                };

                // Subscribe before publishing the resolved state so no
                // change event can slip between the two, and publish
                // before draining the subscription so a concurrent event
                // is never overwritten by the stale bootstrap result.
                let mut rx = self.provider.changes();
                self.shared.apply(phase);

                let weak = Arc::downgrade(&self.shared);
                tokio::spawn(async move {
                    loop {
                        match rx.recv().await {
                            Ok(change) => {
                                let Some(shared) = weak.upgrade() else { break };
                                shared.apply(phase_for(change));
                            }
                            Err(RecvError::Lagged(skipped)) => {
                                // Last-write-wins: the next event carries the
                                // freshest state anyway.
                                debug!(skipped, "session change receiver lagged");
                            }
                            Err(RecvError::Closed) => break,
                        }
                    }
                });
            })
            .await;
    }

    /// The current state. `is_loading` stays true until [`initialize`]
    /// completes.
    ///
    /// [`initialize`]: SessionManager::initialize
    pub fn snapshot(&self) -> SessionSnapshot {
        let inner = self.shared.inner.lock().expect("session state poisoned");
        Shared::snapshot_locked(&inner)
    }

    /// Register `on_change`, invoked with a fresh snapshot on every state
    /// change until the returned guard is dropped.
    pub fn subscribe(
        &self,
        on_change: impl Fn(&SessionSnapshot) + Send + Sync + 'static,
    ) -> SessionSubscription {
        let mut inner = self.shared.inner.lock().expect("session state poisoned");
        let id = inner.next_listener;
        inner.next_listener += 1;
        inner.listeners.insert(id, Arc::new(on_change));
        SessionSubscription {
            shared: Arc::downgrade(&self.shared),
            id,
        }
    }

    /// Ask the provider to invalidate the session.
    ///
    /// Local state moves to anonymous only on confirmed success; on failure
    /// the cached identity is left untouched and the error is surfaced.
    pub async fn sign_out(&self) -> Result<(), ProviderError> {
        self.provider.sign_out().await?;
        self.shared.apply(Phase::Anonymous);
        Ok(())
    }
}

fn phase_for(change: SessionChange) -> Phase {
    match change {
        Some(identity) => Phase::Authenticated(identity),
        None => Phase::Anonymous,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryIdentityProvider;
    use crate::models::Identity;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;
    use tokio::sync::{broadcast, mpsc};
    use tokio::time::timeout;

    /// Provider whose bootstrap query always fails.
    struct BrokenProvider {
        tx: broadcast::Sender<SessionChange>,
    }

    impl BrokenProvider {
        fn new() -> Self {
            let (tx, _) = broadcast::channel(4);
            Self { tx }
        }
    }

    #[async_trait]
    impl IdentityProvider for BrokenProvider {
        async fn current_identity(&self) -> Result<Option<Identity>, ProviderError> {
            Err(ProviderError::Transient("boom".into()))
        }

        fn changes(&self) -> broadcast::Receiver<SessionChange> {
            self.tx.subscribe()
        }

        async fn sign_in(&self, _: &str, _: &str) -> Result<Identity, ProviderError> {
            Err(ProviderError::InvalidCredentials)
        }

        async fn sign_up(&self, _: &str, _: &str) -> Result<Identity, ProviderError> {
            Err(ProviderError::Transient("boom".into()))
        }

        async fn sign_out(&self) -> Result<(), ProviderError> {
            Ok(())
        }
    }

    /// Provider that announces a sign-in the moment anything subscribes,
    /// racing the bootstrap query result.
    struct EagerProvider {
        tx: broadcast::Sender<SessionChange>,
    }

    impl EagerProvider {
        fn new() -> Self {
            let (tx, _) = broadcast::channel(4);
            Self { tx }
        }
    }

    #[async_trait]
    impl IdentityProvider for EagerProvider {
        async fn current_identity(&self) -> Result<Option<Identity>, ProviderError> {
            Ok(None)
        }

        fn changes(&self) -> broadcast::Receiver<SessionChange> {
            let rx = self.tx.subscribe();
            let _ = self.tx.send(Some(Identity::new("u1", "a@b.com")));
            rx
        }

        async fn sign_in(&self, _: &str, _: &str) -> Result<Identity, ProviderError> {
            Err(ProviderError::InvalidCredentials)
        }

        async fn sign_up(&self, _: &str, _: &str) -> Result<Identity, ProviderError> {
            Err(ProviderError::Transient("unused".into()))
        }

        async fn sign_out(&self) -> Result<(), ProviderError> {
            Ok(())
        }
    }

    async fn next_snapshot(rx: &mut mpsc::UnboundedReceiver<SessionSnapshot>) -> SessionSnapshot {
        timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timed out waiting for session change")
            .expect("subscription channel closed")
    }

    fn watch(manager: &SessionManager) -> (SessionSubscription, mpsc::UnboundedReceiver<SessionSnapshot>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let sub = manager.subscribe(move |snapshot| {
            let _ = tx.send(snapshot.clone());
        });
        (sub, rx)
    }

    #[tokio::test]
    async fn initialize_restores_an_existing_session() {
        let provider = Arc::new(MemoryIdentityProvider::new());
        provider.register("a@b.com", "secret");
        provider
            .sign_in("a@b.com", "secret")
            .await
            .expect("sign in");

        let manager = SessionManager::new(provider);
        assert!(manager.snapshot().is_loading);

        manager.initialize().await;

        let snapshot = manager.snapshot();
        assert!(!snapshot.is_loading);
        assert_eq!(snapshot.identity.expect("identity").email, "a@b.com");
    }

    #[tokio::test]
    async fn initialize_without_a_session_is_anonymous() {
        let manager = SessionManager::new(Arc::new(MemoryIdentityProvider::new()));
        manager.initialize().await;

        let snapshot = manager.snapshot();
        assert!(!snapshot.is_loading);
        assert!(snapshot.identity.is_none());
    }

    #[tokio::test]
    async fn provider_errors_at_bootstrap_resolve_to_anonymous() {
        let manager = SessionManager::new(Arc::new(BrokenProvider::new()));
        manager.initialize().await;

        let snapshot = manager.snapshot();
        assert!(!snapshot.is_loading);
        assert!(snapshot.identity.is_none());
    }

    #[tokio::test]
    async fn change_events_move_between_states() {
        let provider = Arc::new(MemoryIdentityProvider::new());
        provider.register("a@b.com", "secret");

        let manager = SessionManager::new(Arc::clone(&provider) as Arc<dyn IdentityProvider>);
        manager.initialize().await;

        let (_sub, mut rx) = watch(&manager);

        provider.sign_in("a@b.com", "secret").await.expect("sign in");
        let snapshot = next_snapshot(&mut rx).await;
        assert!(snapshot.is_authenticated());

        provider.sign_out().await.expect("sign out");
        let snapshot = next_snapshot(&mut rx).await;
        assert!(snapshot.identity.is_none());
        assert!(!snapshot.is_loading);
    }

    #[tokio::test]
    async fn disposed_subscription_is_never_invoked() {
        let provider = Arc::new(MemoryIdentityProvider::new());
        provider.register("a@b.com", "secret");

        let manager = SessionManager::new(Arc::clone(&provider) as Arc<dyn IdentityProvider>);
        manager.initialize().await;

        let calls = Arc::new(AtomicU32::new(0));
        let counted = Arc::clone(&calls);
        let sub = manager.subscribe(move |_| {
            counted.fetch_add(1, Ordering::SeqCst);
        });
        sub.dispose();

        // A second, live subscription proves the event was delivered.
        let (_live, mut rx) = watch(&manager);
        provider.sign_in("a@b.com", "secret").await.expect("sign in");
        let _ = next_snapshot(&mut rx).await;

        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failed_sign_out_leaves_state_untouched() {
        let provider = Arc::new(MemoryIdentityProvider::new());
        provider.register("a@b.com", "secret");
        provider.sign_in("a@b.com", "secret").await.expect("sign in");

        let manager = SessionManager::new(Arc::clone(&provider) as Arc<dyn IdentityProvider>);
        manager.initialize().await;
        assert!(manager.snapshot().is_authenticated());

        provider.set_unavailable(true);
        let result = manager.sign_out().await;
        assert!(matches!(result, Err(ProviderError::Transient(_))));
        assert!(manager.snapshot().is_authenticated());

        // Once the provider recovers, sign-out clears the cache.
        provider.set_unavailable(false);
        manager.sign_out().await.expect("sign out");
        assert!(manager.snapshot().identity.is_none());
    }

    #[tokio::test]
    async fn change_during_bootstrap_wins_over_the_bootstrap_result() {
        let manager = SessionManager::new(Arc::new(EagerProvider::new()));
        let (_sub, mut rx) = watch(&manager);

        manager.initialize().await;

        // Loading, then the anonymous bootstrap result, then the
        // concurrent sign-in. The sign-in is newer and must stick.
        loop {
            if next_snapshot(&mut rx).await.is_authenticated() {
                break;
            }
        }
        assert!(manager.snapshot().is_authenticated());
    }

    #[tokio::test]
    async fn repeated_initialize_does_not_duplicate_subscriptions() {
        let provider = Arc::new(MemoryIdentityProvider::new());
        provider.register("a@b.com", "secret");

        let manager = SessionManager::new(Arc::clone(&provider) as Arc<dyn IdentityProvider>);
        manager.initialize().await;
        manager.initialize().await;

        let (_sub, mut rx) = watch(&manager);
        provider.sign_in("a@b.com", "secret").await.expect("sign in");

        let _ = next_snapshot(&mut rx).await;
        // A duplicated watcher would apply the same change twice; the
        // dedup in `apply` would hide that, so assert on the channel: no
        // second snapshot arrives.
        let extra = timeout(Duration::from_millis(200), rx.recv()).await;
        assert!(extra.is_err(), "unexpected duplicate notification");
    }
}
