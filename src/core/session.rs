//! Session observer - Tracks the signed-in user reactively.
//!
//! The auth provider is an external capability reached through [`AuthProvider`].
//! On mount the observer registers a change listener and fetches the current session.
//! Every later change is pushed to it, never polled. The latest value is published on
//! a `tokio::sync::watch` channel so dependent components can read or await it.
//! Dropping the observer (or calling [`SessionObserver::teardown`]) unregisters the
//! listener.

use crate::errors::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{
    Arc, Mutex, PoisonError, Weak,
    atomic::{AtomicBool, Ordering},
};
use tokio::sync::watch;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Identity issued by the auth provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    /// Opaque identity id, equal to the profile id
    pub id: Uuid,
    /// Email the user signed in with
    pub email: Option<String>,
}

/// Kind of auth state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent {
    /// Current session, delivered to a listener when it is attached
    InitialSession,
    /// User logged in
    SignedIn,
    /// User logged out
    SignedOut,
    /// Access token was refreshed for the same user
    TokenRefreshed,
}

/// Callback invoked on every auth state change.
pub type AuthListener = Box<dyn Fn(AuthEvent, Option<&AuthUser>) + Send + Sync>;

/// External authentication capability.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Returns the current session, if any.
    async fn get_session(&self) -> Result<Option<AuthUser>>;

    /// Registers `listener` for state changes. The listener stays registered
    /// until the returned [`Subscription`] is dropped.
    fn on_auth_state_change(&self, listener: AuthListener) -> Subscription;

    /// Ends the current session.
    async fn sign_out(&self) -> Result<()>;
}

/// Registration handle; unregisters its listener when dropped.
#[must_use = "dropping a Subscription unregisters the listener immediately"]
pub struct Subscription {
    unsubscribe: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    /// Wraps an unregister callback.
    pub fn new(unsubscribe: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            unsubscribe: Some(Box::new(unsubscribe)),
        }
    }

    /// Unregisters the listener now.
    pub fn unsubscribe(mut self) {
        self.run();
    }

    fn run(&mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.run();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.unsubscribe.is_some())
            .finish()
    }
}

#[derive(Default)]
struct ListenerMap {
    next_id: u64,
    listeners: BTreeMap<u64, AuthListener>,
}

/// Event emitter used by providers to fan changes out to listeners.
///
/// Listeners run while the registry lock is held and must not subscribe or
/// unsubscribe from inside the callback.
#[derive(Clone, Default)]
pub struct ListenerRegistry {
    inner: Arc<Mutex<ListenerMap>>,
}

impl ListenerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a listener.
    pub fn subscribe(&self, listener: AuthListener) -> Subscription {
        let id = {
            let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            let id = map.next_id;
            map.next_id += 1;
            map.listeners.insert(id, listener);
            id
        };
        debug!("Auth listener {id} registered");

        let weak: Weak<Mutex<ListenerMap>> = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .listeners
                    .remove(&id);
                debug!("Auth listener {id} unregistered");
            }
        })
    }

    /// Notifies every listener.
    pub fn emit(&self, event: AuthEvent, user: Option<&AuthUser>) {
        let map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        for listener in map.listeners.values() {
            listener(event, user);
        }
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .listeners
            .len()
    }

    /// True when no listener is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Auth provider holding the session in process memory.
///
/// Used when the portal runs embedded next to an identity layer that calls
/// [`InMemoryAuth::sign_in`] after verifying credentials.
#[derive(Default)]
pub struct InMemoryAuth {
    session: Mutex<Option<AuthUser>>,
    listeners: ListenerRegistry,
}

impl InMemoryAuth {
    /// Creates a provider with no session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a session for `user` and notifies listeners.
    pub fn sign_in(&self, user: AuthUser) {
        info!("User {} signed in", user.id);
        *self.session.lock().unwrap_or_else(PoisonError::into_inner) = Some(user.clone());
        self.listeners.emit(AuthEvent::SignedIn, Some(&user));
    }

    /// Simulates a token refresh for the current session.
    pub fn refresh(&self) {
        let current = self
            .session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(user) = current {
            self.listeners.emit(AuthEvent::TokenRefreshed, Some(&user));
        }
    }

    /// Listener registry, exposed for teardown checks.
    #[must_use]
    pub const fn listeners(&self) -> &ListenerRegistry {
        &self.listeners
    }
}

#[async_trait]
impl AuthProvider for InMemoryAuth {
    async fn get_session(&self) -> Result<Option<AuthUser>> {
        Ok(self
            .session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn on_auth_state_change(&self, listener: AuthListener) -> Subscription {
        let current = self
            .session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        listener(AuthEvent::InitialSession, current.as_ref());
        self.listeners.subscribe(listener)
    }

    async fn sign_out(&self) -> Result<()> {
        let previous = self
            .session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(user) = previous {
            info!("User {} signed out", user.id);
        }
        self.listeners.emit(AuthEvent::SignedOut, None);
        Ok(())
    }
}

/// Shared "current user or none" value fed by the auth provider.
#[derive(Debug)]
pub struct SessionObserver {
    current: Arc<watch::Sender<Option<AuthUser>>>,
    subscription: Option<Subscription>,
}

impl SessionObserver {
    /// Attaches to `provider`: registers the change listener, then fetches the
    /// initial session.
    ///
    /// A failed initial fetch is treated as "no user". If a change event arrives
    /// before the initial fetch completes, the fetched value is discarded in favor
    /// of the event.
    pub async fn mount(provider: &dyn AuthProvider) -> Self {
        let (sender, _) = watch::channel(None);
        let current = Arc::new(sender);
        let event_seen = Arc::new(AtomicBool::new(false));

        let listener_current = Arc::clone(&current);
        let listener_seen = Arc::clone(&event_seen);
        let subscription = provider.on_auth_state_change(Box::new(move |event, user| {
            debug!("Auth state change: {event:?}");
            listener_seen.store(true, Ordering::SeqCst);
            listener_current.send_replace(user.cloned());
        }));

        let initial = provider.get_session().await.unwrap_or_else(|e| {
            warn!("Failed to fetch initial session, treating as logged out: {e}");
            None
        });
        if !event_seen.load(Ordering::SeqCst) {
            current.send_replace(initial);
        }

        Self {
            current,
            subscription: Some(subscription),
        }
    }

    /// The signed-in user, if any.
    #[must_use]
    pub fn current(&self) -> Option<AuthUser> {
        self.current.borrow().clone()
    }

    /// The signed-in user, or `Error::Auth`.
    pub fn require_user(&self) -> Result<AuthUser> {
        self.current().ok_or(Error::Auth)
    }

    /// Receiver that observes every change of the current user.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<Option<AuthUser>> {
        self.current.subscribe()
    }

    /// Unregisters the change listener. The last known user stays readable.
    pub fn teardown(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
    }
}
