use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        mpsc::Sender,
        Arc, Mutex, MutexGuard, PoisonError,
    },
    time::{Duration, Instant},
};

use tokio::{
    runtime::{Builder, Runtime},
    sync::watch,
};

use super::{
    auth::{self, RefreshError, Tokens},
    firestore, live_query,
};
use crate::{
    domain::{
        events::{BackendEvent, SubscriptionId},
        message::NewMessage,
        session::Session,
        status::{SignInFailure, StoreFailure},
    },
    infra::{
        config::{AppConfig, FirebaseConfig, GoogleConfig},
        contracts::{SessionStore, StoredSession},
        error::AppError,
    },
    usecases::{
        send_message::{AppendSourceError, MessageAppender},
        sign_in::{SessionProvider, SignInSourceError, SignOutSourceError},
        startup::{ProbeError, SessionProbe},
        watch_messages::{FeedSourceError, LiveQuery, MessageFeed, Subscription},
    },
};

const HTTP_TIMEOUT: Duration = Duration::from_secs(15);
const MIN_POLL_INTERVAL_MS: u64 = 250;

const SIGN_IN_STARTED: &str = "AUTH_SIGN_IN_STARTED";
const SIGN_IN_CANCELLED: &str = "AUTH_SIGN_IN_CANCELLED";
const SIGN_IN_FAILED: &str = "AUTH_SIGN_IN_FAILED";
const SIGN_IN_COMPLETED: &str = "AUTH_SIGN_IN_COMPLETED";
const SESSION_ENDED: &str = "AUTH_SESSION_ENDED";
const SESSION_PERSIST_FAILED: &str = "AUTH_SESSION_PERSIST_FAILED";
const SESSION_CLEAR_FAILED: &str = "AUTH_SESSION_CLEAR_FAILED";
const APPEND_FAILED: &str = "STORE_APPEND_FAILED";
const EVENT_CHANNEL_CLOSED: &str = "QUERY_EVENT_CHANNEL_CLOSED";

#[derive(Default)]
struct AuthState {
    session: Option<Session>,
    tokens: Option<Tokens>,
}

struct SignInAttempt {
    id: u64,
    stop_tx: watch::Sender<bool>,
}

/// State shared between the backend handle and the tasks it spawns.
pub(super) struct Shared {
    pub http: reqwest::Client,
    pub firebase: FirebaseConfig,
    pub google: GoogleConfig,
    pub poll_interval: Duration,
    auth: Mutex<AuthState>,
    sign_in: Mutex<Option<SignInAttempt>>,
    store: Arc<dyn SessionStore>,
    events: Sender<BackendEvent>,
}

impl Shared {
    /// Returns `false` once the UI side has hung up.
    pub fn emit(&self, event: BackendEvent) -> bool {
        match self.events.send(event) {
            Ok(()) => true,
            Err(_) => {
                tracing::debug!(code = EVENT_CHANNEL_CLOSED, "backend event dropped");
                false
            }
        }
    }

    /// A fresh ID token for the current session, refreshed when close to expiry.
    pub async fn authorized_token(&self) -> Result<String, StoreFailure> {
        let refresh_token = {
            let auth = lock(&self.auth);
            if auth.session.is_none() {
                return Err(StoreFailure::Unauthorized);
            }
            let tokens = auth.tokens.as_ref().ok_or(StoreFailure::Unauthorized)?;
            if let Some(id_token) = tokens.usable_id_token(Instant::now()) {
                return Ok(id_token.to_owned());
            }
            tokens.refresh_token.clone()
        };

        match auth::refresh_tokens(&self.http, &self.firebase, &refresh_token).await {
            Ok(tokens) => {
                let id_token = tokens.id_token.clone().ok_or(StoreFailure::Unauthorized)?;
                self.install_tokens(&refresh_token, tokens);
                Ok(id_token)
            }
            Err(RefreshError::Rejected) => {
                self.end_session(&refresh_token);
                Err(StoreFailure::Unauthorized)
            }
            Err(RefreshError::Unavailable) => Err(StoreFailure::Unavailable),
        }
    }

    /// Forces the next request to refresh the ID token.
    pub fn invalidate_id_token(&self) {
        if let Some(tokens) = lock(&self.auth).tokens.as_mut() {
            tokens.id_token = None;
            tokens.expires_at = None;
        }
    }

    /// Stores refreshed tokens unless the session they belong to is already gone.
    fn install_tokens(&self, previous_refresh_token: &str, tokens: Tokens) {
        let session = {
            let mut auth = lock(&self.auth);
            let current = auth.tokens.as_ref().map(|t| t.refresh_token.as_str());
            if current != Some(previous_refresh_token) {
                return;
            }
            let rotated = tokens.refresh_token != previous_refresh_token;
            auth.tokens = Some(tokens.clone());
            if !rotated {
                return;
            }
            auth.session.clone()
        };

        if let Some(session) = session {
            self.persist(&session, &tokens.refresh_token);
        }
    }

    fn persist(&self, session: &Session, refresh_token: &str) {
        let stored = StoredSession {
            uid: session.uid.clone(),
            display_name: session.display_name.clone(),
            avatar_url: session.avatar_url.clone(),
            refresh_token: refresh_token.to_owned(),
        };

        if let Err(error) = self.store.save(&stored) {
            tracing::warn!(
                code = SESSION_PERSIST_FAILED,
                error = %error,
                "session could not be persisted; it will not survive a restart"
            );
        }
    }

    /// Drops the session after the provider refused its refresh token.
    fn end_session(&self, refresh_token: &str) {
        let ended = {
            let mut auth = lock(&self.auth);
            let current = auth.tokens.as_ref().map(|t| t.refresh_token.as_str());
            if current != Some(refresh_token) {
                false
            } else {
                *auth = AuthState::default();
                true
            }
        };

        if !ended {
            return;
        }

        tracing::warn!(code = SESSION_ENDED, "refresh token rejected, session ended");
        self.clear_store();
        self.emit(BackendEvent::SessionChanged(None));
    }

    fn clear_store(&self) {
        if let Err(error) = self.store.clear() {
            tracing::warn!(
                code = SESSION_CLEAR_FAILED,
                error = %error,
                "stored session could not be removed"
            );
        }
    }

    fn finish_sign_in(&self, attempt: u64) {
        let mut slot = lock(&self.sign_in);
        if slot.as_ref().is_some_and(|current| current.id == attempt) {
            *slot = None;
        }
    }
}

/// Client of the managed backend: Firebase Auth for identity, Firestore for the room.
pub struct FirebaseBackend {
    runtime: Option<Runtime>,
    shared: Arc<Shared>,
    next_attempt: AtomicU64,
    next_subscription: AtomicU64,
}

impl FirebaseBackend {
    pub fn new(
        config: &AppConfig,
        store: Arc<dyn SessionStore>,
        events: Sender<BackendEvent>,
    ) -> Result<Self, AppError> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("bchat-backend")
            .enable_all()
            .build()
            .map_err(AppError::BackendRuntime)?;

        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(AppError::HttpClient)?;

        let poll_interval =
            Duration::from_millis(config.room.poll_interval_ms.max(MIN_POLL_INTERVAL_MS));

        Ok(Self {
            runtime: Some(runtime),
            shared: Arc::new(Shared {
                http,
                firebase: config.firebase.clone(),
                google: config.google.clone(),
                poll_interval,
                auth: Mutex::new(AuthState::default()),
                sign_in: Mutex::new(None),
                store,
                events,
            }),
            next_attempt: AtomicU64::new(1),
            next_subscription: AtomicU64::new(1),
        })
    }

    fn runtime(&self) -> Option<&Runtime> {
        self.runtime.as_ref()
    }

    fn has_session(&self) -> bool {
        lock(&self.shared.auth).session.is_some()
    }
}

impl SessionProvider for FirebaseBackend {
    fn current_session(&self) -> Option<Session> {
        lock(&self.shared.auth).session.clone()
    }

    fn begin_sign_in(&self) -> Result<(), SignInSourceError> {
        let runtime = self.runtime().ok_or(SignInSourceError::Unavailable)?;

        let mut slot = lock(&self.shared.sign_in);
        if slot.is_some() {
            return Err(SignInSourceError::AlreadyInProgress);
        }

        let id = self.next_attempt.fetch_add(1, Ordering::Relaxed);
        let (stop_tx, stop_rx) = watch::channel(false);
        *slot = Some(SignInAttempt { id, stop_tx });
        drop(slot);

        tracing::info!(code = SIGN_IN_STARTED, attempt = id, "google sign-in started");
        runtime.spawn(run_sign_in(Arc::clone(&self.shared), id, stop_rx));
        Ok(())
    }

    fn cancel_sign_in(&self) {
        if let Some(attempt) = lock(&self.shared.sign_in).take() {
            let _ = attempt.stop_tx.send(true);
            tracing::info!(
                code = SIGN_IN_CANCELLED,
                attempt = attempt.id,
                "google sign-in cancelled"
            );
        }
    }

    fn sign_out(&self) -> Result<bool, SignOutSourceError> {
        self.cancel_sign_in();

        let had_session = {
            let mut auth = lock(&self.shared.auth);
            let had_session = auth.session.is_some();
            *auth = AuthState::default();
            had_session
        };

        let removed = self
            .shared
            .store
            .clear()
            .map_err(|_| SignOutSourceError::StorageUnavailable)?;

        Ok(had_session || removed)
    }
}

impl MessageFeed for FirebaseBackend {
    fn subscribe(&self, query: LiveQuery) -> Result<Subscription, FeedSourceError> {
        if !self.has_session() {
            return Err(FeedSourceError::Unauthorized);
        }
        let runtime = self.runtime().ok_or(FeedSourceError::Unavailable)?;

        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::Relaxed));
        let (stop_tx, stop_rx) = watch::channel(false);
        runtime.spawn(live_query::run_poller(
            Arc::clone(&self.shared),
            id,
            query,
            stop_rx,
        ));

        Ok(Subscription::new(id, move || {
            let _ = stop_tx.send(true);
        }))
    }
}

impl MessageAppender for FirebaseBackend {
    fn append(&self, message: NewMessage) -> Result<(), AppendSourceError> {
        if !self.has_session() {
            return Err(AppendSourceError::Unauthorized);
        }
        let runtime = self.runtime().ok_or(AppendSourceError::Unavailable)?;

        let shared = Arc::clone(&self.shared);
        runtime.spawn(async move {
            let result = append_once(&shared, &message).await;
            if let Err(failure) = result {
                if failure == StoreFailure::Unauthorized {
                    shared.invalidate_id_token();
                }
                tracing::warn!(
                    code = APPEND_FAILED,
                    failure = failure.code(),
                    "message append failed"
                );
            }
            shared.emit(BackendEvent::AppendCompleted(result));
        });

        Ok(())
    }
}

impl SessionProbe for FirebaseBackend {
    fn probe(&self, stored: &StoredSession, timeout: Duration) -> Result<Session, ProbeError> {
        let runtime = self.runtime().ok_or(ProbeError::Unavailable)?;
        let session = Session::new(
            stored.uid.clone(),
            stored.display_name.clone(),
            stored.avatar_url.clone(),
        );

        {
            let mut auth = lock(&self.shared.auth);
            auth.session = Some(session.clone());
            auth.tokens = Some(Tokens::from_refresh_token(stored.refresh_token.clone()));
        }

        let shared = &self.shared;
        let refreshed = runtime.block_on(async {
            tokio::time::timeout(
                timeout,
                auth::refresh_tokens(&shared.http, &shared.firebase, &stored.refresh_token),
            )
            .await
        });

        match refreshed {
            Ok(Ok(tokens)) => {
                shared.install_tokens(&stored.refresh_token, tokens);
                Ok(session)
            }
            Ok(Err(RefreshError::Rejected)) => {
                *lock(&shared.auth) = AuthState::default();
                Err(ProbeError::Rejected)
            }
            Ok(Err(RefreshError::Unavailable)) => Err(ProbeError::Unavailable),
            Err(_) => Err(ProbeError::Timeout),
        }
    }
}

impl Drop for FirebaseBackend {
    fn drop(&mut self) {
        self.cancel_sign_in();
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

async fn append_once(shared: &Shared, message: &NewMessage) -> Result<(), StoreFailure> {
    let id_token = shared.authorized_token().await?;
    firestore::append(&shared.http, &shared.firebase, &id_token, message).await
}

async fn run_sign_in(shared: Arc<Shared>, attempt: u64, mut stop_rx: watch::Receiver<bool>) {
    let outcome = sign_in_flow(&shared, &mut stop_rx).await;
    let cancelled = *stop_rx.borrow();
    shared.finish_sign_in(attempt);

    match outcome {
        Ok(Some(signed_in)) if !cancelled => {
            {
                let mut auth = lock(&shared.auth);
                auth.session = Some(signed_in.session.clone());
                auth.tokens = Some(signed_in.tokens.clone());
            }
            shared.persist(&signed_in.session, &signed_in.tokens.refresh_token);
            tracing::info!(code = SIGN_IN_COMPLETED, attempt, "google sign-in completed");
            shared.emit(BackendEvent::SessionChanged(Some(signed_in.session)));
        }
        Ok(_) => {
            tracing::debug!(attempt, "sign-in attempt ended without a session");
        }
        Err(failure) if !cancelled => {
            tracing::warn!(
                code = SIGN_IN_FAILED,
                attempt,
                failure = failure.code(),
                "google sign-in failed"
            );
            shared.emit(BackendEvent::SignInFailed(failure));
        }
        Err(_) => {}
    }
}

async fn sign_in_flow(
    shared: &Shared,
    stop_rx: &mut watch::Receiver<bool>,
) -> Result<Option<auth::SignedIn>, SignInFailure> {
    let device = auth::request_device_code(&shared.http, &shared.google).await?;
    if *stop_rx.borrow() {
        return Ok(None);
    }
    shared.emit(BackendEvent::SignInPrompt(device.prompt.clone()));

    let Some(google_id_token) =
        auth::wait_for_google_id_token(&shared.http, &shared.google, &device, stop_rx).await?
    else {
        return Ok(None);
    };

    auth::sign_in_with_google(&shared.http, &shared.firebase, &google_id_token)
        .await
        .map(Some)
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc::{self, Receiver};

    use super::*;
    use crate::infra::stubs::MemorySessionStore;

    fn stored() -> StoredSession {
        StoredSession {
            uid: "u1".to_owned(),
            display_name: "Ann".to_owned(),
            avatar_url: None,
            refresh_token: "refresh-1".to_owned(),
        }
    }

    fn backend(
        store: Arc<MemorySessionStore>,
    ) -> (FirebaseBackend, Receiver<BackendEvent>) {
        let (tx, rx) = mpsc::channel();
        let backend =
            FirebaseBackend::new(&AppConfig::default(), store, tx).expect("backend should build");
        (backend, rx)
    }

    fn sign_in_directly(backend: &FirebaseBackend) {
        let mut auth = lock(&backend.shared.auth);
        auth.session = Some(Session::new("u1", "Ann", None));
        auth.tokens = Some(Tokens::from_refresh_token("refresh-1".to_owned()));
    }

    #[test]
    fn store_calls_require_a_session() {
        let (backend, _rx) = backend(Arc::new(MemorySessionStore::default()));

        assert_eq!(
            backend.subscribe(LiveQuery::default()).map(|s| s.id()),
            Err(FeedSourceError::Unauthorized)
        );
        assert_eq!(
            backend.append(NewMessage {
                name: "Ann".to_owned(),
                photo_url: None,
                uid: "u1".to_owned(),
                para: "hi".to_owned(),
            }),
            Err(AppendSourceError::Unauthorized)
        );
    }

    #[test]
    fn sign_out_clears_session_and_stored_credentials() {
        let store = Arc::new(MemorySessionStore::with(stored()));
        let (backend, _rx) = backend(Arc::clone(&store));
        sign_in_directly(&backend);

        let removed = backend.sign_out().expect("sign out should succeed");

        assert!(removed);
        assert_eq!(backend.current_session(), None);
        assert_eq!(store.load().expect("load"), None);
    }

    #[test]
    fn rejected_refresh_ends_session_and_notifies_ui() {
        let store = Arc::new(MemorySessionStore::with(stored()));
        let (backend, rx) = backend(Arc::clone(&store));
        sign_in_directly(&backend);

        backend.shared.end_session("refresh-1");

        assert_eq!(backend.current_session(), None);
        assert_eq!(store.load().expect("load"), None);
        assert_eq!(rx.try_recv(), Ok(BackendEvent::SessionChanged(None)));
    }

    #[test]
    fn stale_refresh_rejection_leaves_newer_session_alone() {
        let (backend, rx) = backend(Arc::new(MemorySessionStore::default()));
        sign_in_directly(&backend);

        backend.shared.end_session("older-token");

        assert!(backend.current_session().is_some());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn rotated_refresh_token_is_persisted() {
        let store = Arc::new(MemorySessionStore::default());
        let (backend, _rx) = backend(Arc::clone(&store));
        sign_in_directly(&backend);

        backend.shared.install_tokens(
            "refresh-1",
            Tokens {
                id_token: Some("id".to_owned()),
                refresh_token: "refresh-2".to_owned(),
                expires_at: Some(Instant::now() + Duration::from_secs(3_600)),
            },
        );

        let saved = store.load().expect("load").expect("session saved");
        assert_eq!(saved.uid, "u1");
        assert_eq!(saved.refresh_token, "refresh-2");
    }

    #[test]
    fn invalidated_token_is_no_longer_usable() {
        let (backend, _rx) = backend(Arc::new(MemorySessionStore::default()));
        {
            let mut auth = lock(&backend.shared.auth);
            auth.session = Some(Session::new("u1", "Ann", None));
            auth.tokens = Some(Tokens {
                id_token: Some("id".to_owned()),
                refresh_token: "refresh-1".to_owned(),
                expires_at: Some(Instant::now() + Duration::from_secs(3_600)),
            });
        }

        backend.shared.invalidate_id_token();

        let auth = lock(&backend.shared.auth);
        let tokens = auth.tokens.as_ref().expect("tokens kept");
        assert_eq!(tokens.usable_id_token(Instant::now()), None);
        assert_eq!(tokens.refresh_token, "refresh-1");
    }

    #[test]
    fn cancel_without_pending_attempt_is_a_no_op() {
        let (backend, _rx) = backend(Arc::new(MemorySessionStore::default()));

        backend.cancel_sign_in();

        assert!(lock(&backend.shared.sign_in).is_none());
    }
}
