use super::{
    message::Message,
    session::Session,
    status::{SignInFailure, SignInPrompt, StoreFailure},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    Tick,
    QuitRequested,
    InputKey(KeyInput),
    Backend(BackendEvent),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyInput {
    pub key: String,
    pub ctrl: bool,
}

impl KeyInput {
    pub fn new(key: impl Into<String>, ctrl: bool) -> Self {
        Self {
            key: key.into(),
            ctrl,
        }
    }
}

/// Identifies one acquisition of the live query; snapshots from older ids are stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

/// Results pushed by the managed backend, delivered on the UI loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendEvent {
    SessionChanged(Option<Session>),
    SignInPrompt(SignInPrompt),
    SignInFailed(SignInFailure),
    Snapshot {
        subscription: SubscriptionId,
        messages: Vec<Message>,
    },
    SnapshotFailed {
        subscription: SubscriptionId,
        failure: StoreFailure,
    },
    AppendCompleted(Result<(), StoreFailure>),
}
