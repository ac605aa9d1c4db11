use std::sync::Arc;

use crate::domain::{events::SubscriptionId, message::Message};

/// The room shows at most this many messages: the most recently created ones.
pub const ROOM_WINDOW: usize = 25;

/// Field the room is ordered by.
pub const ORDER_FIELD: &str = "createdAt";

/// "The latest `limit` messages by creation time", rendered oldest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiveQuery {
    pub limit: usize,
}

impl Default for LiveQuery {
    fn default() -> Self {
        Self { limit: ROOM_WINDOW }
    }
}

impl LiveQuery {
    pub fn normalized_limit(&self) -> usize {
        match self.limit {
            0 => ROOM_WINDOW,
            value => value.min(ROOM_WINDOW),
        }
    }

    /// Turns a newest-first result into the rendered window: at most `limit` items, ascending.
    pub fn arrange(&self, mut newest_first: Vec<Message>) -> Vec<Message> {
        newest_first.truncate(self.normalized_limit());
        newest_first.reverse();
        newest_first
    }
}

/// Scoped handle for one live query. Dropping it stops delivery.
pub struct Subscription {
    id: SubscriptionId,
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new<F>(id: SubscriptionId, release: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            id,
            release: Some(Box::new(release)),
        }
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.release.is_some())
            .finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
            tracing::debug!(subscription = self.id.0, "live query subscription released");
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedSourceError {
    Unauthorized,
    Unavailable,
}

/// Live query side of the message store. Snapshots arrive as `BackendEvent::Snapshot`.
pub trait MessageFeed {
    fn subscribe(&self, query: LiveQuery) -> Result<Subscription, FeedSourceError>;
}

impl<T> MessageFeed for Arc<T>
where
    T: MessageFeed + ?Sized,
{
    fn subscribe(&self, query: LiveQuery) -> Result<Subscription, FeedSourceError> {
        (**self).subscribe(query)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchMessagesError {
    Unauthorized,
    TemporarilyUnavailable,
}

pub fn watch_messages(feed: &dyn MessageFeed) -> Result<Subscription, WatchMessagesError> {
    feed.subscribe(LiveQuery::default())
        .map_err(|error| match error {
            FeedSourceError::Unauthorized => WatchMessagesError::Unauthorized,
            FeedSourceError::Unavailable => WatchMessagesError::TemporarilyUnavailable,
        })
}
