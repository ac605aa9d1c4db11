use std::sync::Arc;

use tokio::sync::watch;

use super::{backend::Shared, firestore};
use crate::{
    domain::{
        events::{BackendEvent, SubscriptionId},
        message::Message,
        status::StoreFailure,
    },
    usecases::watch_messages::LiveQuery,
};

const LIVE_QUERY_STARTED: &str = "QUERY_POLLER_STARTED";
const LIVE_QUERY_STOPPED: &str = "QUERY_POLLER_STOPPED";
const LIVE_QUERY_POLL_FAILED: &str = "QUERY_POLL_FAILED";
const LIVE_QUERY_RECOVERED: &str = "QUERY_POLL_RECOVERED";

/// Tracks what the subscriber has already been told.
#[derive(Debug, Default)]
pub(super) struct PollTracker {
    delivered: Option<Vec<Message>>,
    failing: bool,
}

impl PollTracker {
    /// Returns the event to publish for this poll result, if any.
    pub fn observe(
        &mut self,
        subscription: SubscriptionId,
        result: Result<Vec<Message>, StoreFailure>,
    ) -> Option<BackendEvent> {
        match result {
            Ok(messages) => {
                let recovered = std::mem::replace(&mut self.failing, false);
                if recovered {
                    tracing::info!(
                        code = LIVE_QUERY_RECOVERED,
                        subscription = subscription.0,
                        "live query recovered"
                    );
                }
                if !recovered && self.delivered.as_ref() == Some(&messages) {
                    return None;
                }
                self.delivered = Some(messages.clone());
                Some(BackendEvent::Snapshot {
                    subscription,
                    messages,
                })
            }
            Err(failure) => {
                if self.failing {
                    return None;
                }
                self.failing = true;
                tracing::warn!(
                    code = LIVE_QUERY_POLL_FAILED,
                    subscription = subscription.0,
                    failure = failure.code(),
                    "live query poll failed; poller stays alive"
                );
                Some(BackendEvent::SnapshotFailed {
                    subscription,
                    failure,
                })
            }
        }
    }
}

pub(super) async fn run_poller(
    shared: Arc<Shared>,
    subscription: SubscriptionId,
    query: LiveQuery,
    mut stop_rx: watch::Receiver<bool>,
) {
    tracing::info!(
        code = LIVE_QUERY_STARTED,
        subscription = subscription.0,
        limit = query.normalized_limit(),
        "live query poller started"
    );

    let mut tracker = PollTracker::default();

    loop {
        let result = tokio::select! {
            biased;
            changed = stop_rx.changed() => {
                if changed.is_err() || *stop_rx.borrow() {
                    break;
                }
                continue;
            }
            result = poll_once(&shared, &query) => result,
        };

        if result == Err(StoreFailure::Unauthorized) {
            shared.invalidate_id_token();
        }

        if let Some(event) = tracker.observe(subscription, result) {
            if !shared.emit(event) {
                break;
            }
        }

        tokio::select! {
            changed = stop_rx.changed() => {
                if changed.is_err() || *stop_rx.borrow() {
                    break;
                }
            }
            _ = tokio::time::sleep(shared.poll_interval) => {}
        }
    }

    tracing::info!(
        code = LIVE_QUERY_STOPPED,
        subscription = subscription.0,
        "live query poller stopped"
    );
}

async fn poll_once(shared: &Shared, query: &LiveQuery) -> Result<Vec<Message>, StoreFailure> {
    let id_token = shared.authorized_token().await?;
    firestore::run_query(&shared.http, &shared.firebase, &id_token, query).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(id: &str) -> Message {
        Message {
            id: id.to_owned(),
            name: "Ann".to_owned(),
            photo_url: None,
            uid: "u1".to_owned(),
            para: "hi".to_owned(),
            created_at: None,
        }
    }

    const SUB: SubscriptionId = SubscriptionId(3);

    #[test]
    fn first_poll_always_publishes_even_when_empty() {
        let mut tracker = PollTracker::default();

        let event = tracker.observe(SUB, Ok(Vec::new()));

        assert_eq!(
            event,
            Some(BackendEvent::Snapshot {
                subscription: SUB,
                messages: Vec::new(),
            })
        );
    }

    #[test]
    fn unchanged_results_are_not_republished() {
        let mut tracker = PollTracker::default();
        tracker.observe(SUB, Ok(vec![message("m1")]));

        assert_eq!(tracker.observe(SUB, Ok(vec![message("m1")])), None);
        assert!(tracker
            .observe(SUB, Ok(vec![message("m1"), message("m2")]))
            .is_some());
    }

    #[test]
    fn failure_is_reported_once_until_recovery() {
        let mut tracker = PollTracker::default();
        tracker.observe(SUB, Ok(vec![message("m1")]));

        assert_eq!(
            tracker.observe(SUB, Err(StoreFailure::Unavailable)),
            Some(BackendEvent::SnapshotFailed {
                subscription: SUB,
                failure: StoreFailure::Unavailable,
            })
        );
        assert_eq!(tracker.observe(SUB, Err(StoreFailure::Unavailable)), None);
    }

    #[test]
    fn recovery_republishes_even_an_unchanged_snapshot() {
        let mut tracker = PollTracker::default();
        tracker.observe(SUB, Ok(vec![message("m1")]));
        tracker.observe(SUB, Err(StoreFailure::Unavailable));

        let event = tracker.observe(SUB, Ok(vec![message("m1")]));

        assert_eq!(
            event,
            Some(BackendEvent::Snapshot {
                subscription: SUB,
                messages: vec![message("m1")],
            })
        );
    }
}
