//! Composer submit: builds one message from the session and hands it to the store.

use std::sync::Arc;

use crate::domain::{
    message::NewMessage, message_input_state::MAX_MESSAGE_CHARS, session::Session,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendMessageCommand {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppendSourceError {
    Unauthorized,
    Unavailable,
}

/// Write side of the message store.
pub trait MessageAppender {
    /// Queues the write. Completion is reported as `BackendEvent::AppendCompleted`.
    fn append(&self, message: NewMessage) -> Result<(), AppendSourceError>;
}

impl<T> MessageAppender for Arc<T>
where
    T: MessageAppender + ?Sized,
{
    fn append(&self, message: NewMessage) -> Result<(), AppendSourceError> {
        (**self).append(message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendMessageError {
    EmptyMessage,
    TooLong,
    NotSignedIn,
    Unauthorized,
    TemporarilyUnavailable,
}

/// Author fields come from the live session; the store adds the server timestamp.
pub fn compose_message(session: &Session, text: &str) -> NewMessage {
    NewMessage {
        name: session.display_name.clone(),
        photo_url: session.avatar_url.clone(),
        uid: session.uid.clone(),
        para: text.to_owned(),
    }
}

pub fn send_message(
    appender: &dyn MessageAppender,
    session: Option<&Session>,
    command: SendMessageCommand,
) -> Result<(), SendMessageError> {
    let text = command.text.trim();
    if text.is_empty() {
        return Err(SendMessageError::EmptyMessage);
    }
    if text.chars().count() > MAX_MESSAGE_CHARS {
        return Err(SendMessageError::TooLong);
    }

    let session = session.ok_or(SendMessageError::NotSignedIn)?;

    appender
        .append(compose_message(session, text))
        .map_err(|error| match error {
            AppendSourceError::Unauthorized => SendMessageError::Unauthorized,
            AppendSourceError::Unavailable => SendMessageError::TemporarilyUnavailable,
        })
}
