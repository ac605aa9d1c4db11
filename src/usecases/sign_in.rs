//! Sign-in and session boundary.
//!
//! The provider runs the interactive flow in the background and reports progress through
//! `BackendEvent::SignInPrompt`, `SignInFailed` and `SessionChanged`.

use std::sync::Arc;

use crate::domain::{session::Session, status::SignInFailure};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignInSourceError {
    AlreadyInProgress,
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignOutSourceError {
    StorageUnavailable,
}

pub trait SessionProvider {
    fn current_session(&self) -> Option<Session>;

    /// Starts the provider-hosted flow; returns once it is running, not when it finishes.
    fn begin_sign_in(&self) -> Result<(), SignInSourceError>;

    /// Abandons a pending flow. No-op when nothing is pending.
    fn cancel_sign_in(&self);

    /// Forgets tokens and the persisted session; returns whether a persisted session existed.
    fn sign_out(&self) -> Result<bool, SignOutSourceError>;
}

impl<T> SessionProvider for Arc<T>
where
    T: SessionProvider + ?Sized,
{
    fn current_session(&self) -> Option<Session> {
        (**self).current_session()
    }

    fn begin_sign_in(&self) -> Result<(), SignInSourceError> {
        (**self).begin_sign_in()
    }

    fn cancel_sign_in(&self) {
        (**self).cancel_sign_in()
    }

    fn sign_out(&self) -> Result<bool, SignOutSourceError> {
        (**self).sign_out()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignInError {
    AlreadySignedIn,
    AlreadyInProgress,
    TemporarilyUnavailable,
}

pub fn begin_sign_in(provider: &dyn SessionProvider) -> Result<(), SignInError> {
    if provider.current_session().is_some() {
        return Err(SignInError::AlreadySignedIn);
    }

    provider.begin_sign_in().map_err(|error| match error {
        SignInSourceError::AlreadyInProgress => SignInError::AlreadyInProgress,
        SignInSourceError::Unavailable => SignInError::TemporarilyUnavailable,
    })
}

/// User-facing line for a failed attempt. Only the code and fixed guidance are shown.
pub fn failure_message(failure: SignInFailure) -> String {
    let guidance = match failure {
        SignInFailure::Denied => "Access was not granted on the Google page.",
        SignInFailure::Expired => "The sign-in code expired before it was confirmed.",
        SignInFailure::Timeout => "The identity provider did not answer in time.",
        SignInFailure::Misconfigured => "Check the Firebase and Google OAuth settings.",
        SignInFailure::Transient => "Temporary problem while signing in.",
    };

    format!("{}: {guidance} Press Enter to try again.", failure.code())
}
