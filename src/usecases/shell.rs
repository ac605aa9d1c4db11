use anyhow::Result;

use crate::{
    domain::{
        composer_state::ComposerNotice,
        events::{AppEvent, BackendEvent, KeyInput},
        message_list_state::SnapshotOutcome,
        session::Session,
        shell_state::{Screen, ShellState, ShellView},
        status::{SignInFailure, SignInPrompt, SignInStatus, StoreFailure, SyncHealth},
    },
    infra::contracts::ExternalOpener,
};

use super::{
    contracts::ShellOrchestrator,
    send_message::{send_message, MessageAppender, SendMessageCommand, SendMessageError},
    sign_in::{begin_sign_in, SessionProvider, SignInError},
    watch_messages::{watch_messages, MessageFeed, Subscription},
};

const SHELL_SUBSCRIBE_FAILED: &str = "QUERY_SUBSCRIBE_FAILED";
const SHELL_SIGN_OUT_STORAGE_FAILED: &str = "AUTH_SIGN_OUT_STORAGE_FAILED";
const SHELL_BROWSER_OPEN_FAILED: &str = "AUTH_BROWSER_OPEN_FAILED";

/// Drives the shell state machine: signed out, signed in on the list, signed in composing.
///
/// The live query subscription is held only while the list is on screen.
pub struct DefaultShellOrchestrator<P, M, O>
where
    P: SessionProvider,
    M: MessageFeed + MessageAppender,
    O: ExternalOpener,
{
    state: ShellState,
    sessions: P,
    messages: M,
    opener: O,
    subscription: Option<Subscription>,
}

impl<P, M, O> DefaultShellOrchestrator<P, M, O>
where
    P: SessionProvider,
    M: MessageFeed + MessageAppender,
    O: ExternalOpener,
{
    pub fn new(sessions: P, messages: M, opener: O, room_prompt: Option<String>) -> Self {
        let mut orchestrator = Self {
            state: ShellState::with_room_prompt(room_prompt),
            sessions,
            messages,
            opener,
            subscription: None,
        };

        let restored = orchestrator.sessions.current_session();
        orchestrator.apply_session(restored);
        orchestrator
    }

    fn apply_session(&mut self, session: Option<Session>) {
        match session {
            Some(session) => {
                let same_user = self
                    .state
                    .session()
                    .is_some_and(|current| current.uid == session.uid);
                if !same_user {
                    self.subscription = None;
                    self.state.message_list_mut().reset();
                }

                tracing::info!(uid = %session.uid, "session active");
                self.state.set_session(Some(session));

                if self.state.view() == ShellView::List && self.subscription.is_none() {
                    self.show_list();
                }
            }
            None => {
                self.subscription = None;
                self.state.set_session(None);
            }
        }
    }

    fn show_list(&mut self) {
        self.subscription = None;

        match watch_messages(&self.messages) {
            Ok(subscription) => {
                self.state.message_list_mut().attach(subscription.id());
                self.state.set_sync_health(SyncHealth::Waiting);
                self.subscription = Some(subscription);
            }
            Err(error) => {
                tracing::warn!(
                    code = SHELL_SUBSCRIBE_FAILED,
                    error = ?error,
                    "live query subscription could not be acquired"
                );
                self.state.message_list_mut().show();
                self.state.set_sync_health(SyncHealth::Degraded);
            }
        }
    }

    fn open_composer(&mut self) {
        self.state.set_view(ShellView::Composer);
        self.subscription = None;
        self.state.message_list_mut().detach();
        self.state.set_sync_health(SyncHealth::Idle);
    }

    fn close_composer(&mut self) {
        self.state.set_view(ShellView::List);
        self.show_list();
    }

    fn start_sign_in(&mut self) {
        if self.state.sign_in().is_pending() {
            return;
        }

        self.state.set_sign_in(SignInStatus::Starting);
        match begin_sign_in(&self.sessions) {
            Ok(()) | Err(SignInError::AlreadyInProgress) => {}
            Err(SignInError::AlreadySignedIn) => {
                let current = self.sessions.current_session();
                self.apply_session(current);
            }
            Err(SignInError::TemporarilyUnavailable) => {
                self.state
                    .set_sign_in(SignInStatus::Failed(SignInFailure::Transient));
            }
        }
    }

    fn cancel_sign_in(&mut self) {
        if self.state.sign_in().is_pending() {
            self.sessions.cancel_sign_in();
            self.state.set_sign_in(SignInStatus::Idle);
        }
    }

    fn sign_out(&mut self) {
        if let Err(error) = self.sessions.sign_out() {
            tracing::warn!(
                code = SHELL_SIGN_OUT_STORAGE_FAILED,
                error = ?error,
                "signed out, but the stored session could not be removed"
            );
        }
        self.apply_session(None);
    }

    fn submit(&mut self) {
        if self.state.composer().is_submitting() {
            return;
        }

        let command = SendMessageCommand {
            text: self.state.composer().input().text().to_owned(),
        };

        match send_message(&self.messages, self.state.session(), command) {
            Ok(()) => self.state.composer_mut().begin_submit(),
            Err(error) => {
                let notice = match error {
                    SendMessageError::EmptyMessage => ComposerNotice::EmptyMessage,
                    SendMessageError::TooLong => ComposerNotice::TooLong,
                    SendMessageError::NotSignedIn | SendMessageError::Unauthorized => {
                        ComposerNotice::Rejected(StoreFailure::Unauthorized)
                    }
                    SendMessageError::TemporarilyUnavailable => {
                        ComposerNotice::Rejected(StoreFailure::Unavailable)
                    }
                };
                self.state.composer_mut().reject(notice);
            }
        }
    }

    fn handle_key(&mut self, key: KeyInput) {
        match self.state.screen() {
            Screen::SignIn => self.handle_sign_in_key(&key),
            Screen::MessageList => self.handle_list_key(&key),
            Screen::Composer => self.handle_composer_key(&key),
        }
    }

    fn handle_sign_in_key(&mut self, key: &KeyInput) {
        match key.key.as_str() {
            "enter" => self.start_sign_in(),
            "esc" => self.cancel_sign_in(),
            "q" => self.state.stop(),
            _ => {}
        }
    }

    fn handle_list_key(&mut self, key: &KeyInput) {
        match key.key.as_str() {
            "tab" | "n" => self.open_composer(),
            "j" | "down" => self.state.message_list_mut().select_next(),
            "k" | "up" => self.state.message_list_mut().select_previous(),
            "r" => self.show_list(),
            "o" => self.sign_out(),
            "q" => self.state.stop(),
            _ => {}
        }
    }

    fn handle_composer_key(&mut self, key: &KeyInput) {
        match key.key.as_str() {
            "tab" | "esc" => {
                self.close_composer();
                return;
            }
            "enter" => {
                self.submit();
                return;
            }
            _ => {}
        }

        let Some(input) = self.state.composer_mut().input_mut() else {
            return;
        };

        match key.key.as_str() {
            "w" if key.ctrl => input.delete_word_before(),
            "backspace" => input.backspace(),
            "delete" => input.delete(),
            "left" => input.move_left(),
            "right" => input.move_right(),
            "home" => input.move_home(),
            "end" => input.move_end(),
            text if !key.ctrl => {
                let mut chars = text.chars();
                if let (Some(ch), None) = (chars.next(), chars.next()) {
                    input.insert_char(ch);
                }
            }
            _ => {}
        }
    }

    fn handle_backend(&mut self, event: BackendEvent) {
        match event {
            BackendEvent::SessionChanged(session) => self.apply_session(session),
            BackendEvent::SignInPrompt(prompt) => self.show_sign_in_prompt(prompt),
            BackendEvent::SignInFailed(failure) => {
                if self.state.session().is_none() {
                    self.state.set_sign_in(SignInStatus::Failed(failure));
                }
            }
            BackendEvent::Snapshot {
                subscription,
                messages,
            } => {
                match self
                    .state
                    .message_list_mut()
                    .apply_snapshot(subscription, messages)
                {
                    SnapshotOutcome::Applied => self.state.set_sync_health(SyncHealth::Ok),
                    SnapshotOutcome::Stale => {
                        tracing::debug!(subscription = subscription.0, "stale snapshot dropped");
                    }
                }
            }
            BackendEvent::SnapshotFailed {
                subscription,
                failure,
            } => {
                if self.state.message_list().subscription() == Some(subscription) {
                    tracing::debug!(failure = failure.code(), "live query degraded");
                    self.state.set_sync_health(SyncHealth::Degraded);
                }
            }
            BackendEvent::AppendCompleted(result) => {
                if !self.state.composer().is_submitting() {
                    return;
                }
                match result {
                    Ok(()) => {
                        self.state.composer_mut().complete_submit();
                        if self.state.screen() == Screen::Composer {
                            self.close_composer();
                        }
                    }
                    Err(failure) => self
                        .state
                        .composer_mut()
                        .reject(ComposerNotice::Rejected(failure)),
                }
            }
        }
    }

    fn show_sign_in_prompt(&mut self, prompt: SignInPrompt) {
        if self.state.session().is_some() || !self.state.sign_in().is_pending() {
            return;
        }

        if let Err(error) = self.opener.open(&prompt.verification_url) {
            tracing::warn!(
                code = SHELL_BROWSER_OPEN_FAILED,
                error = %error,
                "browser could not be opened, showing the link instead"
            );
        }
        self.state.set_sign_in(SignInStatus::AwaitingUser(prompt));
    }
}

impl<P, M, O> ShellOrchestrator for DefaultShellOrchestrator<P, M, O>
where
    P: SessionProvider,
    M: MessageFeed + MessageAppender,
    O: ExternalOpener,
{
    fn state(&self) -> &ShellState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ShellState {
        &mut self.state
    }

    fn handle_event(&mut self, event: AppEvent) -> Result<()> {
        match event {
            AppEvent::Tick => {}
            AppEvent::QuitRequested => self.state.stop(),
            AppEvent::InputKey(key) => self.handle_key(key),
            AppEvent::Backend(event) => self.handle_backend(event),
        }

        Ok(())
    }
}
