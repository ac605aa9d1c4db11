use super::{
    composer_state::ComposerState,
    message_list_state::MessageListState,
    session::Session,
    status::{SignInStatus, SyncHealth},
};

/// The UI toggle: which signed-in view is on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShellView {
    #[default]
    List,
    Composer,
}

/// What the shell renders, derived from the session and the toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    SignIn,
    MessageList,
    Composer,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellState {
    running: bool,
    session: Option<Session>,
    view: ShellView,
    sign_in: SignInStatus,
    message_list: MessageListState,
    composer: ComposerState,
    sync_health: SyncHealth,
    room_prompt: Option<String>,
}

impl Default for ShellState {
    fn default() -> Self {
        Self {
            running: true,
            session: None,
            view: ShellView::List,
            sign_in: SignInStatus::Idle,
            message_list: MessageListState::default(),
            composer: ComposerState::default(),
            sync_health: SyncHealth::Idle,
            room_prompt: None,
        }
    }
}

impl ShellState {
    pub fn with_room_prompt(prompt: Option<String>) -> Self {
        Self {
            room_prompt: prompt,
            ..Self::default()
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn screen(&self) -> Screen {
        match (&self.session, self.view) {
            (None, _) => Screen::SignIn,
            (Some(_), ShellView::List) => Screen::MessageList,
            (Some(_), ShellView::Composer) => Screen::Composer,
        }
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Entering a session always starts on the list; leaving one drops all signed-in state.
    pub fn set_session(&mut self, session: Option<Session>) {
        match session {
            Some(session) => {
                let same_user = self
                    .session
                    .as_ref()
                    .is_some_and(|current| current.uid == session.uid);
                if !same_user {
                    self.view = ShellView::List;
                    self.composer.reset();
                }
                self.sign_in = SignInStatus::Idle;
                self.session = Some(session);
            }
            None => {
                self.session = None;
                self.view = ShellView::List;
                self.composer.reset();
                self.message_list.reset();
                self.sync_health = SyncHealth::Idle;
            }
        }
    }

    pub fn view(&self) -> ShellView {
        self.view
    }

    pub fn set_view(&mut self, view: ShellView) {
        self.view = view;
    }

    pub fn sign_in(&self) -> &SignInStatus {
        &self.sign_in
    }

    pub fn set_sign_in(&mut self, status: SignInStatus) {
        self.sign_in = status;
    }

    pub fn message_list(&self) -> &MessageListState {
        &self.message_list
    }

    pub fn message_list_mut(&mut self) -> &mut MessageListState {
        &mut self.message_list
    }

    pub fn composer(&self) -> &ComposerState {
        &self.composer
    }

    pub fn composer_mut(&mut self) -> &mut ComposerState {
        &mut self.composer
    }

    pub fn sync_health(&self) -> SyncHealth {
        self.sync_health
    }

    pub fn set_sync_health(&mut self, health: SyncHealth) {
        self.sync_health = health;
    }

    pub fn room_prompt(&self) -> Option<&str> {
        self.room_prompt.as_deref()
    }
}
