use super::{message_input_state::MessageInputState, status::StoreFailure};

/// Why the last submit did not go through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposerNotice {
    EmptyMessage,
    TooLong,
    Rejected(StoreFailure),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ComposerState {
    input: MessageInputState,
    submitting: bool,
    notice: Option<ComposerNotice>,
}

impl ComposerState {
    pub fn input(&self) -> &MessageInputState {
        &self.input
    }

    /// Edits are refused while a write is in flight.
    pub fn input_mut(&mut self) -> Option<&mut MessageInputState> {
        if self.submitting {
            return None;
        }
        self.notice = None;
        Some(&mut self.input)
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub fn notice(&self) -> Option<ComposerNotice> {
        self.notice
    }

    pub fn begin_submit(&mut self) {
        self.submitting = true;
        self.notice = None;
    }

    pub fn reject(&mut self, notice: ComposerNotice) {
        self.submitting = false;
        self.notice = Some(notice);
    }

    pub fn complete_submit(&mut self) {
        self.submitting = false;
        self.notice = None;
        self.input.clear();
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
