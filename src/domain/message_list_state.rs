use super::{events::SubscriptionId, message::Message};

/// Whether a delivered snapshot was rendered or dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotOutcome {
    Applied,
    Stale,
}

/// Rendered side of the live query.
///
/// Each snapshot replaces the whole list. The selection is tracked by message id so the
/// same card stays selected when a newer snapshot shifts positions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageListState {
    messages: Vec<Message>,
    has_snapshot: bool,
    visible: bool,
    subscription: Option<SubscriptionId>,
    selected_id: Option<String>,
    scroll_offset: usize,
}

impl Default for MessageListState {
    fn default() -> Self {
        Self {
            messages: Vec::new(),
            has_snapshot: false,
            visible: true,
            subscription: None,
            selected_id: None,
            scroll_offset: 0,
        }
    }
}

impl MessageListState {
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn has_snapshot(&self) -> bool {
        self.has_snapshot
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn subscription(&self) -> Option<SubscriptionId> {
        self.subscription
    }

    pub fn scroll_offset(&self) -> usize {
        self.scroll_offset
    }

    pub fn selected_id(&self) -> Option<&str> {
        self.selected_id.as_deref()
    }

    pub fn selected_index(&self) -> Option<usize> {
        let id = self.selected_id.as_deref()?;
        self.messages.iter().position(|message| message.id == id)
    }

    /// Binds the list to a freshly acquired subscription and shows it.
    pub fn attach(&mut self, subscription: SubscriptionId) {
        self.subscription = Some(subscription);
        self.visible = true;
    }

    /// Shows the list without a live subscription, used when re-subscribing failed.
    pub fn show(&mut self) {
        self.visible = true;
    }

    /// Hides the list and forgets the subscription; the last snapshot stays for re-show.
    pub fn detach(&mut self) {
        self.subscription = None;
        self.visible = false;
    }

    pub fn apply_snapshot(
        &mut self,
        subscription: SubscriptionId,
        messages: Vec<Message>,
    ) -> SnapshotOutcome {
        if self.subscription != Some(subscription) {
            return SnapshotOutcome::Stale;
        }

        let follow_tail = self.is_tail_selected();
        self.messages = messages;
        self.has_snapshot = true;

        let selection_survived = self
            .selected_id
            .as_deref()
            .is_some_and(|id| self.messages.iter().any(|message| message.id == id));

        if follow_tail || !selection_survived {
            self.selected_id = self.messages.last().map(|message| message.id.clone());
        }

        SnapshotOutcome::Applied
    }

    /// Drops everything, used when the session ends.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn select_next(&mut self) {
        let next = match self.selected_index() {
            Some(idx) if idx + 1 < self.messages.len() => idx + 1,
            Some(idx) => idx,
            None if self.messages.is_empty() => return,
            None => 0,
        };
        self.selected_id = Some(self.messages[next].id.clone());
    }

    pub fn select_previous(&mut self) {
        let previous = match self.selected_index() {
            Some(idx) => idx.saturating_sub(1),
            None if self.messages.is_empty() => return,
            None => self.messages.len() - 1,
        };
        self.selected_id = Some(self.messages[previous].id.clone());
    }

    /// Moves the first rendered card so the selected card fits in `viewport_rows`.
    ///
    /// The offset counts cards; `card_heights` gives each card's height in rows.
    pub fn update_scroll_offset(
        &mut self,
        selected: usize,
        card_heights: &[usize],
        viewport_rows: usize,
    ) {
        if card_heights.is_empty() || viewport_rows == 0 {
            return;
        }

        let selected = selected.min(card_heights.len() - 1);
        if selected < self.scroll_offset {
            self.scroll_offset = selected;
        }

        let mut rows: usize = card_heights[self.scroll_offset..=selected].iter().sum();
        while rows > viewport_rows && self.scroll_offset < selected {
            rows -= card_heights[self.scroll_offset];
            self.scroll_offset += 1;
        }
    }

    fn is_tail_selected(&self) -> bool {
        match (self.selected_id.as_deref(), self.messages.last()) {
            (None, _) => true,
            (Some(id), Some(last)) => last.id == id,
            (Some(_), None) => true,
        }
    }
}
