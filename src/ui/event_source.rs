use std::{
    sync::mpsc::{Receiver, TryRecvError},
    time::Duration,
};

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::{
    domain::events::{AppEvent, BackendEvent, KeyInput},
    usecases::contracts::AppEventSource,
};

const EVENT_POLL_TIMEOUT: Duration = Duration::from_millis(100);

/// Terminal input merged with backend results; backend results are delivered first.
pub struct CrosstermEventSource {
    backend_events: Receiver<BackendEvent>,
    backend_closed: bool,
}

impl CrosstermEventSource {
    pub fn new(backend_events: Receiver<BackendEvent>) -> Self {
        Self {
            backend_events,
            backend_closed: false,
        }
    }

    fn next_backend_event(&mut self) -> Option<BackendEvent> {
        if self.backend_closed {
            return None;
        }

        match self.backend_events.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                tracing::warn!("backend event channel closed");
                self.backend_closed = true;
                None
            }
        }
    }
}

impl AppEventSource for CrosstermEventSource {
    fn next_event(&mut self) -> Result<Option<AppEvent>> {
        if let Some(event) = self.next_backend_event() {
            return Ok(Some(AppEvent::Backend(event)));
        }

        if !event::poll(EVENT_POLL_TIMEOUT)? {
            return Ok(Some(AppEvent::Tick));
        }

        match event::read()? {
            Event::Key(key) => Ok(map_key(key)),
            _ => Ok(None),
        }
    }
}

fn map_key(key: KeyEvent) -> Option<AppEvent> {
    if key.kind != KeyEventKind::Press {
        return None;
    }

    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    if ctrl && key.code == KeyCode::Char('c') {
        return Some(AppEvent::QuitRequested);
    }

    let name = match key.code {
        KeyCode::Char(ch) => ch.to_string(),
        KeyCode::Enter => "enter".to_owned(),
        KeyCode::Esc => "esc".to_owned(),
        KeyCode::Tab | KeyCode::BackTab => "tab".to_owned(),
        KeyCode::Backspace => "backspace".to_owned(),
        KeyCode::Delete => "delete".to_owned(),
        KeyCode::Left => "left".to_owned(),
        KeyCode::Right => "right".to_owned(),
        KeyCode::Up => "up".to_owned(),
        KeyCode::Down => "down".to_owned(),
        KeyCode::Home => "home".to_owned(),
        KeyCode::End => "end".to_owned(),
        _ => return None,
    };

    Some(AppEvent::InputKey(KeyInput::new(name, ctrl)))
}

#[cfg(test)]
pub struct MockEventSource {
    queue: std::collections::VecDeque<AppEvent>,
}

#[cfg(test)]
impl MockEventSource {
    pub fn from(events: Vec<AppEvent>) -> Self {
        Self {
            queue: events.into(),
        }
    }
}

#[cfg(test)]
impl AppEventSource for MockEventSource {
    fn next_event(&mut self) -> Result<Option<AppEvent>> {
        Ok(self.queue.pop_front())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;

    use super::*;

    fn press(code: KeyCode, modifiers: KeyModifiers) -> Option<AppEvent> {
        map_key(KeyEvent::new(code, modifiers))
    }

    #[test]
    fn ctrl_c_requests_quit() {
        assert_eq!(
            press(KeyCode::Char('c'), KeyModifiers::CONTROL),
            Some(AppEvent::QuitRequested)
        );
    }

    #[test]
    fn plain_q_is_passed_through_as_text() {
        assert_eq!(
            press(KeyCode::Char('q'), KeyModifiers::NONE),
            Some(AppEvent::InputKey(KeyInput::new("q", false)))
        );
    }

    #[test]
    fn named_keys_map_to_stable_names() {
        assert_eq!(
            press(KeyCode::Enter, KeyModifiers::NONE),
            Some(AppEvent::InputKey(KeyInput::new("enter", false)))
        );
        assert_eq!(
            press(KeyCode::BackTab, KeyModifiers::SHIFT),
            Some(AppEvent::InputKey(KeyInput::new("tab", false)))
        );
        assert_eq!(press(KeyCode::F(5), KeyModifiers::NONE), None);
    }

    #[test]
    fn ctrl_modifier_is_reported() {
        assert_eq!(
            press(KeyCode::Char('w'), KeyModifiers::CONTROL),
            Some(AppEvent::InputKey(KeyInput::new("w", true)))
        );
    }

    #[test]
    fn pending_backend_event_is_delivered_before_terminal_input() {
        let (tx, rx) = mpsc::channel();
        tx.send(BackendEvent::SessionChanged(None))
            .expect("channel open");
        let mut source = CrosstermEventSource::new(rx);

        let event = source.next_event().expect("must read backend event");

        assert_eq!(
            event,
            Some(AppEvent::Backend(BackendEvent::SessionChanged(None)))
        );
    }

    #[test]
    fn mock_source_replays_events_in_order() {
        let mut source = MockEventSource::from(vec![AppEvent::Tick, AppEvent::QuitRequested]);

        assert_eq!(source.next_event().expect("tick"), Some(AppEvent::Tick));
        assert_eq!(
            source.next_event().expect("quit"),
            Some(AppEvent::QuitRequested)
        );
        assert_eq!(source.next_event().expect("empty"), None);
    }
}
