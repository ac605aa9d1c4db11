//! Composer rendering: the single-line input, its counter and the last submit notice.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};
use unicode_width::UnicodeWidthChar;

use crate::domain::{
    composer_state::{ComposerNotice, ComposerState},
    message_input_state::{MessageInputState, MAX_MESSAGE_CHARS},
};

use super::styles;

const PLACEHOLDER_TEXT: &str = "Type your message and press Enter to send";
const PROMPT_SYMBOL: &str = "> ";

pub fn render_composer(frame: &mut Frame<'_>, area: Rect, composer: &ComposerState) {
    let [input_area, notice_area, _] = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(1),
            Constraint::Min(0),
        ])
        .areas(area);

    let input = composer.input();
    let title = format!(
        "New message ({}/{})",
        input.char_count(),
        MAX_MESSAGE_CHARS
    );

    // 2 border columns plus the prompt
    let text_width = (input_area.width as usize)
        .saturating_sub(2)
        .saturating_sub(PROMPT_SYMBOL.len());
    let (visible, cursor_col) = visible_input(input, text_width);

    let paragraph = Paragraph::new(build_input_line(input, visible)).block(
        Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(styles::panel_border_style()),
    );
    frame.render_widget(paragraph, input_area);

    if !composer.is_submitting() {
        let cursor_x = input_area
            .x
            .saturating_add(1)
            .saturating_add(PROMPT_SYMBOL.len() as u16)
            .saturating_add(cursor_col.min(u16::MAX as usize) as u16);
        frame.set_cursor_position((cursor_x, input_area.y.saturating_add(1)));
    }

    frame.render_widget(Paragraph::new(notice_line(composer)), notice_area);
}

fn build_input_line(input: &MessageInputState, visible: String) -> Line<'static> {
    let prompt = Span::styled(PROMPT_SYMBOL.to_owned(), styles::input_prompt_style());

    if input.is_empty() {
        return Line::from(vec![
            prompt,
            Span::styled(
                PLACEHOLDER_TEXT.to_owned(),
                styles::input_placeholder_style(),
            ),
        ]);
    }

    Line::from(vec![
        prompt,
        Span::styled(visible, styles::input_text_style()),
    ])
}

/// Slice of the input that fits `width` columns with the cursor kept in view.
///
/// Returns the slice and the cursor column inside it.
fn visible_input(input: &MessageInputState, width: usize) -> (String, usize) {
    let chars: Vec<char> = input.text().chars().collect();
    let cursor = input.cursor_position().min(chars.len());
    let width = width.max(1);

    let char_width = |ch: char| ch.width().unwrap_or(0);

    // Walk left from the cursor until the window is full.
    let mut start = cursor;
    let mut used = 0;
    while start > 0 {
        let next = char_width(chars[start - 1]);
        if used + next >= width {
            break;
        }
        used += next;
        start -= 1;
    }
    let cursor_col = used;

    let mut end = cursor;
    while end < chars.len() {
        let next = char_width(chars[end]);
        if used + next > width {
            break;
        }
        used += next;
        end += 1;
    }

    (chars[start..end].iter().collect(), cursor_col)
}

fn notice_line(composer: &ComposerState) -> Line<'static> {
    if composer.is_submitting() {
        return Line::from(Span::styled("Sending...", styles::hint_style()));
    }

    match composer.notice() {
        None => Line::from(Span::styled(
            "Enter: send | Tab/Esc: back to messages | Ctrl+W: delete word",
            styles::hint_style(),
        )),
        Some(ComposerNotice::EmptyMessage) => Line::from(Span::styled(
            "Type something before sending.",
            styles::error_style(),
        )),
        Some(ComposerNotice::TooLong) => Line::from(Span::styled(
            format!("Messages are limited to {MAX_MESSAGE_CHARS} characters."),
            styles::error_style(),
        )),
        Some(ComposerNotice::Rejected(failure)) => Line::from(Span::styled(
            format!(
                "{}: message was not sent. Your text is kept.",
                failure.code()
            ),
            styles::error_style(),
        )),
    }
}
