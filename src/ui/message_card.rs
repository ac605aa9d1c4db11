//! Rendering of a single message: avatar badge and link, author, time and wrapped text.

use chrono::{DateTime, Local, Utc};
use ratatui::{
    text::{Line, Span},
    widgets::ListItem,
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::domain::{message::Message, session::Session};

use super::styles;

/// Body lines are indented to start under the author name.
const BODY_INDENT: &str = "    ";
const PENDING_TIME: &str = "sending";
const UNKNOWN_AUTHOR: &str = "Unknown";
const ELLIPSIS: char = '…';

/// Builds the list row for one message. Nothing is rendered without an active session.
pub fn card_item(
    message: &Message,
    viewer: Option<&Session>,
    width: usize,
    now: DateTime<Local>,
) -> Option<ListItem<'static>> {
    let lines = card_lines(message, viewer, width, now);
    if lines.is_empty() {
        return None;
    }
    Some(ListItem::new(lines))
}

fn card_lines(
    message: &Message,
    viewer: Option<&Session>,
    width: usize,
    now: DateTime<Local>,
) -> Vec<Line<'static>> {
    let Some(viewer) = viewer else {
        return Vec::new();
    };

    let name_style = if message.is_authored_by(&viewer.uid) {
        styles::own_author_name_style()
    } else {
        styles::author_name_style()
    };

    let mut lines = vec![Line::from(vec![
        Span::styled(
            format!(" {} ", message.avatar_initial()),
            styles::avatar_badge_style(),
        ),
        Span::raw(" "),
        Span::styled(author_name(message).to_owned(), name_style),
        Span::raw("  "),
        Span::styled(
            format_card_time(message.created_at, now),
            styles::message_time_style(),
        ),
    ])];

    let body_width = width.saturating_sub(BODY_INDENT.len());

    // Terminals cannot draw the picture, so the card carries its link.
    if let Some(photo_url) = message
        .photo_url
        .as_deref()
        .map(str::trim)
        .filter(|url| !url.is_empty())
    {
        lines.push(Line::from(vec![
            Span::raw(BODY_INDENT),
            Span::styled(
                truncate_to_width(photo_url, body_width),
                styles::avatar_link_style(),
            ),
        ]));
    }

    for text in wrap_text(&message.para, body_width) {
        lines.push(Line::from(vec![
            Span::raw(BODY_INDENT),
            Span::styled(text, styles::message_text_style()),
        ]));
    }

    lines.push(Line::default());
    lines
}

fn author_name(message: &Message) -> &str {
    let name = message.name.trim();
    if name.is_empty() {
        UNKNOWN_AUTHOR
    } else {
        name
    }
}

/// Time only for today's messages, date and time otherwise.
pub fn format_card_time(created_at: Option<DateTime<Utc>>, now: DateTime<Local>) -> String {
    let Some(created_at) = created_at else {
        return PENDING_TIME.to_owned();
    };

    let local = created_at.with_timezone(&Local);
    if local.date_naive() == now.date_naive() {
        local.format("%H:%M").to_string()
    } else {
        local.format("%-d %b %H:%M").to_string()
    }
}

/// Cuts `text` to `width` display columns, marking the cut with an ellipsis.
fn truncate_to_width(text: &str, width: usize) -> String {
    if text.width() <= width {
        return text.to_owned();
    }

    let budget = width.saturating_sub(1);
    let mut used = 0;
    let mut truncated = String::new();
    for ch in text.chars() {
        let ch_width = ch.width().unwrap_or(0);
        if used + ch_width > budget {
            break;
        }
        truncated.push(ch);
        used += ch_width;
    }
    if width > 0 {
        truncated.push(ELLIPSIS);
    }
    truncated
}

/// Greedy word wrap by display width; words wider than a line are split.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();

    for raw_line in text.lines() {
        let mut current = String::new();
        let mut current_width = 0;

        for word in raw_line.split_whitespace() {
            let word_width = word.width();

            if current_width > 0 && current_width + 1 + word_width > width {
                lines.push(std::mem::take(&mut current));
                current_width = 0;
            }

            if word_width > width {
                for ch in word.chars() {
                    let ch_width = ch.width().unwrap_or(0);
                    if current_width > 0 && current_width + ch_width > width {
                        lines.push(std::mem::take(&mut current));
                        current_width = 0;
                    }
                    current.push(ch);
                    current_width += ch_width;
                }
                continue;
            }

            if current_width > 0 {
                current.push(' ');
                current_width += 1;
            }
            current.push_str(word);
            current_width += word_width;
        }

        lines.push(current);
    }

    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    fn ann() -> Session {
        Session::new("u1", "Ann", Some("a.png".to_owned()))
    }

    fn message(uid: &str, name: &str, para: &str) -> Message {
        Message {
            id: "m1".to_owned(),
            name: name.to_owned(),
            photo_url: Some("a.png".to_owned()),
            uid: uid.to_owned(),
            para: para.to_owned(),
            created_at: Some(fixed_time()),
        }
    }

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0)
            .single()
            .expect("valid timestamp")
    }

    fn line_text(line: &Line<'_>) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn renders_nothing_without_session() {
        let now = fixed_time().with_timezone(&Local);

        assert!(card_lines(&message("u1", "Ann", "hi"), None, 40, now).is_empty());
        assert!(card_item(&message("u1", "Ann", "hi"), None, 40, now).is_none());
    }

    #[test]
    fn renders_badge_author_time_avatar_and_text() {
        let now = fixed_time().with_timezone(&Local);
        let lines = card_lines(&message("u1", "Ann", "hi"), Some(&ann()), 40, now);

        let header = line_text(&lines[0]);
        assert!(header.contains(" A "));
        assert!(header.contains("Ann"));
        assert!(header.contains(&format_card_time(Some(fixed_time()), now)));
        assert_eq!(line_text(&lines[1]), "    a.png");
        assert_eq!(lines[1].spans[1].style, styles::avatar_link_style());
        assert_eq!(line_text(&lines[2]), "    hi");
    }

    #[test]
    fn card_without_photo_has_no_avatar_line() {
        let now = fixed_time().with_timezone(&Local);
        let mut without_photo = message("u2", "Bob", "yo");
        without_photo.photo_url = None;

        let lines = card_lines(&without_photo, Some(&ann()), 40, now);

        assert_eq!(lines.len(), 3);
        assert_eq!(line_text(&lines[1]), "    yo");
    }

    #[test]
    fn long_avatar_link_is_cut_to_card_width() {
        let now = fixed_time().with_timezone(&Local);
        let mut long_photo = message("u2", "Bob", "yo");
        long_photo.photo_url = Some("https://lh3.googleusercontent.com/a/very-long-id".to_owned());

        let lines = card_lines(&long_photo, Some(&ann()), 20, now);

        let link = line_text(&lines[1]);
        assert_eq!(link.width(), 20);
        assert!(link.ends_with(ELLIPSIS));
    }

    #[test]
    fn truncate_cuts_only_text_wider_than_limit() {
        assert_eq!(truncate_to_width("a.png", 10), "a.png");
        assert_eq!(truncate_to_width("abcdef", 4), "abc…");
    }

    #[test]
    fn own_messages_use_distinct_name_style() {
        let now = fixed_time().with_timezone(&Local);
        let own = card_lines(&message("u1", "Ann", "hi"), Some(&ann()), 40, now);
        let other = card_lines(&message("u2", "Bob", "yo"), Some(&ann()), 40, now);

        assert_eq!(own[0].spans[2].style, styles::own_author_name_style());
        assert_eq!(other[0].spans[2].style, styles::author_name_style());
    }

    #[test]
    fn blank_author_falls_back_to_placeholder() {
        let now = fixed_time().with_timezone(&Local);
        let lines = card_lines(&message("u2", "  ", "hi"), Some(&ann()), 40, now);

        assert!(line_text(&lines[0]).contains(UNKNOWN_AUTHOR));
    }

    #[test]
    fn time_shows_date_for_older_messages() {
        let today = fixed_time().with_timezone(&Local);
        let later = (fixed_time() + Duration::days(3)).with_timezone(&Local);

        assert_eq!(
            format_card_time(Some(fixed_time()), today),
            fixed_time().with_timezone(&Local).format("%H:%M").to_string()
        );
        assert!(format_card_time(Some(fixed_time()), later).len() > 5);
        assert_eq!(format_card_time(None, today), PENDING_TIME);
    }

    #[test]
    fn wraps_on_word_boundaries() {
        assert_eq!(wrap_text("hello world", 5), vec!["hello", "world"]);
        assert_eq!(wrap_text("a b c", 3), vec!["a b", "c"]);
    }

    #[test]
    fn splits_words_wider_than_the_line() {
        assert_eq!(wrap_text("abcdefgh", 3), vec!["abc", "def", "gh"]);
    }

    #[test]
    fn wrap_measures_display_width() {
        assert_eq!(wrap_text("日本語", 4), vec!["日本", "語"]);
    }

    #[test]
    fn wrap_keeps_explicit_line_breaks() {
        assert_eq!(wrap_text("one\n\ntwo", 10), vec!["one", "", "two"]);
        assert_eq!(wrap_text("", 10), vec![""]);
    }
}
