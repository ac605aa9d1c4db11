//! Style definitions for the UI components.

use ratatui::style::{Color, Modifier, Style};

// =============================================================================
// Chrome
// =============================================================================

/// App title in the header row.
pub fn header_title_style() -> Style {
    Style::default()
        .fg(Color::Cyan)
        .add_modifier(Modifier::BOLD)
}

/// Signed-in user and other header details.
pub fn header_detail_style() -> Style {
    Style::default().fg(Color::Gray)
}

/// Room prompt banner above the list.
pub fn room_prompt_style() -> Style {
    Style::default()
        .fg(Color::Yellow)
        .add_modifier(Modifier::ITALIC)
}

/// Key hints and secondary help text.
pub fn hint_style() -> Style {
    Style::default().fg(Color::DarkGray)
}

pub fn panel_border_style() -> Style {
    Style::default().fg(Color::Cyan)
}

/// Toggle while the list is shown ("Create a message!").
pub fn toggle_create_style() -> Style {
    Style::default()
        .fg(Color::Black)
        .bg(Color::Green)
        .add_modifier(Modifier::BOLD)
}

/// Toggle while the composer is shown ("Cancel").
pub fn toggle_cancel_style() -> Style {
    Style::default()
        .fg(Color::White)
        .bg(Color::Red)
        .add_modifier(Modifier::BOLD)
}

// =============================================================================
// Sign-in
// =============================================================================

pub fn sign_in_code_style() -> Style {
    Style::default()
        .fg(Color::Yellow)
        .add_modifier(Modifier::BOLD)
}

pub fn sign_in_link_style() -> Style {
    Style::default()
        .fg(Color::Cyan)
        .add_modifier(Modifier::UNDERLINED)
}

/// Error codes and failure notices.
pub fn error_style() -> Style {
    Style::default().fg(Color::Red)
}

// =============================================================================
// Message cards
// =============================================================================

/// Avatar initial badge.
pub fn avatar_badge_style() -> Style {
    Style::default()
        .fg(Color::Black)
        .bg(Color::Cyan)
        .add_modifier(Modifier::BOLD)
}

/// Avatar image link shown under the card header.
pub fn avatar_link_style() -> Style {
    Style::default()
        .fg(Color::DarkGray)
        .add_modifier(Modifier::UNDERLINED)
}

pub fn author_name_style() -> Style {
    Style::default()
        .fg(Color::White)
        .add_modifier(Modifier::BOLD)
}

/// Author name on the signed-in user's own messages.
pub fn own_author_name_style() -> Style {
    Style::default()
        .fg(Color::Green)
        .add_modifier(Modifier::BOLD)
}

pub fn message_time_style() -> Style {
    Style::default().fg(Color::DarkGray)
}

pub fn message_text_style() -> Style {
    Style::default().fg(Color::White)
}

// =============================================================================
// Composer
// =============================================================================

pub fn input_prompt_style() -> Style {
    Style::default().fg(Color::Cyan)
}

pub fn input_text_style() -> Style {
    Style::default().fg(Color::White)
}

pub fn input_placeholder_style() -> Style {
    Style::default().fg(Color::DarkGray)
}
