use chrono::Local;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

use crate::{
    domain::{
        shell_state::{Screen, ShellState, ShellView},
        status::SignInStatus,
    },
    usecases::sign_in::failure_message,
};

use super::{composer_view::render_composer, message_card, styles};

const APP_TITLE: &str = "bchat";
const TOGGLE_CREATE_LABEL: &str = "Create a message!";
const TOGGLE_CANCEL_LABEL: &str = "Cancel";

pub fn render(frame: &mut Frame<'_>, state: &mut ShellState) {
    let screen = state.screen();
    let signed_in = screen != Screen::SignIn;
    let show_prompt = signed_in && state.room_prompt().is_some();

    let [header_area, prompt_area, body_area, toggle_area, status_area] = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(u16::from(show_prompt)),
            Constraint::Min(1),
            Constraint::Length(u16::from(signed_in)),
            Constraint::Length(1),
        ])
        .areas(frame.area());

    frame.render_widget(Paragraph::new(header_line(state)), header_area);

    if show_prompt {
        if let Some(prompt) = state.room_prompt() {
            frame.render_widget(
                Paragraph::new(Line::from(Span::styled(
                    prompt.to_owned(),
                    styles::room_prompt_style(),
                )))
                .alignment(Alignment::Center),
                prompt_area,
            );
        }
    }

    match screen {
        Screen::SignIn => render_sign_in(frame, body_area, state.sign_in()),
        Screen::MessageList => render_message_list(frame, body_area, state),
        Screen::Composer => render_composer(frame, body_area, state.composer()),
    }

    if signed_in {
        frame.render_widget(Paragraph::new(toggle_line(state.view())), toggle_area);
    }

    frame.render_widget(Paragraph::new(status_line(state)), status_area);
}

fn header_line(state: &ShellState) -> Line<'static> {
    let mut spans = vec![Span::styled(APP_TITLE, styles::header_title_style())];

    if let Some(session) = state.session() {
        spans.push(Span::styled(
            format!(" | {} | o: sign out", session.display_name),
            styles::header_detail_style(),
        ));
    }

    Line::from(spans)
}

fn toggle_line(view: ShellView) -> Line<'static> {
    let (label, style) = match view {
        ShellView::List => (TOGGLE_CREATE_LABEL, styles::toggle_create_style()),
        ShellView::Composer => (TOGGLE_CANCEL_LABEL, styles::toggle_cancel_style()),
    };

    Line::from(vec![
        Span::styled(format!(" {label} "), style),
        Span::styled(" [Tab]", styles::hint_style()),
    ])
}

fn sign_in_lines(status: &SignInStatus) -> Vec<Line<'static>> {
    let mut lines = vec![
        Line::from(Span::styled(
            "Welcome to bchat",
            styles::header_title_style(),
        )),
        Line::from("You can only sign in with Google."),
        Line::default(),
    ];

    match status {
        SignInStatus::Idle => {
            lines.push(Line::from("Press Enter to sign in with Google."));
        }
        SignInStatus::Starting => {
            lines.push(Line::from("Contacting Google..."));
        }
        SignInStatus::AwaitingUser(prompt) => {
            lines.push(Line::from(vec![
                Span::raw("Open "),
                Span::styled(prompt.verification_url.clone(), styles::sign_in_link_style()),
                Span::raw(" and enter the code"),
            ]));
            lines.push(Line::from(Span::styled(
                prompt.user_code.clone(),
                styles::sign_in_code_style(),
            )));
            lines.push(Line::default());
            lines.push(Line::from(Span::styled(
                "Waiting for confirmation. Esc cancels.",
                styles::hint_style(),
            )));
        }
        SignInStatus::Failed(failure) => {
            lines.push(Line::from(Span::styled(
                failure_message(*failure),
                styles::error_style(),
            )));
        }
    }

    lines
}

fn render_sign_in(frame: &mut Frame<'_>, area: Rect, status: &SignInStatus) {
    let panel = Paragraph::new(sign_in_lines(status))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .title("Sign in")
                .borders(Borders::ALL)
                .border_style(styles::panel_border_style()),
        );
    frame.render_widget(panel, area);
}

fn render_message_list(frame: &mut Frame<'_>, area: Rect, state: &mut ShellState) {
    let block = Block::default()
        .title("Messages")
        .borders(Borders::ALL)
        .border_style(styles::panel_border_style());

    let list_state = state.message_list();
    if !list_state.is_visible() {
        frame.render_widget(block, area);
        return;
    }

    if list_state.messages().is_empty() {
        let hint = if list_state.has_snapshot() {
            "No messages yet. Press Tab to write the first one."
        } else {
            "Waiting for messages..."
        };
        frame.render_widget(
            Paragraph::new(Span::styled(hint, styles::hint_style())).block(block),
            area,
        );
        return;
    }

    // Inner width = area width - 2 (borders)
    let inner_width = area.width.saturating_sub(2) as usize;
    let now = Local::now();
    let viewer = state.session();
    let items: Vec<ListItem<'static>> = list_state
        .messages()
        .iter()
        .filter_map(|message| message_card::card_item(message, viewer, inner_width, now))
        .collect();

    let selected = list_state.selected_index();
    let viewport_rows = area.height.saturating_sub(2) as usize;
    if let Some(index) = selected {
        let card_heights: Vec<usize> = items.iter().map(ListItem::height).collect();
        state
            .message_list_mut()
            .update_scroll_offset(index, &card_heights, viewport_rows);
    }

    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));

    let mut widget_state = ListState::default();
    widget_state.select(selected);
    *widget_state.offset_mut() = state.message_list().scroll_offset();
    frame.render_stateful_widget(list, area, &mut widget_state);
}

fn status_line(state: &ShellState) -> String {
    let sync = state.sync_health().as_label();
    let nav_hint = match state.screen() {
        Screen::SignIn => "Enter: sign in | Esc: cancel | q: quit",
        Screen::MessageList => "j/k: select | Tab: new message | r: reconnect | q: quit",
        Screen::Composer => "Enter: send | Esc: cancel",
    };
    format!("sync: {sync} | {nav_hint}")
}
