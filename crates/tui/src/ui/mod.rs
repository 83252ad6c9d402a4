pub mod components;
pub mod keymap;
pub mod screens;

mod terminal;
mod theme;

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
};

use engine::{Console, EngineError};

use crate::app::{AppState, Section};

use components::hints::{KeyHint, common, hint_separator, hints_to_spans};

pub use terminal::{AppTerminal as Terminal, restore_terminal, setup_terminal};
use theme::Theme;

pub fn render(frame: &mut Frame<'_>, state: &AppState, console: &Console) {
    let theme = Theme::default();
    let area = frame.area();

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Info bar
            Constraint::Length(2), // Tab bar
            Constraint::Min(0),    // Main content
            Constraint::Length(1), // Bottom bar
        ])
        .split(area);

    render_info_bar(frame, layout[0], state, console, &theme);
    components::tabs::render_tabs(frame, layout[1], state.section, &theme);

    match state.section.kind() {
        None => screens::cash_flows::render(frame, layout[2], state, console),
        Some(kind) => screens::dictionary::render(frame, layout[2], state, console, kind),
    }

    render_bottom_bar(frame, layout[3], state, &theme);

    if let Some(modal) = &state.modal {
        components::modal::render(frame, area, modal, &console.dictionaries(), &theme);
    }
    components::toast::render(frame, area, state.toast.as_ref(), &theme);
}

fn render_info_bar(
    frame: &mut Frame<'_>,
    area: Rect,
    state: &AppState,
    console: &Console,
    theme: &Theme,
) {
    let pager_error = match state.section {
        Section::CashFlows => console.records().last_error(),
        _ => console.browser().last_error(),
    };
    let (status, status_style) = match pager_error {
        Some(_) => ("ERR", Style::default().fg(theme.error)),
        None => ("OK", Style::default().fg(theme.positive)),
    };

    let line = Line::from(vec![
        Span::styled("Source", Style::default().fg(theme.dim)),
        Span::raw(format!(": {}  ", state.source)),
        Span::styled(status, status_style),
    ]);

    frame.render_widget(Paragraph::new(line), area);
}

fn render_bottom_bar(frame: &mut Frame<'_>, area: Rect, state: &AppState, theme: &Theme) {
    let context = match (&state.modal, state.section) {
        (Some(_), _) => Vec::new(),
        (None, Section::CashFlows) => {
            let mut hints = common::list();
            hints.extend(common::filters());
            hints
        }
        (None, _) => common::list(),
    };

    let mut parts = hints_to_spans(&[KeyHint::new("1-5", "section")], theme);
    if !context.is_empty() {
        parts.push(hint_separator(theme));
        parts.extend(hints_to_spans(&context, theme));
    }
    parts.push(hint_separator(theme));
    parts.extend(hints_to_spans(&[KeyHint::new("q", "quit")], theme));

    frame.render_widget(Paragraph::new(Line::from(parts)), area);
}

/// Text shown to the operator for a failed engine call.
pub fn message_for_error(err: &EngineError) -> String {
    match err {
        EngineError::ValidationFailed(msg)
        | EngineError::InvalidReference(msg)
        | EngineError::PreconditionFailed(msg) => msg.clone(),
        EngineError::NotFound(what) => format!("Not found: {what}"),
        EngineError::Conflict(msg) => format!("Refused: {msg}"),
        EngineError::Transport {
            status: Some(status),
            body,
        } if (400..500).contains(status) => format!("Rejected by server: {body}"),
        EngineError::Transport {
            status: Some(status),
            ..
        } => format!("Server error ({status})"),
        EngineError::Transport { status: None, .. } => "Server unreachable".to_string(),
        EngineError::Unknown(msg) => format!("Unexpected response: {msg}"),
    }
}
