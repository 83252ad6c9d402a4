use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph, Wrap},
};

use engine::Dictionaries;

use crate::{
    app::{CashFlowField, DictionaryField, Modal},
    ui::{
        components::hints::{common, hints_to_spans},
        theme::Theme,
    },
};

pub fn render(frame: &mut Frame<'_>, area: Rect, modal: &Modal, dict: &Dictionaries, theme: &Theme) {
    let mut lines = match modal {
        Modal::CashFlowForm { draft, focus, .. } => CashFlowField::all()
            .into_iter()
            .map(|field| {
                let value = match field {
                    CashFlowField::Status => {
                        name_or_dash(draft.status_id.and_then(|id| dict.status(id)).map(|s| &s.name))
                    }
                    CashFlowField::Type => name_or_dash(
                        draft
                            .type_id
                            .and_then(|id| dict.cash_flow_type(id))
                            .map(|t| &t.name),
                    ),
                    CashFlowField::Category => name_or_dash(
                        draft
                            .category_id
                            .and_then(|id| dict.category(id))
                            .map(|c| &c.name),
                    ),
                    CashFlowField::Subcategory => name_or_dash(
                        draft
                            .subcategory_id
                            .and_then(|id| dict.subcategory(id))
                            .map(|s| &s.name),
                    ),
                    CashFlowField::Amount => draft.amount.clone(),
                    CashFlowField::Comment => draft.comment.clone(),
                };
                field_line(field.label(), value, field == *focus, field.is_selector(), theme)
            })
            .collect::<Vec<_>>(),
        Modal::DictionaryForm { draft, focus, .. } => {
            let mut lines = vec![field_line(
                "Name",
                draft.name.clone(),
                *focus == DictionaryField::Name,
                false,
                theme,
            )];
            if let Some(parent) = draft.kind.parent() {
                let parent_name = draft.parent_id.and_then(|id| {
                    dict.options(parent)
                        .into_iter()
                        .find(|(option, _)| *option == id)
                        .map(|(_, name)| name)
                });
                lines.push(field_line(
                    parent.label(),
                    parent_name.unwrap_or_else(|| "-".to_string()),
                    *focus == DictionaryField::Parent,
                    true,
                    theme,
                ));
            }
            lines
        }
        Modal::ConfirmDelete { label, .. } => vec![Line::from(format!("Delete {label}?"))],
        Modal::DateRange {
            after,
            before,
            editing_before,
            ..
        } => vec![
            field_line("From", after.clone(), !*editing_before, false, theme),
            field_line("To", before.clone(), *editing_before, false, theme),
            Line::from(Span::styled(
                "YYYY-MM-DD, empty for no bound",
                Style::default().fg(theme.dim),
            )),
        ],
    };

    let error = match modal {
        Modal::CashFlowForm { error, .. }
        | Modal::DictionaryForm { error, .. }
        | Modal::DateRange { error, .. } => error.as_deref(),
        Modal::ConfirmDelete { .. } => None,
    };
    lines.push(Line::from(""));
    if let Some(error) = error {
        lines.push(Line::from(Span::styled(
            error.to_string(),
            Style::default().fg(theme.error),
        )));
    }
    let hints = match modal {
        Modal::ConfirmDelete { .. } => common::confirm(),
        _ => common::form(),
    };
    lines.push(Line::from(hints_to_spans(&hints, theme)));

    let height = lines.len() as u16 + 2;
    let rect = centered_rect(60, height, area);
    let block = Block::default()
        .title(modal.title())
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(theme.accent));

    frame.render_widget(Clear, rect);
    frame.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: false }),
        rect,
    );
}

fn name_or_dash(name: Option<&String>) -> String {
    name.cloned().unwrap_or_else(|| "-".to_string())
}

fn field_line(
    label: &str,
    value: String,
    focused: bool,
    selector: bool,
    theme: &Theme,
) -> Line<'static> {
    let label_style = if focused {
        Style::default()
            .fg(theme.accent)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(theme.dim)
    };
    let value = match (focused, selector) {
        (true, true) => format!("< {value} >"),
        (true, false) => format!("{value}_"),
        (false, _) => value,
    };
    Line::from(vec![
        Span::styled(format!("{label:<12}"), label_style),
        Span::styled(value, Style::default().fg(theme.text)),
    ])
}

/// Rectangle `percent_x` wide and `height` rows tall in the middle of `area`.
pub fn centered_rect(percent_x: u16, height: u16, area: Rect) -> Rect {
    let height = height.min(area.height);
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(height),
            Constraint::Fill(1),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}
