use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Cell, Paragraph, Row, Table, TableState},
};

use engine::{Console, Dictionaries, FilterState};

use crate::{
    app::AppState,
    ui::{screens::page_line, theme::Theme},
};

pub fn render(frame: &mut Frame<'_>, area: Rect, state: &AppState, console: &Console) {
    let theme = Theme::default();
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(area);

    render_filters(frame, layout[0], console.filter(), &console.dictionaries(), &theme);
    render_table(frame, layout[1], state, console, &theme);

    let pager = console.records();
    let line = page_line(
        pager.page_number(),
        pager.page().total_count,
        pager.page_size(),
        pager.has_previous(),
        pager.has_next(),
        &theme,
    );
    frame.render_widget(Paragraph::new(line), layout[2]);
}

fn render_filters(
    frame: &mut Frame<'_>,
    area: Rect,
    filter: &FilterState,
    dict: &Dictionaries,
    theme: &Theme,
) {
    let name = |value: Option<&String>| value.cloned().unwrap_or_else(|| "all".to_string());
    let dates = match (filter.created.after, filter.created.before) {
        (None, None) => "any".to_string(),
        (after, before) => format!(
            "{} .. {}",
            after.map(|d| d.format("%d.%m.%Y").to_string()).unwrap_or_default(),
            before.map(|d| d.format("%d.%m.%Y").to_string()).unwrap_or_default()
        ),
    };

    let fields = [
        (
            "Type",
            name(filter.type_id.and_then(|id| dict.cash_flow_type(id)).map(|t| &t.name)),
        ),
        (
            "Category",
            name(filter.category_id.and_then(|id| dict.category(id)).map(|c| &c.name)),
        ),
        (
            "Subcategory",
            name(
                filter
                    .subcategory_id
                    .and_then(|id| dict.subcategory(id))
                    .map(|s| &s.name),
            ),
        ),
        (
            "Status",
            name(filter.status_id.and_then(|id| dict.status(id)).map(|s| &s.name)),
        ),
        ("Created", dates),
    ];

    let mut spans = Vec::new();
    for (label, value) in fields {
        spans.push(Span::styled(label, Style::default().fg(theme.dim)));
        spans.push(Span::raw(format!(": {value}   ")));
    }

    let block = Block::default()
        .title("Filters")
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(theme.border));
    frame.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
}

fn render_table(
    frame: &mut Frame<'_>,
    area: Rect,
    state: &AppState,
    console: &Console,
    theme: &Theme,
) {
    let pager = console.records();
    let rows = pager.items().iter().map(|flow| {
        let amount_style = if is_outflow(&flow.type_name) {
            Style::default().fg(theme.negative)
        } else {
            Style::default().fg(theme.positive)
        };
        Row::new(vec![
            Cell::from(flow.created_at.format("%d.%m.%Y %H:%M").to_string()),
            Cell::from(flow.status_name.clone()),
            Cell::from(flow.type_name.clone()),
            Cell::from(flow.category_name.clone()),
            Cell::from(flow.subcategory_name.clone()),
            Cell::from(format!("{:.2}", flow.amount)).style(amount_style),
            Cell::from(flow.comment.clone()),
        ])
    });

    let title = if pager.is_loading() {
        "Cash flows (loading)"
    } else {
        "Cash flows"
    };
    let header = Row::new([
        "Date",
        "Status",
        "Type",
        "Category",
        "Subcategory",
        "Amount",
        "Comment",
    ])
    .style(Style::default().fg(theme.dim));

    let table = Table::new(
        rows,
        [
            Constraint::Length(17),
            Constraint::Length(10),
            Constraint::Length(10),
            Constraint::Length(14),
            Constraint::Length(14),
            Constraint::Length(12),
            Constraint::Min(10),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(theme.border)),
    )
    .row_highlight_style(
        Style::default()
            .fg(theme.accent)
            .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("» ");

    let mut table_state = TableState::default();
    if !pager.items().is_empty() {
        table_state.select(Some(state.selected));
    }
    frame.render_stateful_widget(table, area, &mut table_state);
}

/// Types named like "Списание" or "Expense" take money out.
fn is_outflow(type_name: &str) -> bool {
    let name = type_name.to_lowercase();
    name.contains("спис") || name.contains("expense")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outflow_types_are_recognised() {
        assert!(is_outflow("Expense"));
        assert!(is_outflow("Списание"));
        assert!(!is_outflow("Income"));
        assert!(!is_outflow("Пополнение"));
    }
}
