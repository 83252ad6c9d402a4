use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    widgets::{Block, BorderType, Borders, Cell, Paragraph, Row, Table, TableState},
};

use engine::{Console, DictionaryKind};

use crate::{
    app::AppState,
    ui::{screens::page_line, theme::Theme},
};

pub fn render(
    frame: &mut Frame<'_>,
    area: Rect,
    state: &AppState,
    console: &Console,
    kind: DictionaryKind,
) {
    let theme = Theme::default();
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(area);

    let pager = console.browser();
    let parent = kind.parent();
    let rows = pager.items().iter().map(|entry| {
        let mut cells = vec![Cell::from(entry.id.to_string()), Cell::from(entry.name.clone())];
        if parent.is_some() {
            cells.push(Cell::from(entry.parent_name.clone().unwrap_or_default()));
        }
        Row::new(cells)
    });

    let mut header = vec!["Id", "Name"];
    let mut widths = vec![Constraint::Length(6), Constraint::Min(20)];
    if let Some(parent) = parent {
        header.push(parent.label());
        widths.push(Constraint::Min(20));
    }

    let title = if pager.is_loading() {
        format!("{} (loading)", state.section.label())
    } else {
        state.section.label().to_string()
    };
    let table = Table::new(rows, widths)
        .header(Row::new(header).style(Style::default().fg(theme.dim)))
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
    frame.render_stateful_widget(table, layout[0], &mut table_state);

    let line = page_line(
        pager.page_number(),
        pager.page().total_count,
        console.dictionary_page_size(kind),
        pager.has_previous(),
        pager.has_next(),
        &theme,
    );
    frame.render_widget(Paragraph::new(line), layout[1]);
}
