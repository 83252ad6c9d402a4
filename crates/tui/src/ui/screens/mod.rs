pub mod cash_flows;
pub mod dictionary;

use ratatui::{
    style::Style,
    text::{Line, Span},
};

use crate::ui::theme::Theme;

/// "Page 2 · 37 rows · 10 per page", plus the arrows that are available.
pub(crate) fn page_line(
    page: usize,
    total: u64,
    page_size: u32,
    has_previous: bool,
    has_next: bool,
    theme: &Theme,
) -> Line<'static> {
    let arrow = |on: bool, glyph: &'static str| {
        let color = if on { theme.accent } else { theme.border };
        Span::styled(glyph, Style::default().fg(color))
    };
    Line::from(vec![
        arrow(has_previous, "◀ "),
        Span::styled(
            format!("Page {page} · {total} rows · {page_size} per page"),
            Style::default().fg(theme.dim),
        ),
        arrow(has_next, " ▶"),
    ])
}
