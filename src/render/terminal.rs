//! Terminal front end drawing a [DashboardFrame] with ratatui.
//!
//! One terminal line is one row, so the dashboard runs with a row height of `1.0` and a viewport
//! height equal to [body_height] of the current terminal area.
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{
    Block, Borders, Cell, Paragraph, Row, Scrollbar, ScrollbarOrientation, ScrollbarState, Table,
};
use ratatui::Frame;

use crate::dashboard::{DashboardFrame, FeedStatus};
use crate::query::SortOrder;

const HEADER: [&str; 4] = ["id", "label", "amount", "time"];

fn split(area: Rect) -> [Rect; 3] {
    Layout::vertical([
        Constraint::Length(3),
        Constraint::Min(3),
        Constraint::Length(1),
    ])
    .areas(area)
}

/// Lines available for record rows once the filter box, borders, header and status line are
/// taken out.
pub fn body_height(area: Rect) -> f64 {
    let [_, table, _] = split(area);
    f64::from(table.height.saturating_sub(3))
}

fn order_span(order: SortOrder) -> Span<'static> {
    let arrow = match order {
        SortOrder::None => "-",
        SortOrder::Ascending => "^",
        SortOrder::Descending => "v",
    };
    Span::styled(
        format!("sort: {} {}", order.label(), arrow),
        Style::default().fg(Color::Cyan),
    )
}

pub fn draw(frame: &mut Frame, area: Rect, state: &DashboardFrame) {
    let [filter_area, table_area, status_area] = split(area);

    let filter_style = if state.filter_active {
        Style::default().fg(Color::Green)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let filter = Paragraph::new(Line::from(vec![
        Span::raw("amount > "),
        Span::styled(state.threshold.as_str(), filter_style),
        Span::raw("   "),
        order_span(state.order),
    ]))
    .block(Block::default().borders(Borders::ALL).title(" filter "));
    frame.render_widget(filter, filter_area);

    let rows: Vec<Row> = state
        .window
        .rows
        .iter()
        .map(|row| {
            Row::new(vec![
                Cell::from(row.cells.id.as_str()),
                Cell::from(row.cells.label.as_str()),
                Cell::from(row.cells.amount.as_str()),
                Cell::from(row.cells.timestamp.as_str()),
            ])
        })
        .collect();

    let widths = [
        Constraint::Length(8),
        Constraint::Min(12),
        Constraint::Length(12),
        Constraint::Length(22),
    ];
    let title = format!(
        " records {}-{} of {} ",
        state.window.range.start + usize::from(!state.window.range.is_empty()),
        state.window.range.end,
        state.visible
    );
    let table = Table::new(rows, widths)
        .header(Row::new(HEADER).style(Style::default().add_modifier(Modifier::BOLD)))
        .block(Block::default().borders(Borders::ALL).title(title));
    frame.render_widget(table, table_area);

    let mut scrollbar =
        ScrollbarState::new(state.visible).position(state.window.range.start);
    frame.render_stateful_widget(
        Scrollbar::new(ScrollbarOrientation::VerticalRight),
        table_area,
        &mut scrollbar,
    );

    let feed = match &state.feed {
        FeedStatus::Live => Span::styled("live", Style::default().fg(Color::Green)),
        FeedStatus::Closed(reason) => Span::styled(
            format!("stream closed: {reason}"),
            Style::default().fg(Color::Red),
        ),
    };
    let status = Paragraph::new(Line::from(vec![
        feed,
        Span::raw(format!(
            "  buffered {} / ingested {}  [0-9.] filter  [s] sort  [c] clear  [q] quit",
            state.buffered, state.ingested
        )),
    ]));
    frame.render_widget(status, status_area);
}
