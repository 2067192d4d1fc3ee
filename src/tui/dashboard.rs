//! Dashboard screen: process table and status bar

use super::app::App;
use crate::monitor::ProcessHealth;
use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table};

pub(super) fn health_style(health: ProcessHealth) -> Style {
    match health {
        ProcessHealth::Healthy => Style::default().fg(Color::Green),
        ProcessHealth::TimedOut => Style::default().fg(Color::Yellow),
        ProcessHealth::NoHeartbeat => Style::default().fg(Color::DarkGray),
        ProcessHealth::StalePid => Style::default().fg(Color::Red),
    }
}

pub(super) fn render(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(5),
            Constraint::Length(2),
        ])
        .split(f.area());

    // Status bar
    let cron_span = if app.cron_active {
        Span::styled("cron: active", Style::default().fg(Color::Green))
    } else {
        Span::styled("cron: inactive", Style::default().fg(Color::DarkGray))
    };
    let status = Line::from(vec![
        Span::styled(
            " vigil ",
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::raw("| "),
        cron_span,
        Span::raw(" | last check: "),
        Span::raw(app.last_refresh.clone()),
    ]);
    f.render_widget(Paragraph::new(status), chunks[0]);

    // Process table
    let header = Row::new(["KEY", "NAME", "HEALTH", "PID", "ENABLED"])
        .style(Style::default().add_modifier(Modifier::BOLD));
    let rows: Vec<Row> = app
        .rows
        .iter()
        .map(|row| {
            Row::new(vec![
                Cell::from(row.key.clone()),
                Cell::from(row.display_name.clone()),
                Cell::from(row.health.to_string()).style(health_style(row.health)),
                Cell::from(row.pid.clone()),
                Cell::from(if row.enabled { "[x]" } else { "[ ]" }),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(20),
            Constraint::Min(20),
            Constraint::Length(14),
            Constraint::Length(8),
            Constraint::Length(9),
        ],
    )
    .header(header)
    .block(Block::default().borders(Borders::ALL).title("Processes"))
    .row_highlight_style(Style::default().add_modifier(Modifier::REVERSED));

    f.render_stateful_widget(table, chunks[1], &mut app.table_state);

    // Hints and last action message
    let hints = Line::from(Span::styled(
        " q quit | f refresh | c cron | enter details | s start | k kill | r restart | S start all | K stop all",
        Style::default().fg(Color::DarkGray),
    ));
    let message = Line::from(app.message.clone().unwrap_or_default());
    f.render_widget(Paragraph::new(vec![hints, message]), chunks[2]);
}
