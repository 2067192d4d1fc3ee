//! Process detail screen: info section and recovery-action toggles

use super::app::App;
use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, Paragraph};

pub(super) fn render(f: &mut Frame, app: &mut App) {
    let Some(key) = app.detail_key.clone() else {
        return;
    };
    let Some(spec) = app.config.processes.get(&key) else {
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(7),
            Constraint::Min(4),
            Constraint::Length(2),
        ])
        .split(f.area());

    // Info section
    let enabled_line = if spec.enabled {
        Span::styled("[x] Enabled", Style::default().fg(Color::Green))
    } else {
        Span::styled("[ ] Disabled", Style::default().fg(Color::DarkGray))
    };
    let heartbeat = spec
        .heartbeat_path
        .as_ref()
        .map_or_else(|| "-".to_string(), |p| p.display().to_string());
    let info = vec![
        Line::from(Span::styled(
            format!("Process: {}", spec.display_name),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(format!("Key: {key}")),
        Line::from(format!("Heartbeat: {heartbeat}")),
        Line::from(format!("Timeout: {}s", spec.timeout_seconds)),
        Line::from(enabled_line),
    ];
    f.render_widget(
        Paragraph::new(info).block(Block::default().borders(Borders::ALL).title("Details")),
        chunks[0],
    );

    // Recovery actions with toggle state
    let items: Vec<ListItem> = spec
        .recovery_actions
        .iter()
        .map(|action| {
            let disabled = spec.disabled_actions.contains(action);
            let marker = if disabled { "[ ]" } else { "[x]" };
            let style = if disabled {
                Style::default().fg(Color::DarkGray)
            } else {
                Style::default()
            };
            ListItem::new(Span::styled(format!("{marker} {action}"), style))
        })
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Recovery Actions"),
        )
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));

    f.render_stateful_widget(list, chunks[1], &mut app.action_state);

    // Hints and unsaved-changes marker
    let mut hint = String::from(
        " q quit | b back | e enable/disable | space toggle action | s save",
    );
    if app.dirty {
        hint.push_str("  (unsaved changes)");
    }
    let hints = Line::from(Span::styled(hint, Style::default().fg(Color::DarkGray)));
    let message = Line::from(app.message.clone().unwrap_or_default());
    f.render_widget(Paragraph::new(vec![hints, message]), chunks[2]);
}
