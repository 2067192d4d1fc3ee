//! Dashboard application and event loop
//!
//! Terminal setup/teardown, the tick-based event loop, and key
//! handling for both screens. All process actions go through the same
//! handlers as the CLI; config edits persist via `config::save`.

use crate::commands::{kill_by_key, restart_by_key, start_process};
use crate::config::{self, VigilConfig};
use crate::cron;
use crate::error::Result;
use crate::monitor::{ProcessHealth, check_process};
use crate::recovery::RecoveryOptions;
use chrono::Local;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use ratatui::widgets::{ListState, TableState};
use std::io;
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Seconds between automatic data refreshes
const REFRESH_INTERVAL: Duration = Duration::from_secs(5);

/// One row of the process table
pub struct ProcessRow {
    pub key: String,
    pub display_name: String,
    pub health: ProcessHealth,
    pub pid: String,
    pub enabled: bool,
}

/// Which screen is showing
#[derive(Clone, Copy)]
pub enum Screen {
    Dashboard,
    Detail,
}

/// Dashboard application state
pub struct App {
    pub config: VigilConfig,
    config_path: PathBuf,
    cron_line: Option<String>,
    pub screen: Screen,
    pub rows: Vec<ProcessRow>,
    pub table_state: TableState,
    pub action_state: ListState,
    /// Process key the detail screen shows
    pub detail_key: Option<String>,
    pub cron_active: bool,
    pub last_refresh: String,
    pub message: Option<String>,
    /// Unsaved config edits
    pub dirty: bool,
    should_quit: bool,
}

impl App {
    pub fn new(config: VigilConfig, config_path: PathBuf) -> Self {
        let cron_line = cron::cron_line(&config_path, &config.config.log_dir).ok();
        let mut app = Self {
            config,
            config_path,
            cron_line,
            screen: Screen::Dashboard,
            rows: Vec::new(),
            table_state: TableState::default(),
            action_state: ListState::default(),
            detail_key: None,
            cron_active: false,
            last_refresh: String::new(),
            message: None,
            dirty: false,
            should_quit: false,
        };
        app.refresh();
        app
    }

    /// Re-check every configured process and the cron state
    pub fn refresh(&mut self) {
        self.rows = self
            .config
            .processes
            .iter()
            .map(|(key, spec)| {
                let result = check_process(key, spec);
                ProcessRow {
                    key: key.clone(),
                    display_name: spec.display_name.clone(),
                    health: result.health,
                    pid: result.pid.map_or_else(|| "-".to_string(), |p| p.to_string()),
                    enabled: spec.enabled,
                }
            })
            .collect();

        if self.table_state.selected().is_none() && !self.rows.is_empty() {
            self.table_state.select(Some(0));
        }

        self.cron_active = self
            .cron_line
            .as_deref()
            .is_some_and(cron::is_active);
        self.last_refresh = Local::now().format("%H:%M:%S").to_string();
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    fn selected_key(&self) -> Option<String> {
        self.table_state
            .selected()
            .and_then(|i| self.rows.get(i))
            .map(|row| row.key.clone())
    }

    fn opts(&self) -> RecoveryOptions {
        RecoveryOptions::from(&self.config.config)
    }

    pub fn on_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        match self.screen {
            Screen::Dashboard => self.on_key_dashboard(key.code),
            Screen::Detail => self.on_key_detail(key.code),
        }
    }

    fn on_key_dashboard(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('f') => {
                self.refresh();
                self.message = None;
            }
            KeyCode::Char('c') => self.toggle_cron(),
            KeyCode::Up => self.move_selection(-1),
            KeyCode::Down => self.move_selection(1),
            KeyCode::Enter => {
                if let Some(key) = self.selected_key() {
                    self.detail_key = Some(key);
                    self.action_state.select(Some(0));
                    self.screen = Screen::Detail;
                }
            }
            KeyCode::Char('s') => self.run_selected(start_process),
            KeyCode::Char('k') => self.run_selected(kill_by_key),
            KeyCode::Char('r') => self.run_selected(restart_by_key),
            KeyCode::Char('S') => self.run_bulk(start_process, "Started"),
            KeyCode::Char('K') => self.run_bulk(kill_by_key, "Stopped"),
            _ => {}
        }
    }

    fn on_key_detail(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('b') | KeyCode::Esc => {
                self.screen = Screen::Dashboard;
                self.detail_key = None;
            }
            KeyCode::Char('e') => self.toggle_enabled(),
            KeyCode::Up => self.move_action_selection(-1),
            KeyCode::Down => self.move_action_selection(1),
            KeyCode::Char(' ') => self.toggle_selected_action(),
            KeyCode::Char('s') => self.save(),
            _ => {}
        }
    }

    fn move_selection(&mut self, delta: i64) {
        if self.rows.is_empty() {
            return;
        }
        let len = self.rows.len() as i64;
        let current = self.table_state.selected().unwrap_or(0) as i64;
        let next = (current + delta).rem_euclid(len) as usize;
        self.table_state.select(Some(next));
    }

    fn move_action_selection(&mut self, delta: i64) {
        let Some(spec) = self
            .detail_key
            .as_ref()
            .and_then(|k| self.config.processes.get(k))
        else {
            return;
        };
        if spec.recovery_actions.is_empty() {
            return;
        }
        let len = spec.recovery_actions.len() as i64;
        let current = self.action_state.selected().unwrap_or(0) as i64;
        let next = (current + delta).rem_euclid(len) as usize;
        self.action_state.select(Some(next));
    }

    fn run_selected(&mut self, action: fn(&str, &crate::config::ProcessSpec, &RecoveryOptions) -> (bool, String)) {
        let Some(key) = self.selected_key() else {
            return;
        };
        let opts = self.opts();
        if let Some(spec) = self.config.process(&key) {
            let (_, message) = action(&key, spec, &opts);
            self.message = Some(message);
        }
        self.refresh();
    }

    fn run_bulk(
        &mut self,
        action: fn(&str, &crate::config::ProcessSpec, &RecoveryOptions) -> (bool, String),
        verb: &str,
    ) {
        let opts = self.opts();
        let mut ok = 0;
        let mut failed = 0;
        for (key, spec) in self.config.enabled_processes() {
            if action(key, spec, &opts).0 {
                ok += 1;
            } else {
                failed += 1;
            }
        }
        self.message = Some(format!("{verb} {ok} processes ({failed} failed)"));
        self.refresh();
    }

    fn toggle_cron(&mut self) {
        let Some(line) = self.cron_line.clone() else {
            self.message = Some("Cron line unavailable".to_string());
            return;
        };
        let enable = !self.cron_active;
        match cron::toggle(&line, enable) {
            Ok(()) => {
                self.message = Some(if enable {
                    "Cron entry installed".to_string()
                } else {
                    "Cron entry removed".to_string()
                });
            }
            Err(e) => self.message = Some(format!("Cron toggle failed: {e}")),
        }
        self.refresh();
    }

    fn toggle_enabled(&mut self) {
        let Some(key) = self.detail_key.clone() else {
            return;
        };
        if let Some(spec) = self.config.processes.get_mut(&key) {
            spec.enabled = !spec.enabled;
            self.dirty = true;
        }
    }

    fn toggle_selected_action(&mut self) {
        let Some(key) = self.detail_key.clone() else {
            return;
        };
        let Some(idx) = self.action_state.selected() else {
            return;
        };
        if let Some(spec) = self.config.processes.get_mut(&key) {
            if let Some(action) = spec.recovery_actions.get(idx).cloned() {
                spec.toggle_action(&action);
                self.dirty = true;
            }
        }
    }

    fn save(&mut self) {
        match config::save(&self.config, &self.config_path) {
            Ok(()) => {
                self.dirty = false;
                self.message = Some("Configuration saved".to_string());
            }
            Err(e) => self.message = Some(format!("Save failed: {e}")),
        }
    }
}

/// Run the interactive dashboard. Returns the process exit code.
pub fn run_menu(config: VigilConfig, config_path: PathBuf) -> Result<i32> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    if let Err(err) = execute!(stdout, EnterAlternateScreen) {
        let _ = disable_raw_mode();
        return Err(err.into());
    }
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = match Terminal::new(backend) {
        Ok(terminal) => terminal,
        Err(err) => {
            let _ = disable_raw_mode();
            let _ = execute!(io::stdout(), LeaveAlternateScreen);
            return Err(err.into());
        }
    };

    let mut app = App::new(config, config_path);
    let result = event_loop(&mut terminal, &mut app);

    let _ = disable_raw_mode();
    let _ = execute!(terminal.backend_mut(), LeaveAlternateScreen);
    let _ = terminal.show_cursor();

    result.map(|()| 0)
}

fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    let tick_rate = Duration::from_millis(250);
    let mut last_refresh = Instant::now();

    while !app.should_quit() {
        terminal.draw(|f| match app.screen {
            Screen::Dashboard => super::dashboard::render(f, app),
            Screen::Detail => super::detail::render(f, app),
        })?;

        if event::poll(tick_rate)? {
            if let Event::Key(key) = event::read()? {
                app.on_key(key);
            }
        }

        if last_refresh.elapsed() >= REFRESH_INTERVAL {
            app.refresh();
            last_refresh = Instant::now();
        }
    }

    Ok(())
}
