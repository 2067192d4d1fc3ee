//! Interactive terminal dashboard
//!
//! Provides:
//! - Process table with live health verdicts
//! - Per-process detail view with action toggles
//! - Cron toggle and config persistence

pub mod app;
mod dashboard;
mod detail;

pub use app::run_menu;
