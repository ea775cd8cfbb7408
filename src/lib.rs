//! Groundcheck: airport ground equipment inspection tracker
//!
//! REST JSON API for per-device inspection checklists, fix tracking,
//! incident reports, maintenance tasks and monthly KPI scorecards, backed by
//! a document store with live change feeds.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;
pub mod store;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}
