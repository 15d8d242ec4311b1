//! Library Management Server
//!
//! REST JSON API for a library: book catalog with Cutter numbers, physical
//! copies, borrowers, borrowings with fines, reservations, member signup,
//! a public website catalog and a member portal.

use std::sync::Arc;

pub mod api;
pub mod circulation;
pub mod config;
pub mod cutter;
pub mod error;
pub mod hierarchy;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}
