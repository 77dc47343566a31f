//! Bookies library server
//!
//! REST JSON API for browsing a book catalog and running its borrow/return
//! approval workflow.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

use repository::Store;
use services::Services;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<Services>,
}

impl AppState {
    /// Load stored state, seed the default administrator and build the services
    pub async fn build(config: AppConfig, store: Arc<dyn Store>) -> AppResult<Self> {
        let services = Services::new(store, &config).await?;
        services.auth.ensure_admin().await?;

        Ok(Self {
            config: Arc::new(config),
            services: Arc::new(services),
        })
    }
}
