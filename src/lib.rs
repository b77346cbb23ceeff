pub mod config;
pub mod dto;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
pub mod session;
pub mod utils;

use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::error::Result;
use crate::services::backend_service::{HttpTestsApi, TestsApi};
use crate::services::session_service::SessionService;

#[derive(Clone)]
pub struct AppState {
    pub sessions: SessionService,
}

impl AppState {
    pub fn new(config: &Config) -> Result<Self> {
        let api = HttpTestsApi::new(
            &config.tests_api_url,
            config.notifications_api_url.as_deref(),
            Duration::from_secs(config.http_timeout_secs),
        )?;
        Ok(Self::with_api(Arc::new(api), config))
    }

    pub fn with_api(api: Arc<dyn TestsApi>, config: &Config) -> Self {
        let sessions = SessionService::new(
            api,
            config.session_policy(),
            config.notify_on_result,
            Duration::from_secs(config.session_retention_secs),
            Duration::from_secs(config.session_idle_secs),
        );
        Self { sessions }
    }
}
