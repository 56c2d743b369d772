pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::error::Result;
use crate::services::{
    assignment_service::AssignmentService, attempt_service::AttemptService,
    code_service::CodeService, invite_service::InviteService, linking_service::LinkingService,
    notification_service::{InviteNotifier, MailRelayNotifier},
};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
    pub invite_service: InviteService,
    pub linking_service: LinkingService,
    pub assignment_service: AssignmentService,
    pub attempt_service: AttemptService,
    pub code_service: CodeService,
}

impl AppState {
    pub fn new(pool: PgPool, config: Config) -> Result<Self> {
        let notifier = MailRelayNotifier::new(
            config.mail_relay_url.clone(),
            config.mail_relay_secret.clone(),
        )?;
        Ok(Self::with_notifier(pool, config, Arc::new(notifier)))
    }

    pub fn with_notifier(pool: PgPool, config: Config, notifier: Arc<dyn InviteNotifier>) -> Self {
        let invite_service = InviteService::new(
            pool.clone(),
            notifier,
            config.frontend_url.clone(),
            config.mail_from_name.clone(),
            config.invite_ttl(),
        );
        let linking_service = LinkingService::new(pool.clone());
        let assignment_service = AssignmentService::new(pool.clone());
        let attempt_service = AttemptService::new(pool.clone());
        let code_service = CodeService::new(pool.clone());

        Self {
            pool,
            config: Arc::new(config),
            invite_service,
            linking_service,
            assignment_service,
            attempt_service,
            code_service,
        }
    }
}
