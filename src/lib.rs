//! Layered user management API: router, services, repositories, models.

pub mod config;
pub mod db;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod response;
pub mod routes;
pub mod services;

use config::AppConfig;
use repositories::{sys_log_repository::SysLogRepository, user_repository::UserRepository};
use services::{
    auth_service::AuthService, sys_log_service::SysLogService, token_service::TokenService,
    token_store::TokenStore, user_service::UserService,
};
use sqlx::SqlitePool;
use std::{sync::Arc, time::Duration};

/// Shared state handed to every handler and middleware.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: SqlitePool,
    pub auth: AuthService,
    pub users: UserService,
    pub sys_logs: SysLogService,
}

impl AppState {
    pub fn new(config: AppConfig, db: SqlitePool) -> Self {
        let store = TokenStore::new(
            ttl(config.jwt.access_ttl_secs()),
            ttl(config.jwt.refresh_ttl_secs()),
        );
        let user_repo = UserRepository::new(db.clone());

        Self {
            auth: AuthService::new(
                user_repo.clone(),
                TokenService::new(config.jwt.clone()),
                store.clone(),
            ),
            users: UserService::new(user_repo, store),
            sys_logs: SysLogService::new(SysLogRepository::new(db.clone())),
            config: Arc::new(config),
            db,
        }
    }
}

fn ttl(secs: i64) -> Duration {
    Duration::from_secs(secs.max(1) as u64)
}
