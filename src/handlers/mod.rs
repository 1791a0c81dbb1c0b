pub mod auth_handlers;
pub mod extractors;
pub mod health_handlers;
pub mod sys_log_handlers;
pub mod user_handlers;
