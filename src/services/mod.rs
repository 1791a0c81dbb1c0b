pub mod auth_service;
pub mod password;
pub mod permissions;
pub mod sys_log_service;
pub mod token_service;
pub mod token_store;
pub mod user_service;
pub mod validation;
