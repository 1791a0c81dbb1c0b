//! Login, token refresh, logout and bearer-token authentication.
//!
//! A user holds at most one live session: every login revokes the tokens
//! issued before it.

use crate::{
    models::user::User,
    repositories::user_repository::UserRepository,
    services::{
        password::{self, PasswordError},
        token_service::{TokenKind, TokenService},
        token_store::TokenStore,
    },
};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Incorrect user name or password")]
    InvalidCredentials,
    #[error("User is disabled")]
    UserDisabled,
    #[error("Refresh token expired or invalid")]
    InvalidRefreshToken,
    #[error("Token expired or revoked")]
    TokenRevoked,
    #[error("Invalid authentication credentials")]
    InvalidToken,
    #[error("Invalid token type")]
    WrongTokenType,
    #[error("Could not validate credentials")]
    CredentialsMismatch,
    #[error("Inactive user")]
    InactiveUser,
    #[error("token signing failed: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
    #[error(transparent)]
    Password(#[from] PasswordError),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

pub type AuthResult<T> = Result<T, AuthError>;

/// Token pair handed to the client.
#[derive(Debug, Clone, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
}

#[derive(Clone)]
pub struct AuthService {
    users: UserRepository,
    tokens: TokenService,
    store: TokenStore,
}

impl AuthService {
    pub fn new(users: UserRepository, tokens: TokenService, store: TokenStore) -> Self {
        Self {
            users,
            tokens,
            store,
        }
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    /// Check credentials and open a fresh session.
    pub async fn login(&self, user_name: &str, password: &str) -> AuthResult<TokenResponse> {
        let user = self
            .users
            .get_by_user_name(user_name.trim())
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !password::verify_password_async(password.to_string(), user.hashed_password.clone())
            .await?
        {
            return Err(AuthError::InvalidCredentials);
        }
        if !user.is_active {
            return Err(AuthError::UserDisabled);
        }

        self.store.revoke_all_user_tokens(user.user_id).await;

        let access_token = self.tokens.create_access_token(user.user_id)?;
        let refresh_token = self.tokens.create_refresh_token(user.user_id)?;
        self.store
            .store_access_token(user.user_id, &access_token)
            .await;
        self.store
            .store_refresh_token(user.user_id, &refresh_token)
            .await;

        tracing::info!(user_id = user.user_id, "user logged in");

        Ok(TokenResponse {
            access_token,
            refresh_token,
            token_type: "bearer",
            expires_in: self.tokens.access_ttl_secs(),
        })
    }

    /// Issue a new access token. The refresh token itself is returned as-is.
    pub async fn refresh(&self, refresh_token: &str) -> AuthResult<TokenResponse> {
        let user_id = self
            .store
            .user_for_refresh_token(refresh_token)
            .await
            .ok_or(AuthError::InvalidRefreshToken)?;

        let claims = self
            .tokens
            .decode_token(refresh_token)
            .map_err(|_| AuthError::InvalidRefreshToken)?;
        if claims.kind != TokenKind::Refresh || claims.user_id() != Some(user_id) {
            return Err(AuthError::InvalidRefreshToken);
        }

        let access_token = self.tokens.create_access_token(user_id)?;
        self.store.store_access_token(user_id, &access_token).await;

        Ok(TokenResponse {
            access_token,
            refresh_token: refresh_token.to_string(),
            token_type: "bearer",
            expires_in: self.tokens.access_ttl_secs(),
        })
    }

    /// Resolve a bearer token to an active user.
    pub async fn authenticate(&self, access_token: &str) -> AuthResult<User> {
        let stored_user_id = self
            .store
            .user_for_access_token(access_token)
            .await
            .ok_or(AuthError::TokenRevoked)?;

        let claims = self
            .tokens
            .decode_token(access_token)
            .map_err(|_| AuthError::InvalidToken)?;
        if claims.kind != TokenKind::Access {
            return Err(AuthError::WrongTokenType);
        }
        if claims.user_id() != Some(stored_user_id) {
            return Err(AuthError::CredentialsMismatch);
        }

        let user = self
            .users
            .get_by_id(stored_user_id)
            .await?
            .ok_or(AuthError::CredentialsMismatch)?;
        if !user.is_active {
            return Err(AuthError::InactiveUser);
        }
        Ok(user)
    }

    pub async fn logout(&self, user: &User) {
        self.store.revoke_all_user_tokens(user.user_id).await;
        tracing::info!(user_id = user.user_id, "user logged out");
    }

    /// Revoke every session of a user, e.g. after deletion or deactivation.
    pub async fn revoke_user(&self, user_id: i64) {
        self.store.revoke_all_user_tokens(user_id).await;
    }
}
