//! Registry of issued tokens.
//!
//! A token is only honoured while it is present here, which is what makes
//! logout and "one session per user" work with otherwise stateless JWTs.
//! Entries expire together with the token they describe.

use moka::future::Cache;
use parking_lot::Mutex;
use std::{sync::Arc, time::Duration};

#[derive(Debug, Default)]
struct UserTokens {
    access: Vec<String>,
    refresh: Vec<String>,
}

#[derive(Clone)]
pub struct TokenStore {
    access: Cache<String, i64>,
    refresh: Cache<String, i64>,
    by_user: Cache<i64, Arc<Mutex<UserTokens>>>,
}

impl TokenStore {
    pub fn new(access_ttl: Duration, refresh_ttl: Duration) -> Self {
        Self {
            access: Cache::builder().time_to_live(access_ttl).build(),
            refresh: Cache::builder().time_to_live(refresh_ttl).build(),
            // Outlives every token it indexes as long as tokens keep coming.
            by_user: Cache::builder()
                .time_to_idle(refresh_ttl.max(access_ttl))
                .build(),
        }
    }

    async fn index(&self, user_id: i64) -> Arc<Mutex<UserTokens>> {
        self.by_user
            .get_with(user_id, async { Arc::new(Mutex::new(UserTokens::default())) })
            .await
    }

    pub async fn store_access_token(&self, user_id: i64, token: &str) {
        self.access.insert(token.to_string(), user_id).await;
        let index = self.index(user_id).await;
        let mut tokens = index.lock();
        tokens.access.retain(|t| self.access.contains_key(t));
        if !tokens.access.iter().any(|t| t == token) {
            tokens.access.push(token.to_string());
        }
    }

    pub async fn store_refresh_token(&self, user_id: i64, token: &str) {
        self.refresh.insert(token.to_string(), user_id).await;
        let index = self.index(user_id).await;
        let mut tokens = index.lock();
        tokens.refresh.retain(|t| self.refresh.contains_key(t));
        if !tokens.refresh.iter().any(|t| t == token) {
            tokens.refresh.push(token.to_string());
        }
    }

    pub async fn user_for_access_token(&self, token: &str) -> Option<i64> {
        self.access.get(token).await
    }

    pub async fn user_for_refresh_token(&self, token: &str) -> Option<i64> {
        self.refresh.get(token).await
    }

    pub async fn revoke_access_token(&self, token: &str) {
        self.access.invalidate(token).await;
    }

    pub async fn revoke_refresh_token(&self, token: &str) {
        self.refresh.invalidate(token).await;
    }

    /// Drop every access and refresh token issued to `user_id`.
    pub async fn revoke_all_user_tokens(&self, user_id: i64) {
        let Some(index) = self.by_user.remove(&user_id).await else {
            return;
        };
        let (access, refresh) = {
            let mut tokens = index.lock();
            (
                std::mem::take(&mut tokens.access),
                std::mem::take(&mut tokens.refresh),
            )
        };

        for token in &access {
            self.access.invalidate(token).await;
        }
        for token in &refresh {
            self.refresh.invalidate(token).await;
        }
        tracing::debug!(
            user_id,
            access = access.len(),
            refresh = refresh.len(),
            "revoked user tokens"
        );
    }
}
