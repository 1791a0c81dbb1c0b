use crate::config::JwtSettings;
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// JWT claims. `sub` carries the user id as a string.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: i64,
    pub iat: i64,
    /// Unique per token so two logins in the same second differ.
    pub jti: String,
    #[serde(rename = "type")]
    pub kind: TokenKind,
}

impl Claims {
    pub fn user_id(&self) -> Option<i64> {
        self.sub.parse().ok()
    }
}

/// Signs and verifies access and refresh tokens.
#[derive(Clone)]
pub struct TokenService {
    settings: JwtSettings,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl TokenService {
    pub fn new(settings: JwtSettings) -> Self {
        let encoding_key = EncodingKey::from_secret(settings.secret_key.as_bytes());
        let decoding_key = DecodingKey::from_secret(settings.secret_key.as_bytes());
        Self {
            settings,
            encoding_key,
            decoding_key,
        }
    }

    /// Access token lifetime in seconds.
    pub fn access_ttl_secs(&self) -> i64 {
        self.settings.access_ttl_secs()
    }

    pub fn refresh_ttl_secs(&self) -> i64 {
        self.settings.refresh_ttl_secs()
    }

    pub fn create_access_token(&self, user_id: i64) -> Result<String, jsonwebtoken::errors::Error> {
        self.create_token(user_id, TokenKind::Access, self.access_ttl_secs())
    }

    pub fn create_refresh_token(&self, user_id: i64) -> Result<String, jsonwebtoken::errors::Error> {
        self.create_token(user_id, TokenKind::Refresh, self.refresh_ttl_secs())
    }

    fn create_token(
        &self,
        user_id: i64,
        kind: TokenKind,
        ttl_secs: i64,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user_id.to_string(),
            exp: now + ttl_secs,
            iat: now,
            jti: Uuid::new_v4().to_string(),
            kind,
        };
        encode(
            &Header::new(self.settings.algorithm),
            &claims,
            &self.encoding_key,
        )
    }

    /// Verify signature and expiry and return the claims.
    pub fn decode_token(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        let mut validation = Validation::new(self.settings.algorithm);
        validation.leeway = 0;
        decode::<Claims>(token, &self.decoding_key, &validation).map(|data| data.claims)
    }
}
