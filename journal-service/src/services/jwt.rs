use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::JwtConfig;

/// JWT service for token generation and validation
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_token_expiry_minutes: i64,
    refresh_token_expiry_days: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

/// Claims shared by access and refresh tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject (user ID)
    pub sub: String,
    pub is_admin: bool,
    pub token_type: TokenType,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    pub jti: String,
}

impl TokenClaims {
    pub fn user_id(&self) -> Result<Uuid, anyhow::Error> {
        Uuid::parse_str(&self.sub).map_err(|_| anyhow::anyhow!("Invalid token subject"))
    }
}

/// Token response returned to client
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    pub token_type: String,
    pub expires_in: i64,
}

impl JwtService {
    pub fn new(config: &JwtConfig) -> Result<Self, anyhow::Error> {
        if config.secret.is_empty() {
            return Err(anyhow::anyhow!("JWT secret must not be empty"));
        }

        tracing::info!("JWT service initialized with HS256 secret");

        Ok(Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            access_token_expiry_minutes: config.access_token_expiry_minutes,
            refresh_token_expiry_days: config.refresh_token_expiry_days,
        })
    }

    fn issue(
        &self,
        user_id: &str,
        is_admin: bool,
        token_type: TokenType,
        ttl: Duration,
    ) -> Result<String, anyhow::Error> {
        let now = Utc::now();
        let claims = TokenClaims {
            sub: user_id.to_string(),
            is_admin,
            token_type,
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| anyhow::anyhow!("Failed to encode {:?} token: {}", token_type, e))
    }

    /// Generate an access token for a user
    pub fn generate_access_token(
        &self,
        user_id: &str,
        is_admin: bool,
    ) -> Result<String, anyhow::Error> {
        self.issue(
            user_id,
            is_admin,
            TokenType::Access,
            Duration::minutes(self.access_token_expiry_minutes),
        )
    }

    /// Generate a refresh token for a user
    pub fn generate_refresh_token(
        &self,
        user_id: &str,
        is_admin: bool,
    ) -> Result<String, anyhow::Error> {
        self.issue(
            user_id,
            is_admin,
            TokenType::Refresh,
            Duration::days(self.refresh_token_expiry_days),
        )
    }

    /// Generate both access and refresh tokens
    pub fn generate_token_pair(
        &self,
        user_id: &str,
        is_admin: bool,
    ) -> Result<TokenResponse, anyhow::Error> {
        Ok(TokenResponse {
            access_token: self.generate_access_token(user_id, is_admin)?,
            refresh_token: Some(self.generate_refresh_token(user_id, is_admin)?),
            token_type: "Bearer".to_string(),
            expires_in: self.access_token_expiry_seconds(),
        })
    }

    fn validate(&self, token: &str, expected: TokenType) -> Result<TokenClaims, anyhow::Error> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;

        let token_data = decode::<TokenClaims>(token, &self.decoding_key, &validation)
            .map_err(|e| anyhow::anyhow!("Invalid {:?} token: {}", expected, e))?;

        if token_data.claims.token_type != expected {
            return Err(anyhow::anyhow!(
                "Expected {:?} token, got {:?}",
                expected,
                token_data.claims.token_type
            ));
        }

        Ok(token_data.claims)
    }

    /// Validate and decode an access token
    pub fn validate_access_token(&self, token: &str) -> Result<TokenClaims, anyhow::Error> {
        self.validate(token, TokenType::Access)
    }

    /// Validate and decode a refresh token
    pub fn validate_refresh_token(&self, token: &str) -> Result<TokenClaims, anyhow::Error> {
        self.validate(token, TokenType::Refresh)
    }

    /// Issue a fresh access token from a valid refresh token, keeping its admin claim.
    pub fn refresh_access_token(&self, refresh_token: &str) -> Result<TokenResponse, anyhow::Error> {
        let claims = self.validate_refresh_token(refresh_token)?;
        Ok(TokenResponse {
            access_token: self.generate_access_token(&claims.sub, claims.is_admin)?,
            refresh_token: None,
            token_type: "Bearer".to_string(),
            expires_in: self.access_token_expiry_seconds(),
        })
    }

    /// Get access token expiry in seconds (for client info)
    pub fn access_token_expiry_seconds(&self) -> i64 {
        self.access_token_expiry_minutes * 60
    }
}
