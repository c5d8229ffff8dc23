//! Access-token verification
//!
//! The hosted backend issues HS256 access tokens; this module decodes them
//! into the caller identity every service call runs as.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use study_core::{Caller, RecordId};

use crate::error::AppError;

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Account email, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Whether the email was verified by the backend
    #[serde(default)]
    pub email_verified: bool,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Backend role (e.g. "authenticated")
    #[serde(default = "default_role")]
    pub role: String,
}

fn default_role() -> String {
    "authenticated".to_string()
}

impl Claims {
    /// Get the user ID
    ///
    /// # Errors
    /// Returns an error if the subject is not a valid ID
    pub fn user_id(&self) -> Result<RecordId, AppError> {
        RecordId::parse(&self.sub).map_err(|_| AppError::InvalidToken)
    }

    /// Build the caller identity for service calls
    ///
    /// # Errors
    /// Returns an error if the subject is not a valid ID
    pub fn caller(&self) -> Result<Caller, AppError> {
        let caller = Caller::new(self.user_id()?);
        Ok(match &self.email {
            Some(email) => caller.with_email(email.clone(), self.email_verified),
            None => caller,
        })
    }

    /// Check if the token is expired
    #[must_use]
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() > self.exp
    }
}

/// JWT service for decoding (and, for tooling, issuing) access tokens
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtService {
    #[must_use]
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Issue an access token for a caller
    ///
    /// # Errors
    /// Returns an error if token encoding fails
    pub fn issue(&self, caller: &Caller, ttl: Duration) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = Claims {
            sub: caller.user_id.to_string(),
            email: caller.email.clone(),
            email_verified: caller.email_verified,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            role: default_role(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|_| AppError::Internal(anyhow::anyhow!("Failed to encode JWT")))
    }

    /// Decode and validate a JWT token
    ///
    /// # Errors
    /// Returns an error if the token is invalid or expired
    pub fn decode_token(&self, token: &str) -> Result<Claims, AppError> {
        let validation = Validation::default();

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AppError::TokenExpired,
                _ => AppError::InvalidToken,
            }
        })?;

        Ok(token_data.claims)
    }

    /// Decode an access token straight into a caller
    ///
    /// # Errors
    /// Returns an error if the token is invalid, expired, or has a bad subject
    pub fn authenticate(&self, token: &str) -> Result<Caller, AppError> {
        let token = token.strip_prefix("Bearer ").unwrap_or(token).trim();
        if token.is_empty() {
            return Err(AppError::MissingAuth);
        }
        self.decode_token(token)?.caller()
    }
}

impl std::fmt::Debug for JwtService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtService").finish_non_exhaustive()
    }
}
