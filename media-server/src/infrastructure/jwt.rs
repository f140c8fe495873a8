use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::identity::Identity;
use crate::domain::user::Role;

#[derive(Debug, Error)]
pub(crate) enum JwtError {
    #[error("token signing secret is not configured")]
    MissingSecret,

    #[error("token encode failed")]
    Encode(#[source] jsonwebtoken::errors::Error),

    #[error("token decode/validation failed")]
    Decode(#[source] jsonwebtoken::errors::Error),

    #[error("token subject is not a user id")]
    InvalidSubject(#[source] uuid::Error),
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub(crate) struct Claims {
    pub(crate) sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) email: Option<String>,
    #[serde(rename = "displayName")]
    pub(crate) display_name: String,
    pub(crate) role: Role,
    pub(crate) iat: i64,
    pub(crate) exp: i64,
}

pub(crate) struct JwtService {
    secret: String,
    ttl_seconds: i64,
}

impl JwtService {
    pub(crate) const DEFAULT_TTL_SECONDS: i64 = 7 * 24 * 60 * 60;

    pub(crate) fn new(secret: &str, ttl_seconds: i64) -> Self {
        let ttl_seconds = if ttl_seconds > 0 {
            ttl_seconds
        } else {
            Self::DEFAULT_TTL_SECONDS
        };

        JwtService {
            secret: secret.trim().into(),
            ttl_seconds,
        }
    }

    pub(crate) fn generate_token(&self, identity: &Identity) -> Result<String, JwtError> {
        self.generate_token_at(identity, Utc::now())
    }

    fn generate_token_at(
        &self,
        identity: &Identity,
        issued_at: DateTime<Utc>,
    ) -> Result<String, JwtError> {
        if self.secret.is_empty() {
            return Err(JwtError::MissingSecret);
        }

        let claims = Claims {
            sub: identity.user_id.to_string(),
            email: identity.email.clone(),
            display_name: identity.display_name.clone(),
            role: identity.role,
            iat: issued_at.timestamp(),
            exp: (issued_at + Duration::seconds(self.ttl_seconds)).timestamp(),
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(JwtError::Encode)
    }

    pub(crate) fn verify_token(&self, token: &str) -> Result<Identity, JwtError> {
        if self.secret.is_empty() {
            return Err(JwtError::MissingSecret);
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map_err(JwtError::Decode)?;

        let claims = token_data.claims;
        let user_id = Uuid::parse_str(&claims.sub).map_err(JwtError::InvalidSubject)?;

        Ok(Identity {
            user_id,
            email: claims.email,
            display_name: claims.display_name,
            role: claims.role,
        })
    }
}
