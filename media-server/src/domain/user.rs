use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::ValidateEmail;

use super::error::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub(crate) enum Role {
    Consumer,
    Creator,
    Admin,
}

impl Role {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Role::Consumer => "consumer",
            Role::Creator => "creator",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "consumer" => Ok(Role::Consumer),
            "creator" => Ok(Role::Creator),
            "admin" => Ok(Role::Admin),
            _ => Err(DomainError::Validation {
                field: "role",
                message: "must be consumer, creator or admin",
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct SignupRequest {
    pub(crate) display_name: String,
    pub(crate) email: String,
    pub(crate) password: String,
}

impl SignupRequest {
    pub(crate) fn validate(self) -> Result<Self, DomainError> {
        let display_name = normalize_display_name(&self.display_name)?;
        let email = normalize_email(&self.email)?;
        let password_len = self.password.chars().count();
        if !(6..=128).contains(&password_len) {
            return Err(DomainError::Validation {
                field: "password",
                message: "must be 6..128 chars",
            });
        }
        Ok(Self {
            display_name,
            email,
            password: self.password,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct LoginRequest {
    pub(crate) email: String,
    pub(crate) password: String,
}

impl LoginRequest {
    pub(crate) fn validate(self) -> Result<Self, DomainError> {
        let email = self.email.trim().to_lowercase();
        if email.is_empty() {
            return Err(DomainError::Validation {
                field: "email",
                message: "must not be empty",
            });
        }

        if self.password.is_empty() {
            return Err(DomainError::Validation {
                field: "password",
                message: "must not be empty",
            });
        }
        Ok(Self {
            email,
            password: self.password,
        })
    }
}

#[derive(Debug, Clone)]
pub(crate) struct User {
    pub(crate) id: Uuid,
    pub(crate) display_name: String,
    pub(crate) email: String,
    pub(crate) role: Role,
    pub(crate) created_at: DateTime<Utc>,
}

impl User {
    pub(crate) fn new(
        id: Uuid,
        display_name: impl Into<String>,
        email: impl Into<String>,
        role: Role,
        created_at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        if id.is_nil() {
            return Err(DomainError::Validation {
                field: "id",
                message: "must not be nil",
            });
        }
        let display_name = normalize_display_name(&display_name.into())?;
        let email = normalize_email(&email.into())?;

        Ok(Self {
            id,
            display_name,
            email,
            role,
            created_at,
        })
    }
}

fn normalize_display_name(display_name: &str) -> Result<String, DomainError> {
    let display_name = display_name.trim();
    if display_name.is_empty() || display_name.chars().count() > 50 {
        return Err(DomainError::Validation {
            field: "display_name",
            message: "must be 1..50 chars",
        });
    }
    Ok(display_name.to_string())
}

fn normalize_email(email: &str) -> Result<String, DomainError> {
    let email = email.trim().to_lowercase();
    if !email.validate_email() {
        return Err(DomainError::Validation {
            field: "email",
            message: "must be a valid email",
        });
    }
    Ok(email)
}
