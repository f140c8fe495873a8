use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::DomainError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Comment {
    pub(crate) id: Uuid,
    pub(crate) post_id: Uuid,
    pub(crate) user_id: Uuid,
    pub(crate) user_display_name: String,
    pub(crate) text: String,
    pub(crate) created_at: DateTime<Utc>,
}

pub(crate) fn normalize_comment_text(text: &str) -> Result<String, DomainError> {
    let text = text.trim();
    if text.is_empty() || text.chars().count() > 1000 {
        return Err(DomainError::Validation {
            field: "text",
            message: "must be 1..1000 chars",
        });
    }
    Ok(text.to_string())
}
