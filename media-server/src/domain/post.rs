use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::error::DomainError;

const MAX_LIST_ITEMS: usize = 50;
const MAX_LIST_ITEM_CHARS: usize = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub(crate) enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaKind {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "image" => Ok(MediaKind::Image),
            "video" => Ok(MediaKind::Video),
            _ => Err(DomainError::Validation {
                field: "media_type",
                message: "must be image or video",
            }),
        }
    }
}

/// Counters kept on the post row. `avg_rating` and `rating_count` are derived
/// from the rating rows and written only by the rating recompute.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct PostStats {
    pub(crate) views: i64,
    pub(crate) avg_rating: f64,
    pub(crate) rating_count: i64,
    pub(crate) comment_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Post {
    pub(crate) id: Uuid,
    pub(crate) creator_id: Uuid,
    pub(crate) media_type: MediaKind,
    /// Canonical unsigned location; never handed to a browser as-is.
    pub(crate) media_url: String,
    pub(crate) thumbnail_url: String,
    pub(crate) title: String,
    pub(crate) caption: String,
    pub(crate) location: String,
    pub(crate) people_present: Vec<String>,
    pub(crate) tags: Vec<String>,
    pub(crate) stats: PostStats,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct CreatePostRequest {
    pub(crate) media_type: String,
    pub(crate) media_url: String,
    pub(crate) thumbnail_url: String,
    pub(crate) title: String,
    pub(crate) caption: String,
    pub(crate) location: String,
    pub(crate) people_present: Vec<String>,
    pub(crate) tags: Vec<String>,
}

/// Validated form of [`CreatePostRequest`].
#[derive(Debug, Clone)]
pub(crate) struct PostDraft {
    pub(crate) media_type: MediaKind,
    pub(crate) media_url: String,
    pub(crate) thumbnail_url: String,
    pub(crate) title: String,
    pub(crate) caption: String,
    pub(crate) location: String,
    pub(crate) people_present: Vec<String>,
    pub(crate) tags: Vec<String>,
}

impl CreatePostRequest {
    pub(crate) fn validate(self) -> Result<PostDraft, DomainError> {
        let media_type = self.media_type.trim().parse::<MediaKind>()?;

        let media_url = self.media_url.trim().to_string();
        if media_url.is_empty() {
            return Err(DomainError::Validation {
                field: "media_url",
                message: "must not be empty",
            });
        }

        Ok(PostDraft {
            media_type,
            media_url,
            thumbnail_url: self.thumbnail_url.trim().to_string(),
            title: normalize_title(&self.title)?,
            caption: normalize_bounded("caption", &self.caption, 2000)?,
            location: normalize_bounded("location", &self.location, 120)?,
            people_present: normalize_list("people_present", self.people_present)?,
            tags: normalize_list("tags", self.tags)?,
        })
    }
}

fn normalize_title(title: &str) -> Result<String, DomainError> {
    let title = title.trim();
    if title.is_empty() || title.chars().count() > 120 {
        return Err(DomainError::Validation {
            field: "title",
            message: "must be 1..120 chars",
        });
    }
    Ok(title.to_string())
}

fn normalize_bounded(
    field: &'static str,
    value: &str,
    max_chars: usize,
) -> Result<String, DomainError> {
    let value = value.trim();
    if value.chars().count() > max_chars {
        return Err(DomainError::Validation {
            field,
            message: "is too long",
        });
    }
    Ok(value.to_string())
}

fn normalize_list(field: &'static str, items: Vec<String>) -> Result<Vec<String>, DomainError> {
    let items: Vec<String> = items
        .into_iter()
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect();

    if items.len() > MAX_LIST_ITEMS
        || items
            .iter()
            .any(|item| item.chars().count() > MAX_LIST_ITEM_CHARS)
    {
        return Err(DomainError::Validation {
            field,
            message: "has too many or too long entries",
        });
    }
    Ok(items)
}
