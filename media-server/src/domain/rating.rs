use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::DomainError;

/// A star value in `1..=5`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct RatingValue(u8);

impl RatingValue {
    pub(crate) const MIN: i64 = 1;
    pub(crate) const MAX: i64 = 5;

    pub(crate) fn new(value: i64) -> Result<Self, DomainError> {
        if !(Self::MIN..=Self::MAX).contains(&value) {
            return Err(DomainError::Validation {
                field: "value",
                message: "must be between 1 and 5",
            });
        }
        Ok(Self(value as u8))
    }

    pub(crate) fn get(self) -> u8 {
        self.0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Rating {
    pub(crate) post_id: Uuid,
    pub(crate) user_id: Uuid,
    pub(crate) user_display_name: String,
    pub(crate) value: RatingValue,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct RatingAggregate {
    pub(crate) avg_rating: f64,
    pub(crate) rating_count: i64,
}

impl RatingAggregate {
    /// Mean and count over the full current row set of one post.
    /// An empty set yields `0.0 / 0`.
    pub(crate) fn from_ratings(ratings: &[Rating]) -> Self {
        if ratings.is_empty() {
            return Self::default();
        }
        let sum: i64 = ratings.iter().map(|r| i64::from(r.value.get())).sum();
        let count = ratings.len() as i64;
        Self {
            avg_rating: sum as f64 / count as f64,
            rating_count: count,
        }
    }
}
