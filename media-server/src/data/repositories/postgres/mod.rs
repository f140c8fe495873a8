pub(crate) mod comment_repository;
pub(crate) mod post_repository;
pub(crate) mod rating_repository;
pub(crate) mod user_repository;

use crate::domain::error::DomainError;

pub(crate) fn map_db_error(err: sqlx::Error, missing: &str) -> DomainError {
    if let sqlx::Error::Database(db_err) = &err {
        match db_err.code().as_deref() {
            Some("23503") => return DomainError::NotFound(missing.to_string()),
            Some("23505") => {
                let resource = match db_err.constraint() {
                    Some("users_email_key") => "email",
                    _ => "resource",
                };
                return DomainError::AlreadyExists(resource.to_string());
            }
            _ => {}
        }
    }
    DomainError::Upstream(err.to_string())
}
