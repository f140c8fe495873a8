use uuid::Uuid;

use super::error::DomainError;
use super::user::{Role, User};

/// Verified caller attached to a request after token verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Identity {
    pub(crate) user_id: Uuid,
    pub(crate) email: Option<String>,
    pub(crate) display_name: String,
    pub(crate) role: Role,
}

impl Identity {
    /// Membership check against the operation's own allow-list.
    /// Roles carry no hierarchy: `admin` passes only where it is listed.
    pub(crate) fn authorize(&self, allowed: &[Role]) -> Result<(), DomainError> {
        if allowed.contains(&self.role) {
            Ok(())
        } else {
            Err(DomainError::Forbidden)
        }
    }
}

impl From<&User> for Identity {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            email: Some(user.email.clone()),
            display_name: user.display_name.clone(),
            role: user.role,
        }
    }
}
