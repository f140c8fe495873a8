pub(crate) mod comment;
pub(crate) mod error;
pub(crate) mod identity;
pub(crate) mod post;
pub(crate) mod rating;
pub(crate) mod user;
