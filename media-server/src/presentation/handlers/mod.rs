pub(crate) mod auth;
pub(crate) mod creator;
pub(crate) mod health;
pub(crate) mod media;
