pub(crate) mod auth_service;
pub(crate) mod catalog_service;
pub(crate) mod rating_service;
