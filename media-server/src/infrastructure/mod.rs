pub(crate) mod blob_sas;
pub(crate) mod database;
pub(crate) mod jwt;
pub(crate) mod logging;
pub(crate) mod settings;
