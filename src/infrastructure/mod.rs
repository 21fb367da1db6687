pub mod catalog_client;
pub mod credentials;
pub mod session_storage;
pub mod stub_catalog;
