pub mod activity_log;
pub mod config;
pub mod error;
pub mod key_value_store;
pub mod session_api;
