// Infrastructure layer - External dependencies and adapters
pub mod alert_log;
pub mod config;
pub mod dates;
pub mod opentsdb_client;
pub mod variables;
