// Infrastructure layer - External dependencies and adapters
pub mod config;
pub mod json_mirror;
pub mod realtime_db;
pub mod record_mapper;
pub mod sse;
