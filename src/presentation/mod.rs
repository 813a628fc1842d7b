// Presentation layer - Read-only HTTP surface over pipeline snapshots
pub mod app_state;
pub mod handlers;
