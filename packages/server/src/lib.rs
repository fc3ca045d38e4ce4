// Real-estate listings platform - API Core
//
// Syncs the upstream MLS syndication feed into per-tier listing stores and
// serves filtered, sorted, paginated reads over HTTP.

pub mod common;
pub mod config;
pub mod domains;
pub mod kernel;
pub mod server;

pub use config::*;
