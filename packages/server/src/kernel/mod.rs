//! Kernel module - server infrastructure and dependencies.

pub mod ampre;
pub mod scheduled_tasks;
pub mod test_dependencies;
pub mod traits;

pub use ampre::{ampre_feeds, ampre_pipeline, ampre_writer, upstream_http_client, AmpreListingFeed, AmpreListingWriter};
pub use scheduled_tasks::start_scheduler;
pub use test_dependencies::{MockListingFeed, MockListingWriter};
pub use traits::*;
