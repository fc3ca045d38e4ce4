// Business domains
pub mod auth;
pub mod listings;
pub mod sync;
