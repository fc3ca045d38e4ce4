pub mod listing;
pub mod tier;

pub use listing::*;
pub use tier::*;
