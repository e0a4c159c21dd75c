//! Save game persistence: encode, catalog, load and auto save player records.

pub mod save;

pub use save::*;
