//! Editor configuration
//!
//! Provides types, parsing and discovery for `pixtile.toml`.

pub mod loader;
pub mod schema;

pub use loader::*;
pub use schema::*;
