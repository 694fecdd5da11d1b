//! Bookstore application library
//!
//! A REST API over a single Book resource backed by a relational database.

pub mod app;
pub mod modules;

/// Re-export commonly used types
pub use modules::*;
