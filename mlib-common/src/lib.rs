//! # MLIB Common Library
//!
//! Shared code for the media library service and its maintenance tools:
//! - Error type
//! - Root folder resolution and service configuration
//! - Database schema, migrations and record models
//! - Access policy for content items and notes

pub mod access;
pub mod config;
pub mod db;
pub mod error;

pub use access::CallerContext;
pub use error::{Error, Result};
