//! # bioseed common library
//!
//! Shared code for the bioseed crates:
//! - Error type
//! - Configuration loading and root folder resolution
//! - Database initialization and table/column names
//! - Epoch-day date helpers

pub mod config;
pub mod db;
pub mod error;
pub mod time;

pub use error::{Error, Result};
