//! Database initialization and shared schema names

pub mod init;
pub mod schema;

pub use init::*;
