//! Infrastructure adapters and runtime bootstrap.

pub mod assets;
pub mod db;
pub mod error;
pub mod http;
pub mod memory;
pub mod passwords;
pub mod sessions;
pub mod telemetry;
