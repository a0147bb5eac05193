//! Domain layer types and invariants.

pub mod age;
pub mod entities;
pub mod error;
pub mod names;
pub mod types;
