//! AskSniff: age-aware parenting advice.
//!
//! Symptom articles are filtered by the age group of the viewer's child. Visitors
//! pass a disclaimer and either pick an age or sign in and register children;
//! signed-in parents also keep a per-child diary, and editors maintain the
//! symptom taxonomy.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
pub mod presentation;
pub mod util;
