//! Application services over the repository traits.

pub mod accounts;
pub mod admin;
pub mod children;
pub mod content;
pub mod diary;
pub mod error;
pub mod gate;
pub mod onboarding;
pub mod repos;
pub mod viewer;
