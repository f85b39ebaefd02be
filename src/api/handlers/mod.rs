//! HTTP endpoint handlers.

pub mod getwork;
pub mod system;
