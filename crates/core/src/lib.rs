//! Core business logic for civicwatch.

pub mod services;

pub use services::*;
