//! Common utilities and shared types for civicwatch.
//!
//! This crate provides foundational components used across all civicwatch crates:
//!
//! - **Configuration**: Application settings via [`Config`]
//! - **Error handling**: Unified error types via [`AppError`] and [`AppResult`]
//! - **Geo helpers**: Coordinate validation and haversine distance via [`GeoPoint`]
//! - **ID Generation**: ULID-based unique identifiers via [`IdGenerator`]
//! - **Storage**: Media storage backends for report attachments
//!
//! # Example
//!
//! ```no_run
//! use civicwatch_common::{Config, IdGenerator, AppResult};
//!
//! fn example() -> AppResult<()> {
//!     let config = Config::load()?;
//!     let id_gen = IdGenerator::new();
//!     let id = id_gen.generate();
//!     println!("Generated ID: {}", id);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod geo;
pub mod id;
pub mod storage;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use geo::{GeoPoint, validate_radius};
pub use id::IdGenerator;
pub use storage::{
    LocalStorage, MediaStore, StorageBackend, UploadedFile, generate_storage_key,
};
