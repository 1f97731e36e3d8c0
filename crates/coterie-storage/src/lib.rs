//! Storage abstraction for coterie.
//!
//! Backend crates (e.g., coterie-store-sqlite, coterie-store-memory) implement the
//! [`Store`] trait so `coterie-membership` doesn't depend on any specific database
//! engine or schema details.

mod store;
mod types;

pub use store::*;
pub use types::*;

use thiserror::Error;

/// Uniform error type for all storage backends.
///
/// `AlreadyExists`, `RoleMismatch` and `Conflict` are the outcomes of conditional writes whose
/// precondition did not hold at write time; callers treat them as ordinary results.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found")]
    NotFound,
    #[error("already exists")]
    AlreadyExists,
    #[error("conflict")]
    Conflict,
    #[error("role changed")]
    RoleMismatch,
    #[error("backend error: {0}")]
    Backend(String),
}
