//! Type definitions for coterie storage.

mod groups;
mod ids;
mod roles;

// Re-export all types from submodules
pub use groups::*;
pub use ids::*;
pub use roles::*;
