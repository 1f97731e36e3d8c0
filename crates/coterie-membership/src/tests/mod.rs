//! Membership service tests.
//!
//! Tests are organized into modules by operation:
//! - `common` - Shared fixtures
//! - `add_user`, `remove_user`, `change_role`, `update_group`, `get_group` - Operation scenarios
//! - `concurrency` - Concurrent adds against both store backends
//! - `mock_store` - Write suppression and backend failures, checked against a mocked store
//! - `stale_role` - Role changes landing between authorization and the write

pub mod common;

mod mock_store;
