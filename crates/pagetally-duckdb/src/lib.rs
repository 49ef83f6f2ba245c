pub mod backend;
pub mod event_store;
pub mod property;
pub mod schema;

pub use backend::DuckDbStore;

/// Re-export the `duckdb` crate so consumers (especially tests) can use
/// `pagetally_duckdb::duckdb::params!` without an extra dependency.
pub use duckdb;
