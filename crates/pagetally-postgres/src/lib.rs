pub mod backend;
pub mod event_store;
pub mod schema;

pub use backend::PgStore;
