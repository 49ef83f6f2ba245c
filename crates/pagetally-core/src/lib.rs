pub mod aggregator;
pub mod config;
pub mod dialect;
pub mod error;
pub mod event;
pub mod geo;
pub mod ingest;
pub mod property;
pub mod report;
pub mod store;

#[cfg(test)]
mod testing;

pub use aggregator::ReportAggregator;
pub use dialect::Dialect;
pub use error::{CoreError, CoreResult};
pub use geo::{GeoLookup, GeoResolver};
pub use ingest::Ingestor;
pub use store::EventStore;
