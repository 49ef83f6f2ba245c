//! Storage backend abstraction.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;

use crate::dialect::Dialect;
use crate::error::{CoreError, CoreResult};
use crate::event::Event;
use crate::property::{CreatePropertyParams, Property, UpdatePropertyParams};
use crate::report::{CountRow, TimeWindow};

/// Persistence interface shared by the embedded and client-server engines.
///
/// Backends know nothing about report semantics: they execute the grouped-count
/// statements built by [`crate::report::ReportSql`] for their own [`Dialect`]
/// and hand back the rows.
#[async_trait]
pub trait EventStore: Send + Sync + 'static {
    fn dialect(&self) -> Dialect;

    /// Lightweight liveness check used by `/health`.
    async fn ping(&self) -> anyhow::Result<()>;

    /// Insert one event atomically.
    async fn insert_event(&self, event: &Event) -> anyhow::Result<()>;

    /// Run a report statement, binding `property_id`, `window.start` and
    /// `window.end` as parameters 1, 2 and 3.
    async fn grouped_counts(
        &self,
        sql: &str,
        property_id: &str,
        window: &TimeWindow,
    ) -> anyhow::Result<Vec<CountRow>>;

    async fn create_property(&self, params: CreatePropertyParams) -> anyhow::Result<Property>;

    /// All properties ordered by lower-cased name, optionally restricted to
    /// names containing `name_filter`.
    async fn list_properties(&self, name_filter: Option<&str>) -> anyhow::Result<Vec<Property>>;

    async fn get_property(&self, id: &str) -> anyhow::Result<Option<Property>>;

    async fn get_property_by_token(&self, token: &str) -> anyhow::Result<Option<Property>>;

    /// Returns `Ok(None)` when no property has this id.
    async fn update_property(
        &self,
        id: &str,
        params: UpdatePropertyParams,
    ) -> anyhow::Result<Option<Property>>;

    /// Delete a property together with its events. Returns `false` when the
    /// property did not exist.
    async fn delete_property(&self, id: &str) -> anyhow::Result<bool>;
}

/// Run a storage call under `timeout`, folding both failure kinds into
/// [`CoreError::Storage`].
pub async fn bounded<T>(
    timeout: Duration,
    fut: impl Future<Output = anyhow::Result<T>>,
) -> CoreResult<T> {
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result.map_err(CoreError::Storage),
        Err(_) => Err(CoreError::Storage(anyhow::anyhow!(
            "storage operation timed out after {timeout:?}"
        ))),
    }
}
