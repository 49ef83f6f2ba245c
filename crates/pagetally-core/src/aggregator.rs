use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::error::CoreResult;
use crate::report::{
    BrowserCountItem, CountRow, CountryCountItem, DashboardReport, Granularity, ReportSql,
    TimeWindow, TopPathItem, ViewsOverTimeItem,
};
use crate::store::{bounded, EventStore};

/// Read-only reports over one property's events inside a closed time window.
///
/// Statements come from [`ReportSql`] for the backend's own dialect; the
/// aggregator only maps the grouped rows into report items.
pub struct ReportAggregator {
    store: Arc<dyn EventStore>,
    sql: ReportSql,
    storage_timeout: Duration,
}

impl ReportAggregator {
    pub fn new(store: Arc<dyn EventStore>, storage_timeout: Duration) -> Self {
        let sql = ReportSql::new(store.dialect());
        Self {
            store,
            sql,
            storage_timeout,
        }
    }

    async fn run(&self, sql: &str, property_id: &str, window: &TimeWindow) -> CoreResult<Vec<CountRow>> {
        debug!(property_id, dialect = %self.sql.dialect(), "running report query");
        bounded(
            self.storage_timeout,
            self.store.grouped_counts(sql, property_id, window),
        )
        .await
    }

    /// Event counts per time bucket, ascending by bucket. Empty buckets are
    /// omitted.
    pub async fn views_over_time(
        &self,
        property_id: &str,
        window: &TimeWindow,
        granularity: Granularity,
    ) -> CoreResult<Vec<ViewsOverTimeItem>> {
        let rows = self
            .run(&self.sql.views_over_time(granularity), property_id, window)
            .await?;
        Ok(rows
            .into_iter()
            .map(|row| ViewsOverTimeItem {
                label: row.label,
                count: row.count,
            })
            .collect())
    }

    /// The ten most viewed paths, most viewed first.
    pub async fn top_paths(
        &self,
        property_id: &str,
        window: &TimeWindow,
    ) -> CoreResult<Vec<TopPathItem>> {
        let rows = self.run(&self.sql.top_paths(), property_id, window).await?;
        Ok(rows
            .into_iter()
            .map(|row| TopPathItem {
                path: row.key,
                count: row.count,
            })
            .collect())
    }

    pub async fn browser_counts(
        &self,
        property_id: &str,
        window: &TimeWindow,
    ) -> CoreResult<Vec<BrowserCountItem>> {
        let rows = self
            .run(&self.sql.browser_counts(), property_id, window)
            .await?;
        Ok(rows
            .into_iter()
            .map(|row| BrowserCountItem {
                browser: row.key,
                count: row.count,
            })
            .collect())
    }

    pub async fn country_counts(
        &self,
        property_id: &str,
        window: &TimeWindow,
    ) -> CoreResult<Vec<CountryCountItem>> {
        let rows = self
            .run(&self.sql.country_counts(), property_id, window)
            .await?;
        Ok(rows
            .into_iter()
            .map(|row| CountryCountItem {
                country: row.label,
                country_code: row.key,
                count: row.count,
            })
            .collect())
    }

    pub async fn dashboard(
        &self,
        property_id: &str,
        window: TimeWindow,
        granularity: Granularity,
    ) -> CoreResult<DashboardReport> {
        let (views_over_time, top_paths, browser_counts, country_counts) = tokio::try_join!(
            self.views_over_time(property_id, &window, granularity),
            self.top_paths(property_id, &window),
            self.browser_counts(property_id, &window),
            self.country_counts(property_id, &window),
        )?;

        Ok(DashboardReport {
            window,
            granularity,
            views_over_time,
            top_paths,
            browser_counts,
            country_counts,
        })
    }
}
