use async_trait::async_trait;

use pagetally_core::dialect::Dialect;
use pagetally_core::event::Event;
use pagetally_core::property::{CreatePropertyParams, Property, UpdatePropertyParams};
use pagetally_core::report::{CountRow, TimeWindow};
use pagetally_core::store::EventStore;

use crate::DuckDbStore;

#[async_trait]
impl EventStore for DuckDbStore {
    fn dialect(&self) -> Dialect {
        Dialect::DuckDb
    }

    async fn ping(&self) -> anyhow::Result<()> {
        DuckDbStore::ping(self).await
    }

    async fn insert_event(&self, event: &Event) -> anyhow::Result<()> {
        DuckDbStore::insert_event(self, event).await
    }

    async fn grouped_counts(
        &self,
        sql: &str,
        property_id: &str,
        window: &TimeWindow,
    ) -> anyhow::Result<Vec<CountRow>> {
        DuckDbStore::grouped_counts(self, sql, property_id, window).await
    }

    async fn create_property(&self, params: CreatePropertyParams) -> anyhow::Result<Property> {
        DuckDbStore::create_property(self, params).await
    }

    async fn list_properties(&self, name_filter: Option<&str>) -> anyhow::Result<Vec<Property>> {
        DuckDbStore::list_properties(self, name_filter).await
    }

    async fn get_property(&self, id: &str) -> anyhow::Result<Option<Property>> {
        DuckDbStore::get_property(self, id).await
    }

    async fn get_property_by_token(&self, token: &str) -> anyhow::Result<Option<Property>> {
        DuckDbStore::get_property_by_token(self, token).await
    }

    async fn update_property(
        &self,
        id: &str,
        params: UpdatePropertyParams,
    ) -> anyhow::Result<Option<Property>> {
        DuckDbStore::update_property(self, id, params).await
    }

    async fn delete_property(&self, id: &str) -> anyhow::Result<bool> {
        DuckDbStore::delete_property(self, id).await
    }
}
