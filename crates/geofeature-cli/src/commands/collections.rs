use super::{print_json, with_service, GlobalArgs};
use clap::Args;
use tracing::info;

#[derive(Args)]
pub struct CollectionsCommand {}

impl CollectionsCommand {
    pub fn execute(self, global: &GlobalArgs) -> anyhow::Result<()> {
        info!("Listing collections");
        let base_url = global.base_url.clone();
        let collections =
            with_service(global, |service| async move { service.collections(&base_url).await })?;
        print_json(&collections)
    }
}

#[derive(Args)]
pub struct CollectionCommand {
    /// Collection id: database.schema.table
    pub collection_id: String,
}

impl CollectionCommand {
    pub fn execute(self, global: &GlobalArgs) -> anyhow::Result<()> {
        let base_url = global.base_url.clone();
        let metadata = with_service(global, |service| async move {
            service.collection(&base_url, &self.collection_id).await
        })?;
        print_json(&metadata)
    }
}

#[derive(Args)]
pub struct QueryablesCommand {
    /// Collection id: database.schema.table
    pub collection_id: String,
}

impl QueryablesCommand {
    pub fn execute(self, global: &GlobalArgs) -> anyhow::Result<()> {
        let queryables = with_service(global, |service| async move {
            service.queryables(&self.collection_id).await
        })?;
        print_json(&queryables)
    }
}
