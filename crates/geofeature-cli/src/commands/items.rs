use super::{print_json, with_service, GlobalArgs};
use clap::Args;
use geofeature_query::ItemsRequest;
use tracing::info;

#[derive(Args)]
pub struct ItemsCommand {
    /// Collection id: database.schema.table
    pub collection_id: String,

    /// Request parameters as a URL query string,
    /// e.g. "bbox=0,0,10,10&filter=status='active'&limit=10"
    #[arg(long, short, default_value = "")]
    pub query: String,
}

impl ItemsCommand {
    pub fn execute(self, global: &GlobalArgs) -> anyhow::Result<()> {
        let request = ItemsRequest::from_query_string(&self.query)?;
        info!("Fetching items of {}", self.collection_id);

        let features = with_service(global, |service| async move {
            service.items(&self.collection_id, &request).await
        })?;
        print_json(&features)
    }
}

#[derive(Args)]
pub struct ItemCommand {
    /// Collection id: database.schema.table
    pub collection_id: String,

    /// Value of the gid column
    pub feature_id: String,

    /// Request parameters as a URL query string; only `properties` and
    /// `srid` apply
    #[arg(long, short, default_value = "")]
    pub query: String,
}

impl ItemCommand {
    pub fn execute(self, global: &GlobalArgs) -> anyhow::Result<()> {
        let request = ItemsRequest::from_query_string(&self.query)?;

        let feature = with_service(global, |service| async move {
            service
                .item(&self.collection_id, &self.feature_id, &request)
                .await
        })?;
        print_json(&feature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        items: ItemsCommand,
    }

    #[test]
    fn test_items_arguments() {
        let harness = Harness::parse_from([
            "geofeature",
            "data.public.parcels",
            "--query",
            "limit=5&sortby=gid:D",
        ]);
        assert_eq!(harness.items.collection_id, "data.public.parcels");

        let request = ItemsRequest::from_query_string(&harness.items.query).unwrap();
        assert_eq!(request.limit, Some(5));
    }

    #[test]
    fn test_query_defaults_to_empty() {
        let harness = Harness::parse_from(["geofeature", "data.public.parcels"]);
        assert_eq!(
            ItemsRequest::from_query_string(&harness.items.query).unwrap(),
            ItemsRequest::default()
        );
    }
}
