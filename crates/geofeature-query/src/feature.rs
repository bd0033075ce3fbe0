//! GeoJSON envelopes and collection metadata documents.

use crate::error::{FeatureError, Result};
use crate::types::{BoundingBox, ColumnSet, TableRef, ID_COLUMN};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

pub const CRS84: &str = "http://www.opengis.net/def/crs/OGC/1.3/CRS84";

/// A GeoJSON Feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(default)]
    pub geometry: Value,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

/// A GeoJSON FeatureCollection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<Vec<f64>>,
    #[serde(default)]
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    /// Wrap the document aggregated by the store.
    ///
    /// Lifts `gid` into each feature's `id` and records the extent of the
    /// returned geometries.
    pub fn from_store_document(document: Value) -> Result<Self> {
        let document = match document {
            Value::Null => {
                return Ok(Self {
                    kind: "FeatureCollection".to_string(),
                    bbox: None,
                    features: Vec::new(),
                })
            }
            other => other,
        };

        let mut collection: FeatureCollection = serde_json::from_value(document).map_err(|e| {
            FeatureError::StoreQuery(format!("store returned an unexpected document: {}", e))
        })?;

        if collection.kind != "FeatureCollection" {
            return Err(FeatureError::StoreQuery(format!(
                "store returned a '{}' document instead of a FeatureCollection",
                collection.kind
            )));
        }

        for feature in &mut collection.features {
            if feature.id.is_none() {
                feature.id = feature.properties.get(ID_COLUMN).cloned();
            }
        }

        collection.bbox = collection.extent().map(|b| b.to_vec());
        Ok(collection)
    }

    /// Extent of every coordinate in the collection
    pub fn extent(&self) -> Option<BoundingBox> {
        self.features
            .iter()
            .filter_map(|f| geometry_extent(&f.geometry))
            .reduce(|acc, b| acc.union(&b))
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// The first feature, or `NotFound` when the lookup matched nothing
    pub fn into_single(self, what: &str) -> Result<Feature> {
        self.features
            .into_iter()
            .next()
            .ok_or_else(|| FeatureError::not_found(what.to_string()))
    }
}

/// Bounding box of a GeoJSON geometry, `None` for null or empty geometries
pub fn geometry_extent(geometry: &Value) -> Option<BoundingBox> {
    let object = geometry.as_object()?;

    if let Some(Value::Array(geometries)) = object.get("geometries") {
        return geometries
            .iter()
            .filter_map(geometry_extent)
            .reduce(|acc, b| acc.union(&b));
    }

    let mut extent: Option<BoundingBox> = None;
    visit_positions(object.get("coordinates")?, &mut extent);
    extent
}

fn visit_positions(value: &Value, extent: &mut Option<BoundingBox>) {
    let Value::Array(items) = value else {
        return;
    };

    // A position is an array whose first two members are numbers
    if let (Some(x), Some(y)) = (
        items.first().and_then(Value::as_f64),
        items.get(1).and_then(Value::as_f64),
    ) {
        match extent {
            Some(b) => b.extend(x, y),
            None => *extent = Some(BoundingBox::new(x, y, x, y)),
        }
        return;
    }

    for item in items {
        visit_positions(item, extent);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    #[serde(rename = "type")]
    pub media_type: String,
    pub rel: String,
    pub title: String,
    pub href: String,
}

impl Link {
    fn json(rel: &str, title: &str, href: String) -> Self {
        Self {
            media_type: "application/json".to_string(),
            rel: rel.to_string(),
            title: title.to_string(),
            href,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpatialExtent {
    pub bbox: Option<Vec<f64>>,
    pub crs: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    pub spatial: SpatialExtent,
}

/// Description of one collection (table)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionMetadata {
    pub id: String,
    pub title: String,
    pub description: String,
    pub keywords: Vec<String>,
    pub links: Vec<Link>,
    pub extent: Extent,
    #[serde(rename = "itemType")]
    pub item_type: String,
}

impl CollectionMetadata {
    pub fn new(base_url: &str, table: &TableRef, bounds: Option<BoundingBox>) -> Self {
        let id = table.collection_id();
        let href = format!("{}/collections/{}", base_url.trim_end_matches('/'), id);

        Self {
            title: table.table.clone(),
            description: id.clone(),
            keywords: vec![table.table.clone(), table.schema.clone()],
            links: vec![
                Link::json("self", "This document as JSON", href.clone()),
                Link::json("items", "Items as GeoJSON", format!("{}/items", href)),
                Link::json(
                    "queryables",
                    "Queryable properties",
                    format!("{}/queryables", href),
                ),
            ],
            extent: Extent {
                spatial: SpatialExtent {
                    bbox: bounds.map(|b| b.to_vec()),
                    crs: CRS84.to_string(),
                },
            },
            item_type: "feature".to_string(),
            id,
        }
    }
}

/// `GET /collections` document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collections {
    pub collections: Vec<CollectionMetadata>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Queryable {
    pub title: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// Column name -> queryable description
pub type Queryables = BTreeMap<String, Queryable>;

/// Queryables document for the verified columns of a table
pub fn queryables(columns: &ColumnSet) -> Queryables {
    columns
        .iter()
        .map(|column| {
            let kind = if column.field_type().is_numeric() {
                "numeric"
            } else {
                "string"
            };
            (
                column.name.clone(),
                Queryable {
                    title: column.name.clone(),
                    kind: kind.to_string(),
                },
            )
        })
        .collect()
}
