//! Items request parameters: parsing, equality filters and planning.

use crate::config::ServiceConfig;
use crate::error::{FeatureError, Result};
use crate::filter::{parse_filter, FilterExpr};
use crate::query::{Predicate, QuerySpec};
use crate::types::{BoundingBox, ColumnSet, SortKey, TableRef};
use tracing::{debug, warn};

/// Parameter names with a fixed meaning; everything else is a candidate
/// equality filter.
pub const RESERVED_PARAMETERS: [&str; 7] = [
    "bbox",
    "limit",
    "offset",
    "properties",
    "sortby",
    "filter",
    "srid",
];

pub fn is_reserved(name: &str) -> bool {
    RESERVED_PARAMETERS.contains(&name)
}

/// Parsed `items` request parameters. Column references are still
/// unverified; [`ItemsRequest::plan`] checks them against the table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemsRequest {
    pub bbox: Option<BoundingBox>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    /// Raw `properties` value; `None` and `*` both mean every column
    pub properties: Option<String>,
    pub sort: Option<SortKey>,
    pub filter: Option<FilterExpr>,
    pub srid: Option<i32>,
    /// Non-reserved parameters in request order
    pub extra: Vec<(String, String)>,
}

impl ItemsRequest {
    /// Parse (name, value) pairs. For repeated reserved names the last one wins.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut request = Self::default();

        for (name, value) in pairs {
            let name = name.as_ref();
            let value = value.as_ref();

            match name {
                "bbox" => request.bbox = Some(BoundingBox::parse(value)?),
                "limit" => request.limit = Some(parse_unsigned("limit", value)?),
                "offset" => request.offset = Some(parse_unsigned("offset", value)?),
                "properties" => request.properties = Some(value.to_string()),
                "sortby" => request.sort = Some(SortKey::parse(value)?),
                "filter" => request.filter = parse_filter(value)?,
                "srid" => request.srid = Some(parse_srid(value)?),
                _ => request.extra.push((name.to_string(), value.to_string())),
            }
        }

        Ok(request)
    }

    /// Parse a raw URL query string (`bbox=0,0,1,1&limit=10`)
    pub fn from_query_string(query: &str) -> Result<Self> {
        let pairs: Vec<(String, String)> = serde_urlencoded::from_str(query.trim_start_matches('?'))
            .map_err(|e| FeatureError::invalid_parameter("query", e.to_string()))?;
        Self::from_pairs(pairs)
    }

    /// Property names requested, `None` meaning all columns
    pub fn property_names(&self) -> Option<Vec<String>> {
        match self.properties.as_deref().map(str::trim) {
            None | Some("*") => None,
            Some("") => Some(Vec::new()),
            Some(list) => Some(
                list.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect(),
            ),
        }
    }

    /// Turn the request into a verified query plan for `table`
    pub fn plan(
        &self,
        table: TableRef,
        columns: ColumnSet,
        config: &ServiceConfig,
    ) -> Result<QuerySpec> {
        let limit = self
            .limit
            .unwrap_or(config.default_limit)
            .min(config.max_limit);
        let offset = self.offset.unwrap_or(0);
        let srid = self.srid.unwrap_or(config.default_srid);

        let equality = collect_equality_filters(
            &self.extra,
            &columns,
            config.reject_unknown_parameters,
        )?;

        let mut spec = QuerySpec::new(table, columns)
            .with_paging(offset, limit)
            .with_srid(srid);

        if let Some(names) = self.property_names() {
            spec = spec.with_properties(&names)?;
        }

        if let Some(sort) = &self.sort {
            spec = spec.with_sort(sort.clone())?;
        }

        if let Some(filter) = &self.filter {
            spec = spec.with_predicate(Predicate::Expression(filter.clone()))?;
        }

        if let Some(expr) = equality {
            spec = spec.with_predicate(Predicate::Expression(expr))?;
        }

        if let Some(bbox) = self.bbox {
            if bbox.is_inverted() {
                warn!(
                    "bbox {:?} has min above max on an axis; passing it through unchanged",
                    bbox
                );
            }
            spec = spec.with_predicate(Predicate::Intersects {
                bbox,
                axis_order: config.axis_order,
            })?;
        }

        Ok(spec)
    }
}

/// Turn non-reserved parameters naming a known column into AND-combined
/// equality predicates. Unknown names are ignored unless `reject_unknown`.
pub fn collect_equality_filters(
    extra: &[(String, String)],
    columns: &ColumnSet,
    reject_unknown: bool,
) -> Result<Option<FilterExpr>> {
    let mut predicates = Vec::new();

    for (name, value) in extra {
        if is_reserved(name) {
            continue;
        }

        match columns.resolve(name) {
            Some(column) if !column.accepts_text(value) => {
                return Err(FeatureError::invalid_parameter(
                    name.clone(),
                    format!("'{}' is not a valid {} value", value, column.field_type()),
                ));
            }
            Some(column) => predicates.push(FilterExpr::equals(column.name.clone(), value.clone())),
            None if reject_unknown => {
                return Err(FeatureError::invalid_parameter(
                    name.clone(),
                    "not a reserved parameter or a column of this collection",
                ));
            }
            None => debug!("Ignoring query parameter '{}': no such column", name),
        }
    }

    Ok(FilterExpr::all(predicates))
}

fn parse_unsigned(name: &str, value: &str) -> Result<u64> {
    value.trim().parse().map_err(|_| {
        FeatureError::invalid_parameter(name, format!("'{}' is not a non-negative integer", value))
    })
}

fn parse_srid(value: &str) -> Result<i32> {
    match value.trim().parse::<i32>() {
        Ok(srid) if srid > 0 => Ok(srid),
        _ => Err(FeatureError::invalid_parameter(
            "srid",
            format!("'{}' is not a positive integer", value),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AxisOrder, DatabaseConfig};
    use crate::types::{ColumnDescriptor, SortDirection, SqlValue};

    fn columns() -> ColumnSet {
        ColumnSet::from_descriptors(vec![
            ColumnDescriptor::new("gid", "integer"),
            ColumnDescriptor::new("status", "text"),
            ColumnDescriptor::new("region", "text"),
            ColumnDescriptor::new("geom", "geometry"),
        ])
    }

    fn config() -> ServiceConfig {
        ServiceConfig::default().with_database("data", DatabaseConfig::new("postgresql://x/data"))
    }

    fn table() -> TableRef {
        TableRef::new("data", "public", "parcels")
    }

    #[test]
    fn test_defaults() {
        let request = ItemsRequest::from_pairs(Vec::<(String, String)>::new()).unwrap();
        assert_eq!(request, ItemsRequest::default());

        let spec = request.plan(table(), columns(), &config()).unwrap();
        assert_eq!(spec.offset, 0);
        assert_eq!(spec.limit, 200_000);
        assert_eq!(spec.srid, 4326);
        assert_eq!(spec.properties, vec!["gid", "status", "region"]);
        assert_eq!(spec.sort, Some(SortKey::new("gid", SortDirection::Asc)));
        assert!(spec.predicates.is_empty());
    }

    #[test]
    fn test_query_string_parsing() {
        let request = ItemsRequest::from_query_string(
            "?bbox=0,0,10,10&limit=5&offset=2&properties=status,%20gid&sortby=gid:D&filter=status%3D%27active%27&srid=3857&region=north",
        )
        .unwrap();

        assert_eq!(request.bbox, Some(BoundingBox::new(0.0, 0.0, 10.0, 10.0)));
        assert_eq!(request.limit, Some(5));
        assert_eq!(request.offset, Some(2));
        assert_eq!(
            request.property_names(),
            Some(vec!["status".to_string(), "gid".to_string()])
        );
        assert_eq!(request.sort, Some(SortKey::new("gid", SortDirection::Desc)));
        assert!(request.filter.is_some());
        assert_eq!(request.srid, Some(3857));
        assert_eq!(
            request.extra,
            vec![("region".to_string(), "north".to_string())]
        );
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            ItemsRequest::from_pairs([("limit", "-1")]),
            Err(FeatureError::InvalidParameter { ref name, .. }) if name == "limit"
        ));
        assert!(matches!(
            ItemsRequest::from_pairs([("offset", "abc")]),
            Err(FeatureError::InvalidParameter { ref name, .. }) if name == "offset"
        ));
        assert!(matches!(
            ItemsRequest::from_pairs([("srid", "0")]),
            Err(FeatureError::InvalidParameter { ref name, .. }) if name == "srid"
        ));
        assert!(matches!(
            ItemsRequest::from_pairs([("bbox", "1,2")]),
            Err(FeatureError::BoundingBox(_))
        ));
        assert!(matches!(
            ItemsRequest::from_pairs([("filter", "status =")]),
            Err(FeatureError::FilterSyntax { .. })
        ));
    }

    #[test]
    fn test_empty_filter_is_no_predicate() {
        let request = ItemsRequest::from_pairs([("filter", "")]).unwrap();
        assert!(request.filter.is_none());
    }

    #[test]
    fn test_properties_variants() {
        let all = ItemsRequest::from_pairs([("properties", "*")]).unwrap();
        assert_eq!(all.property_names(), None);

        let none = ItemsRequest::from_pairs([("properties", "")]).unwrap();
        assert_eq!(none.property_names(), Some(Vec::new()));

        let unknown = ItemsRequest::from_pairs([("properties", "status,owner")]).unwrap();
        assert!(matches!(
            unknown.plan(table(), columns(), &config()),
            Err(FeatureError::InvalidParameter { ref name, .. }) if name == "properties"
        ));
    }

    #[test]
    fn test_equality_filters_are_collected() {
        let extra = vec![
            ("region".to_string(), "north".to_string()),
            ("typo".to_string(), "x".to_string()),
            ("status".to_string(), "active".to_string()),
        ];

        let expr = collect_equality_filters(&extra, &columns(), false)
            .unwrap()
            .unwrap();
        assert_eq!(
            expr,
            FilterExpr::And(vec![
                FilterExpr::equals("region", "north"),
                FilterExpr::equals("status", "active"),
            ])
        );

        assert!(matches!(
            collect_equality_filters(&extra, &columns(), true),
            Err(FeatureError::InvalidParameter { ref name, .. }) if name == "typo"
        ));

        assert!(collect_equality_filters(&[], &columns(), true)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_equality_value_must_fit_column_type() {
        let extra = vec![("gid".to_string(), "abc".to_string())];
        assert!(matches!(
            collect_equality_filters(&extra, &columns(), false),
            Err(FeatureError::InvalidParameter { ref name, .. }) if name == "gid"
        ));

        let extra = vec![("gid".to_string(), "12".to_string())];
        assert_eq!(
            collect_equality_filters(&extra, &columns(), false).unwrap(),
            Some(FilterExpr::equals("gid", "12"))
        );
    }

    #[test]
    fn test_filter_and_equality_combine() {
        let request =
            ItemsRequest::from_pairs([("filter", "status='active'"), ("region", "north")]).unwrap();
        let query = request
            .plan(table(), columns(), &config())
            .unwrap()
            .to_sql()
            .unwrap();

        assert!(query
            .sql
            .contains("WHERE (\"status\" = $2::text) AND (\"region\" = $3::text)"));
        assert_eq!(query.params[1], SqlValue::Text("active".to_string()));
        assert_eq!(query.params[2], SqlValue::Text("north".to_string()));
    }

    #[test]
    fn test_limit_is_clamped_and_axis_order_applied() {
        let mut config = config();
        config.max_limit = 50;
        config.default_limit = 10;
        config.axis_order = AxisOrder::LonLat;

        let request = ItemsRequest::from_pairs([("limit", "1000"), ("bbox", "1,2,3,4")]).unwrap();
        let spec = request.plan(table(), columns(), &config).unwrap();
        assert_eq!(spec.limit, 50);
        assert!(matches!(
            spec.predicates[0],
            Predicate::Intersects {
                axis_order: AxisOrder::LonLat,
                ..
            }
        ));

        let spec = ItemsRequest::default()
            .plan(table(), columns(), &config)
            .unwrap();
        assert_eq!(spec.limit, 10);
    }

    #[test]
    fn test_unknown_filter_column_fails_before_execution() {
        let request = ItemsRequest::from_pairs([("filter", "owner = 'me'")]).unwrap();
        assert!(matches!(
            request.plan(table(), columns(), &config()),
            Err(FeatureError::FilterField(ref c)) if c == "owner"
        ));
    }
}
