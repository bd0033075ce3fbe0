//! Query assembly: projection, predicates, ordering, paging and SRID
//! transform composed into one parameterized statement.

use crate::config::AxisOrder;
use crate::error::{FeatureError, Result};
use crate::filter::{compile_filter, verify_columns, FilterExpr};
use crate::types::{
    quote_ident, BoundingBox, ColumnSet, SortDirection, SortKey, SqlParams, SqlQuery, SqlValue,
    TableRef, GEOMETRY_COLUMN, ID_COLUMN, STORAGE_SRID,
};
use tracing::debug;

/// A boolean condition on the rows of the table
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Expression(FilterExpr),
    Intersects {
        bbox: BoundingBox,
        axis_order: AxisOrder,
    },
}

/// Everything needed to build one feature query.
///
/// Column names held here are always names taken from `columns`; the
/// builder methods reject anything else.
#[derive(Debug, Clone)]
pub struct QuerySpec {
    pub table: TableRef,
    pub columns: ColumnSet,
    pub properties: Vec<String>,
    pub predicates: Vec<Predicate>,
    pub sort: Option<SortKey>,
    pub offset: u64,
    pub limit: u64,
    pub srid: i32,
}

impl QuerySpec {
    /// Project every column, default `gid` ordering when the table has one
    pub fn new(table: TableRef, columns: ColumnSet) -> Self {
        let sort = columns
            .resolve(ID_COLUMN)
            .map(|c| SortKey::new(c.name.clone(), SortDirection::Asc));

        Self {
            properties: columns.names(),
            table,
            columns,
            predicates: Vec::new(),
            sort,
            offset: 0,
            limit: crate::config::DEFAULT_LIMIT,
            srid: STORAGE_SRID,
        }
    }

    /// Restrict the projection to the given columns (empty = geometry only)
    pub fn with_properties<S: AsRef<str>>(mut self, names: &[S]) -> Result<Self> {
        let mut properties: Vec<String> = Vec::new();
        for name in names {
            let column = self.columns.resolve(name.as_ref()).ok_or_else(|| {
                FeatureError::invalid_parameter(
                    "properties",
                    format!("unknown column '{}'", name.as_ref()),
                )
            })?;
            if !properties.contains(&column.name) {
                properties.push(column.name.clone());
            }
        }
        self.properties = properties;
        Ok(self)
    }

    pub fn with_predicate(mut self, predicate: Predicate) -> Result<Self> {
        if let Predicate::Expression(expr) = &predicate {
            verify_columns(expr, &self.columns)?;
        }
        self.predicates.push(predicate);
        Ok(self)
    }

    pub fn with_sort(mut self, sort: SortKey) -> Result<Self> {
        let column = self.columns.resolve(&sort.column).ok_or_else(|| {
            FeatureError::invalid_parameter("sortby", format!("unknown column '{}'", sort.column))
        })?;
        self.sort = Some(SortKey::new(column.name.clone(), sort.direction));
        Ok(self)
    }

    pub fn without_sort(mut self) -> Self {
        self.sort = None;
        self
    }

    pub fn with_paging(mut self, offset: u64, limit: u64) -> Self {
        self.offset = offset;
        self.limit = limit;
        self
    }

    pub fn with_srid(mut self, srid: i32) -> Self {
        self.srid = srid;
        self
    }

    /// Assemble the statement. The store aggregates the rows into a single
    /// FeatureCollection document.
    pub fn to_sql(&self) -> Result<SqlQuery> {
        let mut params = SqlParams::new();

        let srid = params.push(SqlValue::Int(i64::from(self.srid)));
        let mut select: Vec<String> = self.properties.iter().map(|p| quote_ident(p)).collect();
        select.push(format!(
            "ST_Transform({}, {}::integer) AS {}",
            quote_ident(GEOMETRY_COLUMN),
            srid,
            quote_ident(GEOMETRY_COLUMN)
        ));

        let mut inner = format!(
            "SELECT {} FROM {}",
            select.join(", "),
            self.table.qualified_name()
        );

        let conditions = self
            .predicates
            .iter()
            .map(|p| compile_predicate(p, &self.columns, &mut params))
            .collect::<Result<Vec<_>>>()?;
        if !conditions.is_empty() {
            inner.push_str(" WHERE ");
            inner.push_str(&conditions.join(" AND "));
        }

        if let Some(sort) = &self.sort {
            inner.push_str(&format!(
                " ORDER BY {} {}",
                quote_ident(&sort.column),
                sort.direction
            ));
        }

        let offset = params.push(SqlValue::Int(to_i64(self.offset, "offset")?));
        let limit = params.push(SqlValue::Int(to_i64(self.limit, "limit")?));
        inner.push_str(&format!(" OFFSET {} LIMIT {}", offset, limit));

        // Name the geometry column so a second geometry property is never
        // picked as the feature geometry
        let sql = format!(
            "SELECT json_build_object('type', 'FeatureCollection', 'features', \
             COALESCE(json_agg(ST_AsGeoJSON(t.*, '{}')::json), '[]'::json)) FROM ({}) AS t",
            GEOMETRY_COLUMN, inner
        );

        debug!("Assembled feature query for {}: {}", self.table, sql);

        Ok(SqlQuery {
            sql,
            params: params.into_values(),
        })
    }
}

fn to_i64(value: u64, name: &str) -> Result<i64> {
    i64::try_from(value)
        .map_err(|_| FeatureError::invalid_parameter(name, format!("{} is too large", value)))
}

fn compile_predicate(
    predicate: &Predicate,
    columns: &ColumnSet,
    params: &mut SqlParams,
) -> Result<String> {
    match predicate {
        Predicate::Expression(expr) => compile_filter(expr, columns, params),
        Predicate::Intersects { bbox, axis_order } => {
            Ok(intersects_sql(bbox, *axis_order, params))
        }
    }
}

/// `ST_Intersects(geom, envelope)` with the envelope built in EPSG:4326
/// from bound coordinates.
pub fn intersects_sql(bbox: &BoundingBox, axis_order: AxisOrder, params: &mut SqlParams) -> String {
    let (xmin, ymin, xmax, ymax) = match axis_order {
        AxisOrder::LonLat => (bbox.minx, bbox.miny, bbox.maxx, bbox.maxy),
        AxisOrder::Legacy => (bbox.miny, bbox.minx, bbox.maxy, bbox.maxx),
    };

    let corners: Vec<String> = [xmin, ymin, xmax, ymax]
        .into_iter()
        .map(|v| params.push(SqlValue::Float(v)))
        .collect();

    format!(
        "ST_Intersects({}, ST_MakeEnvelope({}, {}))",
        quote_ident(GEOMETRY_COLUMN),
        corners.join(", "),
        STORAGE_SRID
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::parse_filter;
    use crate::types::ColumnDescriptor;

    fn table() -> TableRef {
        TableRef::new("data", "public", "parcels")
    }

    fn columns() -> ColumnSet {
        ColumnSet::from_descriptors(vec![
            ColumnDescriptor::new("gid", "integer"),
            ColumnDescriptor::new("status", "text"),
            ColumnDescriptor::new("region", "text"),
            ColumnDescriptor::new("geom", "geometry(Polygon,4326)"),
        ])
    }

    #[test]
    fn test_default_query_shape() {
        let query = QuerySpec::new(table(), columns()).to_sql().unwrap();

        assert_eq!(
            query.sql,
            "SELECT json_build_object('type', 'FeatureCollection', 'features', \
             COALESCE(json_agg(ST_AsGeoJSON(t.*, 'geom')::json), '[]'::json)) FROM (\
             SELECT \"gid\", \"status\", \"region\", ST_Transform(\"geom\", $1::bigint::integer) AS \"geom\" \
             FROM \"public\".\"parcels\" ORDER BY \"gid\" ASC OFFSET $2::bigint LIMIT $3::bigint) AS t"
        );
        assert_eq!(
            query.params,
            vec![
                SqlValue::Int(4326),
                SqlValue::Int(0),
                SqlValue::Int(200_000)
            ]
        );
    }

    #[test]
    fn test_predicates_are_and_joined() {
        let filter = parse_filter("status = 'active'").unwrap().unwrap();
        let query = QuerySpec::new(table(), columns())
            .with_predicate(Predicate::Expression(filter))
            .unwrap()
            .with_predicate(Predicate::Expression(FilterExpr::equals("region", "north")))
            .unwrap()
            .to_sql()
            .unwrap();

        assert!(query
            .sql
            .contains("WHERE (\"status\" = $2::text) AND (\"region\" = $3::text) ORDER BY"));
        assert_eq!(query.params[1], SqlValue::Text("active".to_string()));
        assert_eq!(query.params[2], SqlValue::Text("north".to_string()));
    }

    #[test]
    fn test_where_omitted_without_predicates() {
        let query = QuerySpec::new(table(), columns()).to_sql().unwrap();
        assert!(!query.sql.contains("WHERE"));
    }

    #[test]
    fn test_bbox_predicate_orders() {
        let bbox = BoundingBox::new(1.0, 2.0, 3.0, 4.0);

        let mut params = SqlParams::new();
        let sql = intersects_sql(&bbox, AxisOrder::LonLat, &mut params);
        assert_eq!(
            sql,
            "ST_Intersects(\"geom\", ST_MakeEnvelope($1::double precision, $2::double precision, \
             $3::double precision, $4::double precision, 4326))"
        );
        assert_eq!(
            params.into_values(),
            vec![
                SqlValue::Float(1.0),
                SqlValue::Float(2.0),
                SqlValue::Float(3.0),
                SqlValue::Float(4.0)
            ]
        );

        let mut params = SqlParams::new();
        intersects_sql(&bbox, AxisOrder::Legacy, &mut params);
        assert_eq!(
            params.into_values(),
            vec![
                SqlValue::Float(2.0),
                SqlValue::Float(1.0),
                SqlValue::Float(4.0),
                SqlValue::Float(3.0)
            ]
        );
    }

    #[test]
    fn test_projection_sort_paging_srid() {
        let query = QuerySpec::new(table(), columns())
            .with_properties(&["status", "STATUS", "gid"])
            .unwrap()
            .with_sort(SortKey::new("gid", SortDirection::Desc))
            .unwrap()
            .with_paging(1, 1)
            .with_srid(3857)
            .to_sql()
            .unwrap();

        assert!(query.sql.contains(
            "SELECT \"status\", \"gid\", ST_Transform(\"geom\", $1::bigint::integer) AS \"geom\""
        ));
        assert!(query.sql.contains("ORDER BY \"gid\" DESC OFFSET $2::bigint LIMIT $3::bigint"));
        assert_eq!(
            query.params,
            vec![SqlValue::Int(3857), SqlValue::Int(1), SqlValue::Int(1)]
        );
    }

    #[test]
    fn test_geometry_only_projection() {
        let empty: [&str; 0] = [];
        let query = QuerySpec::new(table(), columns())
            .with_properties(&empty)
            .unwrap()
            .to_sql()
            .unwrap();
        assert!(query
            .sql
            .contains("(SELECT ST_Transform(\"geom\", $1::bigint::integer) AS \"geom\" FROM"));
    }

    #[test]
    fn test_unverified_identifiers_are_rejected() {
        assert!(matches!(
            QuerySpec::new(table(), columns()).with_properties(&["geom"]),
            Err(FeatureError::InvalidParameter { ref name, .. }) if name == "properties"
        ));
        assert!(matches!(
            QuerySpec::new(table(), columns())
                .with_sort(SortKey::new("gid; DROP TABLE x", SortDirection::Asc)),
            Err(FeatureError::InvalidParameter { ref name, .. }) if name == "sortby"
        ));
        let filter = parse_filter("owner = 'me'").unwrap().unwrap();
        assert!(matches!(
            QuerySpec::new(table(), columns()).with_predicate(Predicate::Expression(filter)),
            Err(FeatureError::FilterField(_))
        ));
    }

    #[test]
    fn test_no_default_sort_without_gid() {
        let columns = ColumnSet::from_descriptors(vec![ColumnDescriptor::new("name", "text")]);
        let query = QuerySpec::new(table(), columns).to_sql().unwrap();
        assert!(!query.sql.contains("ORDER BY"));
    }

    #[test]
    fn test_feature_geometry_is_named_column() {
        let columns = ColumnSet::from_descriptors(vec![
            ColumnDescriptor::new("gid", "integer"),
            ColumnDescriptor::new("centroid", "geometry(Point,4326)"),
            ColumnDescriptor::new("geom", "geometry(Polygon,4326)"),
        ]);
        let query = QuerySpec::new(table(), columns).to_sql().unwrap();

        assert!(query.sql.contains("ST_AsGeoJSON(t.*, 'geom')"));
        assert!(query.sql.contains("SELECT \"gid\", \"centroid\", ST_Transform("));
    }
}
