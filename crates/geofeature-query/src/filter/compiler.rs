//! Compiles a filter tree into a parameterized SQL predicate.

use super::ast::{FilterExpr, Literal};
use crate::error::{FeatureError, Result};
use crate::types::{quote_ident, ColumnDescriptor, ColumnSet, SqlParams};

/// Compile `expr` against the verified `columns`, appending literals to
/// `params`. Fails with `FilterField` on the first unknown column.
pub fn compile_filter(
    expr: &FilterExpr,
    columns: &ColumnSet,
    params: &mut SqlParams,
) -> Result<String> {
    match expr {
        FilterExpr::Comparison { column, op, value } => {
            let column = resolve(columns, column)?;
            let rhs = bind_literal(value, column, params);
            Ok(format!(
                "({} {} {})",
                quote_ident(&column.name),
                op.as_sql(),
                rhs
            ))
        }

        FilterExpr::Like {
            column,
            pattern,
            case_insensitive,
            negated,
        } => {
            let column = resolve(columns, column)?;
            let operator = match (negated, case_insensitive) {
                (false, false) => "LIKE",
                (false, true) => "ILIKE",
                (true, false) => "NOT LIKE",
                (true, true) => "NOT ILIKE",
            };
            let rhs = params.push_text(pattern.clone());
            Ok(format!(
                "({}::text {} {})",
                quote_ident(&column.name),
                operator,
                rhs
            ))
        }

        FilterExpr::Between {
            column,
            low,
            high,
            negated,
        } => {
            let column = resolve(columns, column)?;
            let low = bind_literal(low, column, params);
            let high = bind_literal(high, column, params);
            Ok(format!(
                "({} {}BETWEEN {} AND {})",
                quote_ident(&column.name),
                if *negated { "NOT " } else { "" },
                low,
                high
            ))
        }

        FilterExpr::In {
            column,
            values,
            negated,
        } => {
            let column = resolve(columns, column)?;
            let bound: Vec<String> = values
                .iter()
                .map(|v| bind_literal(v, column, params))
                .collect();
            Ok(format!(
                "({} {}IN ({}))",
                quote_ident(&column.name),
                if *negated { "NOT " } else { "" },
                bound.join(", ")
            ))
        }

        FilterExpr::IsNull { column, negated } => {
            let column = resolve(columns, column)?;
            Ok(format!(
                "({} IS {}NULL)",
                quote_ident(&column.name),
                if *negated { "NOT " } else { "" }
            ))
        }

        FilterExpr::And(children) => join(children, " AND ", columns, params),
        FilterExpr::Or(children) => join(children, " OR ", columns, params),
        FilterExpr::Not(child) => Ok(format!("(NOT {})", compile_filter(child, columns, params)?)),
    }
}

/// Check every column reference without producing SQL
pub fn verify_columns(expr: &FilterExpr, columns: &ColumnSet) -> Result<()> {
    for name in expr.columns() {
        resolve(columns, name)?;
    }
    Ok(())
}

/// Names arrive already case-folded by the parser, so only exact matches
/// count.
fn resolve<'a>(columns: &'a ColumnSet, name: &str) -> Result<&'a ColumnDescriptor> {
    columns
        .get(name)
        .ok_or_else(|| FeatureError::FilterField(name.to_string()))
}

fn bind_literal(value: &Literal, column: &ColumnDescriptor, params: &mut SqlParams) -> String {
    let placeholder = params.push_text(value.to_param_text());

    // A number compared with a numeric column keeps its exact value:
    // `gid > 2.5` must not be cast to integer
    if matches!(value, Literal::Number(_)) && column.field_type().is_numeric() {
        return format!("{}::numeric", placeholder);
    }

    match column.cast_type() {
        "text" => placeholder,
        cast => format!("{}::{}", placeholder, cast),
    }
}

fn join(
    children: &[FilterExpr],
    separator: &str,
    columns: &ColumnSet,
    params: &mut SqlParams,
) -> Result<String> {
    let parts = children
        .iter()
        .map(|child| compile_filter(child, columns, params))
        .collect::<Result<Vec<_>>>()?;
    Ok(format!("({})", parts.join(separator)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::parse_filter;
    use crate::types::SqlValue;

    fn columns() -> ColumnSet {
        ColumnSet::from_descriptors(vec![
            ColumnDescriptor::new("gid", "integer"),
            ColumnDescriptor::new("status", "text"),
            ColumnDescriptor::new("region", "character varying(32)"),
            ColumnDescriptor::new("area", "double precision"),
            ColumnDescriptor::new("geom", "geometry(Polygon,4326)"),
        ])
    }

    fn compile(input: &str) -> Result<(String, Vec<SqlValue>)> {
        let expr = parse_filter(input)?.expect("non-empty filter");
        let mut params = SqlParams::new();
        let sql = compile_filter(&expr, &columns(), &mut params)?;
        Ok((sql, params.into_values()))
    }

    #[test]
    fn test_comparison_binds_and_casts() {
        let (sql, params) = compile("gid >= 10").unwrap();
        assert_eq!(sql, "(\"gid\" >= $1::text::numeric)");
        assert_eq!(params, vec![SqlValue::Text("10".to_string())]);

        let (sql, _) = compile("status = 'active'").unwrap();
        assert_eq!(sql, "(\"status\" = $1::text)");

        // Quoted literals still take the column type
        let (sql, _) = compile("gid = '10'").unwrap();
        assert_eq!(sql, "(\"gid\" = $1::text::integer)");
    }

    #[test]
    fn test_fractional_numbers_against_integer_column() {
        let (sql, params) = compile("gid > 2.5").unwrap();
        assert_eq!(sql, "(\"gid\" > $1::text::numeric)");
        assert_eq!(params, vec![SqlValue::Text("2.5".to_string())]);

        let (sql, _) = compile("gid IN (1, 2.0)").unwrap();
        assert_eq!(sql, "(\"gid\" IN ($1::text::numeric, $2::text::numeric))");
    }

    #[test]
    fn test_boolean_structure_is_parenthesized() {
        let (sql, params) = compile("status = 'a' AND (gid < 3 OR NOT area > 1.5)").unwrap();
        assert_eq!(
            sql,
            "((\"status\" = $1::text) AND ((\"gid\" < $2::text::numeric) OR (NOT (\"area\" > $3::text::numeric))))"
        );
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn test_like_between_in_null() {
        let (sql, params) = compile("region NOT ILIKE 'no%'").unwrap();
        assert_eq!(sql, "(\"region\"::text NOT ILIKE $1::text)");
        assert_eq!(params, vec![SqlValue::Text("no%".to_string())]);

        let (sql, _) = compile("gid BETWEEN 1 AND 5").unwrap();
        assert_eq!(
            sql,
            "(\"gid\" BETWEEN $1::text::numeric AND $2::text::numeric)"
        );

        let (sql, params) = compile("gid NOT IN (1, 2, 3)").unwrap();
        assert_eq!(
            sql,
            "(\"gid\" NOT IN ($1::text::numeric, $2::text::numeric, $3::text::numeric))"
        );
        assert_eq!(params.len(), 3);

        let (sql, params) = compile("status IS NULL").unwrap();
        assert_eq!(sql, "(\"status\" IS NULL)");
        assert!(params.is_empty());
    }

    #[test]
    fn test_literals_never_reach_sql_text() {
        let (sql, params) = compile("status = 'x''); DROP TABLE parcels; --'").unwrap();
        assert!(!sql.contains("DROP"));
        assert_eq!(
            params,
            vec![SqlValue::Text("x'); DROP TABLE parcels; --".to_string())]
        );
    }

    #[test]
    fn test_unknown_column_fails_loudly() {
        let err = compile("status = 'a' OR owner = 'me'").unwrap_err();
        assert!(matches!(err, FeatureError::FilterField(ref c) if c == "owner"));

        let err = compile("geom IS NULL").unwrap_err();
        assert!(matches!(err, FeatureError::FilterField(ref c) if c == "geom"));
    }

    #[test]
    fn test_verify_columns() {
        let expr = parse_filter("gid = 1 AND NOT (nope = 2)").unwrap().unwrap();
        assert!(matches!(
            verify_columns(&expr, &columns()),
            Err(FeatureError::FilterField(ref c)) if c == "nope"
        ));

        let expr = parse_filter("STATUS = 'a'").unwrap().unwrap();
        assert!(verify_columns(&expr, &columns()).is_ok());
    }

    #[test]
    fn test_resolved_name_is_emitted() {
        let (sql, _) = compile("STATUS = 'a'").unwrap();
        assert_eq!(sql, "(\"status\" = $1::text)");
    }

    #[test]
    fn test_quoted_identifiers_match_exactly() {
        let err = compile("\"STATUS\" = 'a'").unwrap_err();
        assert!(matches!(err, FeatureError::FilterField(ref c) if c == "STATUS"));

        let (sql, _) = compile("\"status\" = 'a'").unwrap();
        assert_eq!(sql, "(\"status\" = $1::text)");
    }
}
