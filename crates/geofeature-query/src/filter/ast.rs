use std::fmt;

/// Comparison operators between a column and a literal
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ComparisonOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

impl ComparisonOp {
    pub fn as_sql(&self) -> &'static str {
        match self {
            ComparisonOp::Eq => "=",
            ComparisonOp::NotEq => "<>",
            ComparisonOp::Lt => "<",
            ComparisonOp::LtEq => "<=",
            ComparisonOp::Gt => ">",
            ComparisonOp::GtEq => ">=",
        }
    }
}

impl fmt::Display for ComparisonOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// Literal right-hand sides
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    String(String),
    /// Numbers keep their source text; they are bound as text and cast
    /// to `numeric` (or to the column type for non-numeric columns).
    Number(String),
    Boolean(bool),
}

impl Literal {
    /// Text form bound as a query parameter
    pub fn to_param_text(&self) -> String {
        match self {
            Literal::String(s) => s.clone(),
            Literal::Number(n) => n.clone(),
            Literal::Boolean(b) => b.to_string(),
        }
    }
}

/// Filter expression tree produced by the parser.
///
/// Column names are unverified until the compiler resolves them against a
/// table's column set.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterExpr {
    Comparison {
        column: String,
        op: ComparisonOp,
        value: Literal,
    },
    Like {
        column: String,
        pattern: String,
        case_insensitive: bool,
        negated: bool,
    },
    Between {
        column: String,
        low: Literal,
        high: Literal,
        negated: bool,
    },
    In {
        column: String,
        values: Vec<Literal>,
        negated: bool,
    },
    IsNull {
        column: String,
        negated: bool,
    },
    And(Vec<FilterExpr>),
    Or(Vec<FilterExpr>),
    Not(Box<FilterExpr>),
}

impl FilterExpr {
    /// `column = 'value'`
    pub fn equals(column: impl Into<String>, value: impl Into<String>) -> Self {
        FilterExpr::Comparison {
            column: column.into(),
            op: ComparisonOp::Eq,
            value: Literal::String(value.into()),
        }
    }

    /// AND-combine, collapsing the trivial cases
    pub fn all(mut children: Vec<FilterExpr>) -> Option<Self> {
        match children.len() {
            0 => None,
            1 => children.pop(),
            _ => Some(FilterExpr::And(children)),
        }
    }

    /// Every column name referenced anywhere in the tree, in visit order
    pub fn columns(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_columns(&mut out);
        out
    }

    fn collect_columns<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            FilterExpr::Comparison { column, .. }
            | FilterExpr::Like { column, .. }
            | FilterExpr::Between { column, .. }
            | FilterExpr::In { column, .. }
            | FilterExpr::IsNull { column, .. } => out.push(column),
            FilterExpr::And(children) | FilterExpr::Or(children) => {
                for child in children {
                    child.collect_columns(out);
                }
            }
            FilterExpr::Not(child) => child.collect_columns(out),
        }
    }
}
