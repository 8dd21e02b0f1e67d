use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One condition of a query. A query's predicates are AND'ed together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Predicate {
    /// `column = value`, or `column IS NULL` when value is null
    Equals { column: String, value: Value },
    /// `column IN (values)`; an empty list matches nothing
    In { column: String, values: Vec<Value> },
    /// Inclusive bounds; a missing bound is open
    Range {
        column: String,
        min: Option<Value>,
        max: Option<Value>,
    },
    /// Case-insensitive SQL pattern (`%` and `_` wildcards)
    ILike { column: String, pattern: String },
}

impl Predicate {
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Predicate::Equals { column: column.into(), value: value.into() }
    }

    pub fn in_list<I, V>(column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Predicate::In {
            column: column.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn range(column: impl Into<String>, min: Option<Value>, max: Option<Value>) -> Self {
        Predicate::Range { column: column.into(), min, max }
    }

    pub fn ilike(column: impl Into<String>, pattern: impl Into<String>) -> Self {
        Predicate::ILike { column: column.into(), pattern: pattern.into() }
    }

    /// Substring search: wraps `text` in `%...%` after escaping wildcards.
    pub fn contains(column: impl Into<String>, text: &str) -> Self {
        let escaped = text.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
        Self::ilike(column, format!("%{}%", escaped))
    }

    pub fn column(&self) -> &str {
        match self {
            Predicate::Equals { column, .. }
            | Predicate::In { column, .. }
            | Predicate::Range { column, .. }
            | Predicate::ILike { column, .. } => column,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn to_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterOrderInfo {
    pub column: String,
    pub sort: SortDirection,
}

#[derive(Debug, Clone)]
pub struct SqlResult {
    pub query: String,
    pub params: Vec<Value>,
}
