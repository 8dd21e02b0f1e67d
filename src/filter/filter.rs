use super::error::FilterError;
use super::filter_order::FilterOrder;
use super::filter_where::{is_identifier, validate_column, FilterWhere};
use super::types::{FilterOrderInfo, Predicate, SqlResult};

/// An immutable read query: table, projection, AND'ed predicates, ordering and paging.
///
/// Builder methods consume and return the filter so a query is assembled by
/// pushing predicate values rather than mutating a half-built SQL string.
#[derive(Debug, Clone)]
pub struct Filter {
    table_name: String,
    select_columns: Vec<String>,
    predicates: Vec<Predicate>,
    order_data: Vec<FilterOrderInfo>,
    limit: Option<i64>,
    offset: Option<i64>,
}

impl Filter {
    pub fn new(table_name: impl Into<String>) -> Result<Self, FilterError> {
        let table_name = table_name.into();
        if !is_identifier(&table_name) {
            return Err(FilterError::InvalidTableName(format!("Invalid table name format: {}", table_name)));
        }
        Ok(Self {
            table_name,
            select_columns: vec![],
            predicates: vec![],
            order_data: vec![],
            limit: None,
            offset: None,
        })
    }

    pub fn select<I, S>(mut self, columns: I) -> Result<Self, FilterError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        for column in &columns {
            if column != "*" { validate_column(column)?; }
        }
        self.select_columns = columns;
        Ok(self)
    }

    pub fn with(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn with_all(mut self, predicates: impl IntoIterator<Item = Predicate>) -> Self {
        self.predicates.extend(predicates);
        self
    }

    pub fn order(mut self, spec: &str) -> Result<Self, FilterError> {
        self.order_data.extend(FilterOrder::parse(spec)?);
        Ok(self)
    }

    pub fn limit(mut self, limit: i64, offset: Option<i64>) -> Result<Self, FilterError> {
        if limit < 0 { return Err(FilterError::InvalidLimit("Limit must be non-negative".to_string())); }
        if let Some(off) = offset { if off < 0 { return Err(FilterError::InvalidOffset("Offset must be non-negative".to_string())); } }
        self.limit = Some(limit);
        self.offset = offset;
        Ok(self)
    }

    pub fn table_name(&self) -> &str { &self.table_name }
    pub fn select_columns(&self) -> &[String] { &self.select_columns }
    pub fn predicates(&self) -> &[Predicate] { &self.predicates }
    pub fn order_info(&self) -> &[FilterOrderInfo] { &self.order_data }
    pub fn limit_value(&self) -> Option<i64> { self.limit }
    pub fn offset_value(&self) -> Option<i64> { self.offset }

    pub fn to_sql(&self) -> Result<SqlResult, FilterError> {
        self.build_query(self.build_select_clause())
    }

    /// Like `to_sql`, but each row is projected into a single JSONB column named `record`.
    pub fn to_record_sql(&self) -> Result<SqlResult, FilterError> {
        let projection = if self.select_columns.is_empty() || self.select_columns.iter().any(|c| c == "*") {
            format!("to_jsonb(\"{}\".*)", self.table_name)
        } else {
            let pairs: Vec<String> = self.select_columns.iter().map(|c| format!("'{}', \"{}\"", c, c)).collect();
            format!("jsonb_build_object({})", pairs.join(", "))
        };
        self.build_query(format!("{} AS record", projection))
    }

    fn build_query(&self, select_clause: String) -> Result<SqlResult, FilterError> {
        let (where_clause, params) = FilterWhere::generate(&self.predicates, 0)?;
        let order_clause = FilterOrder::generate(&self.order_data)?;
        let limit_clause = self.build_limit_clause();

        let query = [
            format!("SELECT {}", select_clause),
            format!("FROM \"{}\"", self.table_name),
            if where_clause.is_empty() { String::new() } else { format!("WHERE {}", where_clause) },
            order_clause,
            limit_clause,
        ].into_iter().filter(|s| !s.is_empty()).collect::<Vec<_>>().join(" ");

        Ok(SqlResult { query, params })
    }

    /// Exact count of matching rows; ordering and paging are ignored.
    pub fn to_count_sql(&self) -> Result<SqlResult, FilterError> {
        let (where_clause, params) = FilterWhere::generate(&self.predicates, 0)?;
        let query = if where_clause.is_empty() {
            format!("SELECT COUNT(*) AS count FROM \"{}\"", self.table_name)
        } else {
            format!("SELECT COUNT(*) AS count FROM \"{}\" WHERE {}", self.table_name, where_clause)
        };
        Ok(SqlResult { query, params })
    }

    fn build_select_clause(&self) -> String {
        if self.select_columns.is_empty() || self.select_columns.iter().any(|c| c == "*") {
            "*".to_string()
        } else {
            self.select_columns.iter().map(|c| format!("\"{}\"", c)).collect::<Vec<_>>().join(", ")
        }
    }

    fn build_limit_clause(&self) -> String {
        match (self.limit, self.offset) {
            (Some(l), Some(o)) => format!("LIMIT {} OFFSET {}", l, o),
            (Some(l), None) => format!("LIMIT {}", l),
            (None, Some(o)) => format!("OFFSET {}", o),
            (None, None) => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn compiles_full_select() {
        let filter = Filter::new("assessments").unwrap()
            .select(["user_id", "raw_scores"]).unwrap()
            .with(Predicate::in_list("user_id", ["a", "b"]))
            .with(Predicate::eq("status", "completed"))
            .order("started_at desc").unwrap()
            .limit(10, Some(20)).unwrap();

        let sql = filter.to_sql().unwrap();
        assert_eq!(
            sql.query,
            "SELECT \"user_id\", \"raw_scores\" FROM \"assessments\" WHERE \"user_id\" IN ($1, $2) AND \"status\" = $3 ORDER BY \"started_at\" DESC NULLS LAST LIMIT 10 OFFSET 20"
        );
        assert_eq!(sql.params, vec![json!("a"), json!("b"), json!("completed")]);
    }

    #[test]
    fn record_sql_projects_selected_columns() {
        let filter = Filter::new("profiles").unwrap()
            .select(["id", "class_id"]).unwrap()
            .with(Predicate::eq("role", "student"));
        let sql = filter.to_record_sql().unwrap();
        assert_eq!(
            sql.query,
            "SELECT jsonb_build_object('id', \"id\", 'class_id', \"class_id\") AS record FROM \"profiles\" WHERE \"role\" = $1"
        );

        let all = Filter::new("colleges").unwrap().order("code").unwrap().to_record_sql().unwrap();
        assert_eq!(all.query, "SELECT to_jsonb(\"colleges\".*) AS record FROM \"colleges\" ORDER BY \"code\" ASC NULLS LAST");
    }

    #[test]
    fn count_sql_ignores_paging() {
        let filter = Filter::new("profiles").unwrap()
            .with(Predicate::eq("role", "student"))
            .limit(5, None).unwrap();
        let sql = filter.to_count_sql().unwrap();
        assert_eq!(sql.query, "SELECT COUNT(*) AS count FROM \"profiles\" WHERE \"role\" = $1");
    }

    #[test]
    fn count_sql_without_predicates() {
        let sql = Filter::new("colleges").unwrap().to_count_sql().unwrap();
        assert_eq!(sql.query, "SELECT COUNT(*) AS count FROM \"colleges\"");
        assert!(sql.params.is_empty());
    }

    #[test]
    fn rejects_bad_names() {
        assert!(Filter::new("1table").is_err());
        assert!(Filter::new("").is_err());
        assert!(Filter::new("profiles").unwrap().select(["name; --"]).is_err());
        assert!(Filter::new("profiles").unwrap().limit(-1, None).is_err());
    }

    #[test]
    fn contains_escapes_wildcards() {
        let p = Predicate::contains("name", "50%_off");
        assert_eq!(p, Predicate::ilike("name", "%50\\%\\_off%"));
    }
}
