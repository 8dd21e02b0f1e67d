use serde_json::Value;

use super::error::FilterError;
use super::types::Predicate;

/// Compiles a predicate list into a parameterized WHERE clause.
pub struct FilterWhere {
    param_values: Vec<Value>,
    param_index: usize,
}

impl FilterWhere {
    pub fn new(starting_param_index: usize) -> Self {
        Self {
            param_values: vec![],
            param_index: starting_param_index,
        }
    }

    /// Returns the clause without the `WHERE` keyword; empty when there is nothing to filter on.
    pub fn generate(predicates: &[Predicate], starting_param_index: usize) -> Result<(String, Vec<Value>), FilterError> {
        let mut filter_where = Self::new(starting_param_index);
        filter_where.build(predicates)
    }

    fn build(&mut self, predicates: &[Predicate]) -> Result<(String, Vec<Value>), FilterError> {
        let mut sql_conditions = vec![];
        for predicate in predicates {
            validate_column(predicate.column())?;
            if let Some(sql) = self.build_sql_condition(predicate)? {
                sql_conditions.push(sql);
            }
        }
        Ok((sql_conditions.join(" AND "), std::mem::take(&mut self.param_values)))
    }

    fn build_sql_condition(&mut self, predicate: &Predicate) -> Result<Option<String>, FilterError> {
        let quoted_column = format!("\"{}\"", predicate.column());
        match predicate {
            Predicate::Equals { value, .. } => {
                if value.is_null() { Ok(Some(format!("{} IS NULL", quoted_column))) }
                else { Ok(Some(format!("{} = {}", quoted_column, self.param(value.clone())))) }
            }
            Predicate::In { values, .. } => {
                if values.is_empty() { return Ok(Some("1=0".to_string())); }
                if values.iter().any(|v| v.is_array() || v.is_object()) {
                    return Err(FilterError::InvalidOperatorData(format!("IN on {} requires scalar values", quoted_column)));
                }
                let params: Vec<String> = values.iter().map(|v| self.param(v.clone())).collect();
                Ok(Some(format!("{} IN ({})", quoted_column, params.join(", "))))
            }
            Predicate::Range { min, max, .. } => {
                let mut parts = vec![];
                if let Some(min) = min { parts.push(format!("{} >= {}", quoted_column, self.param(min.clone()))); }
                if let Some(max) = max { parts.push(format!("{} <= {}", quoted_column, self.param(max.clone()))); }
                if parts.is_empty() { Ok(None) } else { Ok(Some(parts.join(" AND "))) }
            }
            Predicate::ILike { pattern, .. } => {
                Ok(Some(format!("{} ILIKE {}", quoted_column, self.param(Value::String(pattern.clone())))))
            }
        }
    }

    fn param(&mut self, value: Value) -> String {
        self.param_values.push(value);
        self.param_index += 1;
        format!("${}", self.param_index)
    }
}

pub(crate) fn validate_column(column: &str) -> Result<(), FilterError> {
    if !is_identifier(column) {
        return Err(FilterError::InvalidColumn(format!("Invalid column name format: {}", column)));
    }
    Ok(())
}

pub(crate) fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_alphabetic() || first == '_' => chars.all(|c| c.is_alphanumeric() || c == '_'),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_in_list_matches_nothing() {
        let (sql, params) = FilterWhere::generate(&[Predicate::in_list("class_id", Vec::<Value>::new())], 0).unwrap();
        assert_eq!(sql, "1=0");
        assert!(params.is_empty());
    }

    #[test]
    fn null_equality_becomes_is_null() {
        let (sql, params) = FilterWhere::generate(&[Predicate::eq("class_id", Value::Null)], 0).unwrap();
        assert_eq!(sql, "\"class_id\" IS NULL");
        assert!(params.is_empty());
    }

    #[test]
    fn open_range_is_skipped_and_params_continue() {
        let predicates = vec![
            Predicate::range("started_at", None, None),
            Predicate::eq("status", "completed"),
            Predicate::range("started_at", Some(json!("2024-01-01")), Some(json!("2024-12-31"))),
        ];
        let (sql, params) = FilterWhere::generate(&predicates, 0).unwrap();
        assert_eq!(sql, "\"status\" = $1 AND \"started_at\" >= $2 AND \"started_at\" <= $3");
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn rejects_injected_column_names() {
        let err = FilterWhere::generate(&[Predicate::eq("id\"; DROP TABLE x; --", 1)], 0).unwrap_err();
        assert!(matches!(err, FilterError::InvalidColumn(_)));
    }
}
