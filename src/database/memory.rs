use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use tokio::sync::{Mutex, RwLock};

use crate::database::manager::DatabaseError;
use crate::database::store::RowStore;
use crate::filter::{Filter, FilterOrderInfo, Predicate, SortDirection};

/// In-process `RowStore` that evaluates filters over JSON rows.
///
/// Tables can be marked as failing to simulate an outage, and every call is
/// counted per table so callers can assert which tables were touched.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<String, Vec<Value>>>,
    failing: RwLock<HashSet<String>>,
    calls: Mutex<HashMap<String, usize>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert<T: Serialize>(&self, table: &str, row: &T) -> Result<(), DatabaseError> {
        let value = serde_json::to_value(row).map_err(|source| DatabaseError::Decode {
            table: table.to_string(),
            source,
        })?;
        if !value.is_object() {
            return Err(DatabaseError::QueryError(format!("Rows for {} must be JSON objects", table)));
        }
        self.tables.write().await.entry(table.to_string()).or_default().push(value);
        Ok(())
    }

    pub async fn insert_all<T: Serialize>(&self, table: &str, rows: &[T]) -> Result<(), DatabaseError> {
        for row in rows {
            self.insert(table, row).await?;
        }
        Ok(())
    }

    /// Every subsequent call touching `table` fails until `heal_table` is called
    pub async fn fail_table(&self, table: &str) {
        self.failing.write().await.insert(table.to_string());
    }

    pub async fn heal_table(&self, table: &str) {
        self.failing.write().await.remove(table);
    }

    pub async fn calls(&self, table: &str) -> usize {
        self.calls.lock().await.get(table).copied().unwrap_or(0)
    }

    async fn matching_rows(&self, filter: &Filter) -> Result<Vec<Value>, DatabaseError> {
        // Same validation the SQL path applies
        filter.to_sql()?;

        let table = filter.table_name();
        *self.calls.lock().await.entry(table.to_string()).or_default() += 1;
        if self.failing.read().await.contains(table) {
            return Err(DatabaseError::Unavailable(format!("table {} is unavailable", table)));
        }

        let tables = self.tables.read().await;
        let rows = tables
            .get(table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| filter.predicates().iter().all(|p| matches(p, row)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(rows)
    }
}

#[async_trait]
impl RowStore for MemoryStore {
    async fn select(&self, filter: &Filter) -> Result<Vec<Value>, DatabaseError> {
        let mut rows = self.matching_rows(filter).await?;
        sort_rows(&mut rows, filter.order_info());

        let offset = filter.offset_value().unwrap_or(0).max(0) as usize;
        let limit = filter.limit_value().map(|l| l.max(0) as usize).unwrap_or(usize::MAX);

        Ok(rows
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|row| project(row, filter.select_columns()))
            .collect())
    }

    async fn count(&self, filter: &Filter) -> Result<i64, DatabaseError> {
        Ok(self.matching_rows(filter).await?.len() as i64)
    }
}

fn matches(predicate: &Predicate, row: &Value) -> bool {
    let field = row.get(predicate.column()).unwrap_or(&Value::Null);
    match predicate {
        Predicate::Equals { value, .. } => {
            if value.is_null() { field.is_null() } else { values_equal(field, value) }
        }
        Predicate::In { values, .. } => values.iter().any(|v| values_equal(field, v)),
        Predicate::Range { min, max, .. } => {
            if field.is_null() {
                return false;
            }
            let above = min.as_ref().map_or(true, |m| {
                matches!(compare_values(field, m), Some(Ordering::Greater | Ordering::Equal))
            });
            let below = max.as_ref().map_or(true, |m| {
                matches!(compare_values(field, m), Some(Ordering::Less | Ordering::Equal))
            });
            above && below
        }
        Predicate::ILike { pattern, .. } => match field {
            Value::String(s) => like_match(&s.to_lowercase(), &pattern.to_lowercase()),
            Value::Number(n) => like_match(&n.to_string(), &pattern.to_lowercase()),
            _ => false,
        },
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        (Value::String(x), Value::String(y)) => {
            x == y || (parse_timestamp(x).is_some() && parse_timestamp(x) == parse_timestamp(y))
        }
        _ => a == b,
    }
}

fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => match (parse_timestamp(x), parse_timestamp(y)) {
            (Some(tx), Some(ty)) => Some(tx.cmp(&ty)),
            _ => Some(x.cmp(y)),
        },
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s).ok().map(|t| t.with_timezone(&Utc))
}

/// SQL LIKE matching with `%`, `_` and backslash escapes
fn like_match(text: &str, pattern: &str) -> bool {
    enum Token {
        Literal(char),
        AnyOne,
        AnyMany,
    }

    let mut tokens = Vec::new();
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => tokens.push(Token::Literal(chars.next().unwrap_or('\\'))),
            '%' => tokens.push(Token::AnyMany),
            '_' => tokens.push(Token::AnyOne),
            other => tokens.push(Token::Literal(other)),
        }
    }

    let text: Vec<char> = text.chars().collect();
    // reachable[j]: the first i tokens can consume text[..j]
    let mut reachable = vec![false; text.len() + 1];
    reachable[0] = true;
    for token in &tokens {
        let mut next = vec![false; text.len() + 1];
        for j in 0..=text.len() {
            match token {
                Token::AnyMany => next[j] = reachable[j] || (j > 0 && next[j - 1]),
                Token::AnyOne => next[j] = j > 0 && reachable[j - 1],
                Token::Literal(c) => next[j] = j > 0 && reachable[j - 1] && text[j - 1] == *c,
            }
        }
        reachable = next;
    }
    reachable[text.len()]
}

fn sort_rows(rows: &mut [Value], order: &[FilterOrderInfo]) {
    if order.is_empty() {
        return;
    }
    rows.sort_by(|a, b| {
        for info in order {
            let x = a.get(&info.column).unwrap_or(&Value::Null);
            let y = b.get(&info.column).unwrap_or(&Value::Null);
            // NULLS LAST in both directions
            let ord = match (x.is_null(), y.is_null()) {
                (true, true) => Ordering::Equal,
                (true, false) => Ordering::Greater,
                (false, true) => Ordering::Less,
                (false, false) => {
                    let ord = compare_values(x, y).unwrap_or(Ordering::Equal);
                    if info.sort == SortDirection::Desc { ord.reverse() } else { ord }
                }
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });
}

fn project(row: Value, columns: &[String]) -> Value {
    if columns.is_empty() || columns.iter().any(|c| c == "*") {
        return row;
    }
    let mut out = Map::new();
    for column in columns {
        out.insert(column.clone(), row.get(column).cloned().unwrap_or(Value::Null));
    }
    Value::Object(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        store
            .insert_all(
                "profiles",
                &[
                    json!({ "id": "a", "name": "Alice Wong", "role": "student", "grade": 3 }),
                    json!({ "id": "b", "name": "Bob", "role": "student", "grade": 1 }),
                    json!({ "id": "c", "name": "Carol", "role": "teacher", "grade": null }),
                ],
            )
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn filters_orders_and_projects() {
        let store = seeded().await;
        let filter = Filter::new("profiles").unwrap()
            .select(["id"]).unwrap()
            .with(Predicate::eq("role", "student"))
            .order("grade asc").unwrap();

        let rows = store.select(&filter).await.unwrap();
        assert_eq!(rows, vec![json!({ "id": "b" }), json!({ "id": "a" })]);
        assert_eq!(store.count(&filter).await.unwrap(), 2);
        assert_eq!(store.calls("profiles").await, 2);
    }

    #[tokio::test]
    async fn ilike_and_range() {
        let store = seeded().await;
        let filter = Filter::new("profiles").unwrap()
            .with(Predicate::contains("name", "WONG"))
            .with(Predicate::range("grade", Some(json!(2)), None));
        let rows = store.select(&filter).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["id"], "a");
    }

    #[tokio::test]
    async fn failing_table_reports_unavailable() {
        let store = seeded().await;
        store.fail_table("profiles").await;
        let filter = Filter::new("profiles").unwrap();
        assert!(matches!(store.count(&filter).await, Err(DatabaseError::Unavailable(_))));
        store.heal_table("profiles").await;
        assert_eq!(store.count(&filter).await.unwrap(), 3);
    }

    #[test]
    fn like_semantics() {
        assert!(like_match("alice wong", "%wong"));
        assert!(like_match("bob", "b_b"));
        assert!(!like_match("bob", "b_"));
        assert!(like_match("50% off", "50\\% %"));
        assert!(!like_match("500 off", "50\\%%"));
    }

    #[test]
    fn timestamps_compare_chronologically() {
        let a = json!("2024-03-01T10:00:00+02:00");
        let b = json!("2024-03-01T09:00:00Z");
        assert_eq!(compare_values(&a, &b), Some(Ordering::Less));
    }
}
