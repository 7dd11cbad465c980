//! In-process backend: predicates are an AST evaluated directly against
//! stored records. Used as the executable reference in integration tests
//! and for small in-memory datasets.

use std::cmp::Ordering;

use polystore_core::{BackendAdapter, Context, Error, FieldDef, PredicateBuilder};
use polystore_types::{OrderDirection, Record, Value};

/// Predicate AST over record columns.
#[derive(Debug, Clone, PartialEq)]
pub enum Pred {
    All,
    Eq(String, Value),
    Ne(String, Value),
    Gt(String, Value),
    Gte(String, Value),
    Lt(String, Value),
    Lte(String, Value),
    Like(String, String),
    NotLike(String, String),
    In(String, Vec<Value>),
    NotIn(String, Vec<Value>),
    Between(String, Option<Value>, Option<Value>),
    IsNull(String),
    NotNull(String),
    And(Vec<Pred>),
    Or(Vec<Pred>),
    Not(Box<Pred>),
}

#[derive(Debug, Default)]
pub struct MemoryPredicateBuilder;

impl PredicateBuilder for MemoryPredicateBuilder {
    type Predicate = Pred;

    fn match_all(&self) -> Pred {
        Pred::All
    }

    fn eq(&self, field: &FieldDef, value: Value) -> Pred {
        Pred::Eq(field.column.clone(), value)
    }

    fn ne(&self, field: &FieldDef, value: Value) -> Pred {
        Pred::Ne(field.column.clone(), value)
    }

    fn gt(&self, field: &FieldDef, value: Value) -> Pred {
        Pred::Gt(field.column.clone(), value)
    }

    fn gte(&self, field: &FieldDef, value: Value) -> Pred {
        Pred::Gte(field.column.clone(), value)
    }

    fn lt(&self, field: &FieldDef, value: Value) -> Pred {
        Pred::Lt(field.column.clone(), value)
    }

    fn lte(&self, field: &FieldDef, value: Value) -> Pred {
        Pred::Lte(field.column.clone(), value)
    }

    fn like(&self, field: &FieldDef, pattern: String) -> Pred {
        Pred::Like(field.column.clone(), pattern)
    }

    fn not_like(&self, field: &FieldDef, pattern: String) -> Pred {
        Pred::NotLike(field.column.clone(), pattern)
    }

    fn is_in(&self, field: &FieldDef, values: Vec<Value>) -> Pred {
        Pred::In(field.column.clone(), values)
    }

    fn not_in(&self, field: &FieldDef, values: Vec<Value>) -> Pred {
        Pred::NotIn(field.column.clone(), values)
    }

    fn between(&self, field: &FieldDef, lo: Option<Value>, hi: Option<Value>) -> Pred {
        Pred::Between(field.column.clone(), lo, hi)
    }

    fn is_null(&self, field: &FieldDef) -> Pred {
        Pred::IsNull(field.column.clone())
    }

    fn not_null(&self, field: &FieldDef) -> Pred {
        Pred::NotNull(field.column.clone())
    }

    fn and(&self, preds: Vec<Pred>) -> Pred {
        Pred::And(preds)
    }

    fn or(&self, preds: Vec<Pred>) -> Pred {
        Pred::Or(preds)
    }

    fn not(&self, pred: Pred) -> Pred {
        Pred::Not(Box::new(pred))
    }
}

/// Equality across compatible widths: Int32/Int64 and Float32/Float64
/// compare by value, not representation.
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Bytes(a), Value::Bytes(b)) => a == b,
        (Value::Timestamp(a), Value::Timestamp(b)) => a == b,
        (Value::Uuid(a), Value::Uuid(b)) => a == b,
        _ => matches!(compare_values(a, b), Some(Ordering::Equal)),
    }
}

/// Order two values when their types are comparable.
fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Int32(a), Value::Int32(b)) => Some(a.cmp(b)),
        (Value::Int64(a), Value::Int64(b)) => Some(a.cmp(b)),
        (Value::Int32(a), Value::Int64(b)) => Some(i64::from(*a).cmp(b)),
        (Value::Int64(a), Value::Int32(b)) => Some(a.cmp(&i64::from(*b))),
        (Value::Float32(a), Value::Float32(b)) => a.partial_cmp(b),
        (Value::Float64(a), Value::Float64(b)) => a.partial_cmp(b),
        (Value::Float32(a), Value::Float64(b)) => f64::from(*a).partial_cmp(b),
        (Value::Float64(a), Value::Float32(b)) => a.partial_cmp(&f64::from(*b)),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bytes(a), Value::Bytes(b)) => Some(a.cmp(b)),
        (Value::Timestamp(a), Value::Timestamp(b)) => Some(a.cmp(b)),
        (Value::Uuid(a), Value::Uuid(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

/// Match a string against a SQL LIKE pattern: `%` matches any run of
/// characters, `_` matches exactly one.
fn like_match(value: &str, pattern: &str) -> bool {
    fn matches(mut value: std::str::Chars<'_>, mut pattern: std::str::Chars<'_>) -> bool {
        loop {
            match pattern.next() {
                None => return value.next().is_none(),
                // `%` tries consuming zero or more value characters,
                // backtracking via cloned iterators.
                Some('%') => loop {
                    if matches(value.clone(), pattern.clone()) {
                        return true;
                    }
                    if value.next().is_none() {
                        return false;
                    }
                },
                Some('_') => {
                    if value.next().is_none() {
                        return false;
                    }
                }
                Some(expected) => match value.next() {
                    Some(actual) if actual == expected => {}
                    _ => return false,
                },
            }
        }
    }
    matches(value.chars(), pattern.chars())
}

fn column(row: &Record, name: &str) -> Value {
    row.get(name).cloned().unwrap_or(Value::Null)
}

fn compare_column(row: &Record, name: &str, value: &Value) -> Option<Ordering> {
    compare_values(&column(row, name), value)
}

/// Evaluate a predicate against one record.
pub fn eval(pred: &Pred, row: &Record) -> bool {
    match pred {
        Pred::All => true,
        Pred::Eq(col, v) => values_equal(&column(row, col), v),
        Pred::Ne(col, v) => !values_equal(&column(row, col), v),
        Pred::Gt(col, v) => matches!(compare_column(row, col, v), Some(Ordering::Greater)),
        Pred::Gte(col, v) => matches!(
            compare_column(row, col, v),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        Pred::Lt(col, v) => matches!(compare_column(row, col, v), Some(Ordering::Less)),
        Pred::Lte(col, v) => matches!(
            compare_column(row, col, v),
            Some(Ordering::Less | Ordering::Equal)
        ),
        Pred::Like(col, pattern) => match column(row, col) {
            Value::String(s) => like_match(&s, pattern),
            _ => false,
        },
        Pred::NotLike(col, pattern) => match column(row, col) {
            Value::String(s) => !like_match(&s, pattern),
            _ => false,
        },
        Pred::In(col, values) => {
            let v = column(row, col);
            values.iter().any(|candidate| values_equal(&v, candidate))
        }
        Pred::NotIn(col, values) => {
            let v = column(row, col);
            !values.iter().any(|candidate| values_equal(&v, candidate))
        }
        Pred::Between(col, lo, hi) => {
            let lower_ok = lo.as_ref().map_or(true, |lo| {
                matches!(
                    compare_column(row, col, lo),
                    Some(Ordering::Greater | Ordering::Equal)
                )
            });
            let upper_ok = hi.as_ref().map_or(true, |hi| {
                matches!(
                    compare_column(row, col, hi),
                    Some(Ordering::Less | Ordering::Equal)
                )
            });
            lower_ok && upper_ok
        }
        Pred::IsNull(col) => column(row, col).is_null(),
        Pred::NotNull(col) => !column(row, col).is_null(),
        Pred::And(children) => children.iter().all(|c| eval(c, row)),
        Pred::Or(children) => children.iter().any(|c| eval(c, row)),
        Pred::Not(child) => !eval(child, row),
    }
}

/// Total order over column values for sorting: nulls first, incomparable
/// types keep their relative position.
fn sort_cmp(a: &Value, b: &Value) -> Ordering {
    match (a.is_null(), b.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => compare_values(a, b).unwrap_or(Ordering::Equal),
    }
}

/// A memory query under construction.
#[derive(Debug, Default)]
pub struct MemoryQuery {
    predicates: Vec<Pred>,
    orders: Vec<(String, OrderDirection)>,
    limit: Option<i64>,
    offset: Option<i64>,
    projection: Vec<String>,
}

/// Backend over an in-process record list.
pub struct MemoryBackend {
    rows: Vec<Record>,
    builder: MemoryPredicateBuilder,
}

impl MemoryBackend {
    pub fn new(rows: Vec<Record>) -> Self {
        Self {
            rows,
            builder: MemoryPredicateBuilder,
        }
    }

    fn matching(&self, query: &MemoryQuery) -> Vec<Record> {
        self.rows
            .iter()
            .filter(|row| query.predicates.iter().all(|p| eval(p, row)))
            .cloned()
            .collect()
    }
}

impl BackendAdapter for MemoryBackend {
    type Row = Record;
    type Handle = MemoryQuery;
    type Builder = MemoryPredicateBuilder;

    fn predicate_builder(&self) -> &MemoryPredicateBuilder {
        &self.builder
    }

    fn open(&self, ctx: &Context) -> Result<MemoryQuery, Error> {
        ctx.check()?;
        Ok(MemoryQuery::default())
    }

    fn apply_predicate(&self, handle: &mut MemoryQuery, predicate: Pred) {
        handle.predicates.push(predicate);
    }

    fn apply_order(&self, handle: &mut MemoryQuery, field: &FieldDef, direction: OrderDirection) {
        handle.orders.push((field.column.clone(), direction));
    }

    fn limit(&self, handle: &mut MemoryQuery, limit: i64) {
        handle.limit = Some(limit);
    }

    fn offset(&self, handle: &mut MemoryQuery, offset: i64) {
        handle.offset = Some(offset);
    }

    fn project(&self, handle: &mut MemoryQuery, fields: &[&FieldDef]) {
        handle.projection = fields.iter().map(|f| f.column.clone()).collect();
    }

    fn count(&self, ctx: &Context, handle: MemoryQuery) -> Result<u64, Error> {
        ctx.check()?;
        Ok(self.matching(&handle).len() as u64)
    }

    fn fetch(&self, ctx: &Context, handle: MemoryQuery) -> Result<Vec<Record>, Error> {
        ctx.check()?;
        let mut rows = self.matching(&handle);

        if !handle.orders.is_empty() {
            rows.sort_by(|a, b| {
                for (col, direction) in &handle.orders {
                    let ord = sort_cmp(&column(a, col), &column(b, col));
                    let ord = match direction {
                        OrderDirection::Asc => ord,
                        OrderDirection::Desc => ord.reverse(),
                    };
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                Ordering::Equal
            });
        }

        if let Some(offset) = handle.offset {
            let offset = usize::try_from(offset).unwrap_or(0);
            rows = rows.into_iter().skip(offset).collect();
        }
        if let Some(limit) = handle.limit {
            let limit = usize::try_from(limit).unwrap_or(0);
            rows.truncate(limit);
        }

        if !handle.projection.is_empty() {
            rows = rows.iter().map(|row| row.project(&handle.projection)).collect();
        }

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(name: &str, age: i64) -> Record {
        let mut record = Record::new();
        record.push("name", name);
        record.push("age", age);
        record
    }

    #[test]
    fn test_like_match() {
        assert!(like_match("hello", "hello"));
        assert!(like_match("hello", "h%"));
        assert!(like_match("hello", "%llo"));
        assert!(like_match("hello", "h_llo"));
        assert!(like_match("hello", "%"));
        assert!(!like_match("hello", "h_"));
        assert!(!like_match("hello", "world%"));
        assert!(like_match("", "%"));
        assert!(!like_match("", "_"));
    }

    #[test]
    fn test_cross_width_numeric_comparison() {
        assert!(values_equal(&Value::Int32(5), &Value::Int64(5)));
        assert_eq!(
            compare_values(&Value::Int32(3), &Value::Int64(7)),
            Some(Ordering::Less)
        );
        assert_eq!(
            compare_values(&Value::Float32(1.5), &Value::Float64(1.5)),
            Some(Ordering::Equal)
        );
        assert_eq!(compare_values(&Value::Int64(1), &Value::String("1".into())), None);
    }

    #[test]
    fn test_eval_operators() {
        let r = row("Alice", 30);
        assert!(eval(&Pred::Gt("age".into(), Value::Int64(20)), &r));
        assert!(!eval(&Pred::Gt("age".into(), Value::Int64(30)), &r));
        assert!(eval(&Pred::Like("name".into(), "Al%".into()), &r));
        assert!(eval(
            &Pred::Between("age".into(), Some(Value::Int64(20)), None),
            &r
        ));
        assert!(eval(&Pred::IsNull("missing".into()), &r));
        assert!(eval(
            &Pred::Or(vec![
                Pred::Eq("name".into(), Value::String("Bob".into())),
                Pred::Gte("age".into(), Value::Int64(30)),
            ]),
            &r
        ));
    }

    #[test]
    fn test_fetch_sorts_and_limits() {
        let backend = MemoryBackend::new(vec![row("Cara", 41), row("Alice", 30), row("Bob", 25)]);
        let ctx = Context::background();
        let name = FieldDef::new("name", polystore_core::FieldType::String);

        let mut handle = backend.open(&ctx).unwrap();
        backend.apply_order(&mut handle, &name, OrderDirection::Asc);
        backend.limit(&mut handle, 2);

        let rows = backend.fetch(&ctx, handle).unwrap();
        let names: Vec<_> = rows
            .iter()
            .map(|r| r.get("name").cloned().unwrap())
            .collect();
        assert_eq!(
            names,
            vec![Value::String("Alice".into()), Value::String("Bob".into())]
        );
    }

    #[test]
    fn test_count_ignores_limit() {
        let backend = MemoryBackend::new(vec![row("a", 1), row("b", 2), row("c", 3)]);
        let ctx = Context::background();

        let mut handle = backend.open(&ctx).unwrap();
        backend.limit(&mut handle, 1);
        backend.apply_predicate(&mut handle, Pred::Gt("age".into(), Value::Int64(1)));
        assert_eq!(backend.count(&ctx, handle).unwrap(), 2);
    }
}
