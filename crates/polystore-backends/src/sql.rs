//! SQL adapter: predicates are parameterized WHERE fragments, handles are
//! SELECT statements under construction.

use polystore_core::{BackendAdapter, Context, Error, FieldDef, PredicateBuilder};
use polystore_types::{OrderDirection, Record, Value};

use crate::TenantNamer;

/// A WHERE fragment plus its bind values, in placeholder order.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlPredicate {
    pub sql: String,
    pub binds: Vec<Value>,
}

impl SqlPredicate {
    fn new(sql: impl Into<String>, binds: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            binds,
        }
    }
}

/// Emits `?`-placeholder fragments.
#[derive(Debug, Default)]
pub struct SqlPredicateBuilder;

impl SqlPredicateBuilder {
    fn comparison(&self, field: &FieldDef, op: &str, value: Value) -> SqlPredicate {
        SqlPredicate::new(format!("{} {op} ?", field.column), vec![value])
    }

    fn value_list(&self, field: &FieldDef, keyword: &str, values: Vec<Value>) -> SqlPredicate {
        if values.is_empty() {
            // An empty IN matches nothing; an empty NOT IN excludes nothing.
            let sql = if keyword == "IN" { "1 = 0" } else { "1 = 1" };
            return SqlPredicate::new(sql, Vec::new());
        }
        let placeholders = vec!["?"; values.len()].join(", ");
        SqlPredicate::new(
            format!("{} {keyword} ({placeholders})", field.column),
            values,
        )
    }

    fn combine(&self, joiner: &str, preds: Vec<SqlPredicate>) -> SqlPredicate {
        let mut preds = preds;
        match preds.len() {
            0 => self.match_all(),
            1 => preds.swap_remove(0),
            _ => {
                let mut binds = Vec::new();
                let fragments: Vec<String> = preds
                    .into_iter()
                    .map(|p| {
                        binds.extend(p.binds);
                        p.sql
                    })
                    .collect();
                SqlPredicate::new(format!("({})", fragments.join(joiner)), binds)
            }
        }
    }
}

impl PredicateBuilder for SqlPredicateBuilder {
    type Predicate = SqlPredicate;

    fn match_all(&self) -> SqlPredicate {
        SqlPredicate::new("1 = 1", Vec::new())
    }

    fn eq(&self, field: &FieldDef, value: Value) -> SqlPredicate {
        self.comparison(field, "=", value)
    }

    fn ne(&self, field: &FieldDef, value: Value) -> SqlPredicate {
        self.comparison(field, "<>", value)
    }

    fn gt(&self, field: &FieldDef, value: Value) -> SqlPredicate {
        self.comparison(field, ">", value)
    }

    fn gte(&self, field: &FieldDef, value: Value) -> SqlPredicate {
        self.comparison(field, ">=", value)
    }

    fn lt(&self, field: &FieldDef, value: Value) -> SqlPredicate {
        self.comparison(field, "<", value)
    }

    fn lte(&self, field: &FieldDef, value: Value) -> SqlPredicate {
        self.comparison(field, "<=", value)
    }

    fn like(&self, field: &FieldDef, pattern: String) -> SqlPredicate {
        SqlPredicate::new(
            format!("{} LIKE ?", field.column),
            vec![Value::String(pattern)],
        )
    }

    fn not_like(&self, field: &FieldDef, pattern: String) -> SqlPredicate {
        SqlPredicate::new(
            format!("{} NOT LIKE ?", field.column),
            vec![Value::String(pattern)],
        )
    }

    fn is_in(&self, field: &FieldDef, values: Vec<Value>) -> SqlPredicate {
        self.value_list(field, "IN", values)
    }

    fn not_in(&self, field: &FieldDef, values: Vec<Value>) -> SqlPredicate {
        self.value_list(field, "NOT IN", values)
    }

    fn between(&self, field: &FieldDef, lo: Option<Value>, hi: Option<Value>) -> SqlPredicate {
        match (lo, hi) {
            (Some(lo), Some(hi)) => SqlPredicate::new(
                format!("{} BETWEEN ? AND ?", field.column),
                vec![lo, hi],
            ),
            (Some(lo), None) => self.gte(field, lo),
            (None, Some(hi)) => self.lte(field, hi),
            (None, None) => self.match_all(),
        }
    }

    fn is_null(&self, field: &FieldDef) -> SqlPredicate {
        SqlPredicate::new(format!("{} IS NULL", field.column), Vec::new())
    }

    fn not_null(&self, field: &FieldDef) -> SqlPredicate {
        SqlPredicate::new(format!("{} IS NOT NULL", field.column), Vec::new())
    }

    fn and(&self, preds: Vec<SqlPredicate>) -> SqlPredicate {
        self.combine(" AND ", preds)
    }

    fn or(&self, preds: Vec<SqlPredicate>) -> SqlPredicate {
        self.combine(" OR ", preds)
    }

    fn not(&self, pred: SqlPredicate) -> SqlPredicate {
        SqlPredicate::new(format!("NOT ({})", pred.sql), pred.binds)
    }
}

/// A SELECT under construction.
#[derive(Debug)]
pub struct SqlSelect {
    table: String,
    conjuncts: Vec<SqlPredicate>,
    order_by: Vec<String>,
    limit: Option<i64>,
    offset: Option<i64>,
    columns: Vec<String>,
}

impl SqlSelect {
    fn new(table: String) -> Self {
        Self {
            table,
            conjuncts: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            offset: None,
            columns: Vec::new(),
        }
    }

    fn where_clause(&self) -> (String, Vec<Value>) {
        if self.conjuncts.is_empty() {
            return (String::new(), Vec::new());
        }
        let mut binds = Vec::new();
        let fragments: Vec<&str> = self
            .conjuncts
            .iter()
            .map(|p| {
                binds.extend(p.binds.iter().cloned());
                p.sql.as_str()
            })
            .collect();
        (format!(" WHERE {}", fragments.join(" AND ")), binds)
    }

    /// Render the row-fetching statement and its binds.
    pub fn to_select(&self) -> (String, Vec<Value>) {
        let columns = if self.columns.is_empty() {
            "*".to_string()
        } else {
            self.columns.join(", ")
        };
        let (where_clause, binds) = self.where_clause();

        let mut sql = format!("SELECT {columns} FROM {}{where_clause}", self.table);
        if !self.order_by.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&self.order_by.join(", "));
        }
        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        if let Some(offset) = self.offset {
            sql.push_str(&format!(" OFFSET {offset}"));
        }
        (sql, binds)
    }

    /// Render the counting statement; limit, offset, ordering, and
    /// projection do not apply to counts.
    pub fn to_count(&self) -> (String, Vec<Value>) {
        let (where_clause, binds) = self.where_clause();
        (
            format!("SELECT COUNT(*) FROM {}{where_clause}", self.table),
            binds,
        )
    }
}

/// Executes rendered statements against the application's pool or client.
pub trait SqlExecutor {
    /// Run a SELECT and return rows as records keyed by column name.
    fn query(&self, ctx: &Context, sql: &str, binds: &[Value]) -> Result<Vec<Record>, Error>;

    /// Run a COUNT and return the single scalar.
    fn count(&self, ctx: &Context, sql: &str, binds: &[Value]) -> Result<u64, Error>;
}

/// SQL backend adapter over an injected executor.
pub struct SqlAdapter<E> {
    table: String,
    executor: E,
    builder: SqlPredicateBuilder,
    namer: Option<TenantNamer>,
}

impl<E: SqlExecutor> SqlAdapter<E> {
    pub fn new(table: impl Into<String>, executor: E) -> Self {
        Self {
            table: table.into(),
            executor,
            builder: SqlPredicateBuilder,
            namer: None,
        }
    }

    /// Scope table names per tenant through the supplied naming function.
    pub fn with_namer(mut self, namer: TenantNamer) -> Self {
        self.namer = Some(namer);
        self
    }

    fn table_for(&self, ctx: &Context) -> String {
        match &self.namer {
            Some(namer) => namer(ctx, &self.table),
            None => self.table.clone(),
        }
    }
}

impl<E: SqlExecutor> BackendAdapter for SqlAdapter<E> {
    type Row = Record;
    type Handle = SqlSelect;
    type Builder = SqlPredicateBuilder;

    fn predicate_builder(&self) -> &SqlPredicateBuilder {
        &self.builder
    }

    fn open(&self, ctx: &Context) -> Result<SqlSelect, Error> {
        ctx.check()?;
        Ok(SqlSelect::new(self.table_for(ctx)))
    }

    fn apply_predicate(&self, handle: &mut SqlSelect, predicate: SqlPredicate) {
        handle.conjuncts.push(predicate);
    }

    fn apply_order(&self, handle: &mut SqlSelect, field: &FieldDef, direction: OrderDirection) {
        let keyword = match direction {
            OrderDirection::Asc => "ASC",
            OrderDirection::Desc => "DESC",
        };
        handle.order_by.push(format!("{} {keyword}", field.column));
    }

    fn limit(&self, handle: &mut SqlSelect, limit: i64) {
        handle.limit = Some(limit);
    }

    fn offset(&self, handle: &mut SqlSelect, offset: i64) {
        handle.offset = Some(offset);
    }

    fn project(&self, handle: &mut SqlSelect, fields: &[&FieldDef]) {
        handle.columns = fields.iter().map(|f| f.column.clone()).collect();
    }

    fn count(&self, ctx: &Context, handle: SqlSelect) -> Result<u64, Error> {
        ctx.check()?;
        let (sql, binds) = handle.to_count();
        self.executor.count(ctx, &sql, &binds)
    }

    fn fetch(&self, ctx: &Context, handle: SqlSelect) -> Result<Vec<Record>, Error> {
        ctx.check()?;
        let (sql, binds) = handle.to_select();
        tracing::debug!(%sql, binds = binds.len(), "executing select");
        self.executor.query(ctx, &sql, &binds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polystore_core::FieldType;

    fn field(name: &str) -> FieldDef {
        FieldDef::new(name, FieldType::String)
    }

    struct NoopExecutor;

    impl SqlExecutor for NoopExecutor {
        fn query(&self, _: &Context, _: &str, _: &[Value]) -> Result<Vec<Record>, Error> {
            Ok(Vec::new())
        }

        fn count(&self, _: &Context, _: &str, _: &[Value]) -> Result<u64, Error> {
            Ok(0)
        }
    }

    #[test]
    fn test_comparison_fragments() {
        let b = SqlPredicateBuilder;
        let p = b.gt(&field("age"), Value::Int64(20));
        assert_eq!(p.sql, "age > ?");
        assert_eq!(p.binds, vec![Value::Int64(20)]);
    }

    #[test]
    fn test_in_list_placeholders() {
        let b = SqlPredicateBuilder;
        let p = b.is_in(
            &field("id"),
            vec![Value::Int64(1), Value::Int64(2), Value::Int64(3)],
        );
        assert_eq!(p.sql, "id IN (?, ?, ?)");
        assert_eq!(p.binds.len(), 3);

        assert_eq!(b.is_in(&field("id"), Vec::new()).sql, "1 = 0");
        assert_eq!(b.not_in(&field("id"), Vec::new()).sql, "1 = 1");
    }

    #[test]
    fn test_one_sided_between_renders_as_bound() {
        let b = SqlPredicateBuilder;
        let p = b.between(&field("age"), Some(Value::Int64(18)), None);
        assert_eq!(p.sql, "age >= ?");

        let p = b.between(&field("age"), None, Some(Value::Int64(65)));
        assert_eq!(p.sql, "age <= ?");

        let p = b.between(&field("age"), Some(Value::Int64(18)), Some(Value::Int64(65)));
        assert_eq!(p.sql, "age BETWEEN ? AND ?");
        assert_eq!(p.binds.len(), 2);
    }

    #[test]
    fn test_combined_fragments_keep_bind_order() {
        let b = SqlPredicateBuilder;
        let p = b.or(vec![
            b.eq(&field("name"), Value::String("a".into())),
            b.and(vec![
                b.gte(&field("age"), Value::Int64(18)),
                b.lt(&field("age"), Value::Int64(65)),
            ]),
        ]);
        assert_eq!(p.sql, "(name = ? OR (age >= ? AND age < ?))");
        assert_eq!(
            p.binds,
            vec![
                Value::String("a".into()),
                Value::Int64(18),
                Value::Int64(65)
            ]
        );
    }

    #[test]
    fn test_select_rendering() {
        let adapter = SqlAdapter::new("users", NoopExecutor);
        let ctx = Context::background();
        let b = adapter.predicate_builder();

        let mut handle = adapter.open(&ctx).unwrap();
        adapter.apply_predicate(&mut handle, b.gt(&field("age"), Value::Int64(20)));
        adapter.apply_order(&mut handle, &field("name"), OrderDirection::Asc);
        adapter.apply_order(&mut handle, &field("id"), OrderDirection::Desc);
        adapter.limit(&mut handle, 3);
        adapter.offset(&mut handle, 6);
        let name = field("name");
        let id = field("id");
        adapter.project(&mut handle, &[&name, &id]);

        let (sql, binds) = handle.to_select();
        assert_eq!(
            sql,
            "SELECT name, id FROM users WHERE age > ? ORDER BY name ASC, id DESC LIMIT 3 OFFSET 6"
        );
        assert_eq!(binds, vec![Value::Int64(20)]);

        let (sql, binds) = handle.to_count();
        assert_eq!(sql, "SELECT COUNT(*) FROM users WHERE age > ?");
        assert_eq!(binds.len(), 1);
    }

    #[test]
    fn test_tenant_namer_scopes_table() {
        let adapter = SqlAdapter::new("users", NoopExecutor).with_namer(Box::new(|ctx, base| {
            match ctx.tenant() {
                Some(tenant) => format!("{tenant}_{base}"),
                None => base.to_string(),
            }
        }));

        let ctx = Context::background().with_tenant("acme");
        let handle = adapter.open(&ctx).unwrap();
        let (sql, _) = handle.to_select();
        assert_eq!(sql, "SELECT * FROM acme_users");
    }
}
