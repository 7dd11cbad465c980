//! Document-store adapter: predicates are operator documents, handles are
//! find requests.

use serde_json::{json, Map, Value as Json};

use polystore_core::{BackendAdapter, Context, Error, FieldDef, PredicateBuilder};
use polystore_types::{OrderDirection, Record, Value};

use crate::TenantNamer;

/// Translate a SQL LIKE pattern to an anchored regular expression.
fn like_regex(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + 2);
    out.push('^');
    for ch in pattern.chars() {
        match ch {
            '%' => out.push_str(".*"),
            '_' => out.push('.'),
            '.' | '*' | '+' | '?' | '(' | ')' | '[' | ']' | '{' | '}' | '^' | '$' | '|'
            | '\\' => {
                out.push('\\');
                out.push(ch);
            }
            other => out.push(other),
        }
    }
    out.push('$');
    out
}

/// Emits operator documents keyed by property name.
#[derive(Debug, Default)]
pub struct DocumentPredicateBuilder;

impl DocumentPredicateBuilder {
    fn operator(&self, field: &FieldDef, op: &str, value: Json) -> Json {
        json!({ field.column.clone(): { op: value } })
    }
}

impl PredicateBuilder for DocumentPredicateBuilder {
    type Predicate = Json;

    fn match_all(&self) -> Json {
        Json::Object(Map::new())
    }

    fn eq(&self, field: &FieldDef, value: Value) -> Json {
        self.operator(field, "$eq", value.to_json())
    }

    fn ne(&self, field: &FieldDef, value: Value) -> Json {
        self.operator(field, "$ne", value.to_json())
    }

    fn gt(&self, field: &FieldDef, value: Value) -> Json {
        self.operator(field, "$gt", value.to_json())
    }

    fn gte(&self, field: &FieldDef, value: Value) -> Json {
        self.operator(field, "$gte", value.to_json())
    }

    fn lt(&self, field: &FieldDef, value: Value) -> Json {
        self.operator(field, "$lt", value.to_json())
    }

    fn lte(&self, field: &FieldDef, value: Value) -> Json {
        self.operator(field, "$lte", value.to_json())
    }

    fn like(&self, field: &FieldDef, pattern: String) -> Json {
        self.operator(field, "$regex", json!(like_regex(&pattern)))
    }

    fn not_like(&self, field: &FieldDef, pattern: String) -> Json {
        json!({ field.column.clone(): { "$not": { "$regex": like_regex(&pattern) } } })
    }

    fn is_in(&self, field: &FieldDef, values: Vec<Value>) -> Json {
        let values: Vec<Json> = values.iter().map(Value::to_json).collect();
        self.operator(field, "$in", Json::Array(values))
    }

    fn not_in(&self, field: &FieldDef, values: Vec<Value>) -> Json {
        let values: Vec<Json> = values.iter().map(Value::to_json).collect();
        self.operator(field, "$nin", Json::Array(values))
    }

    fn between(&self, field: &FieldDef, lo: Option<Value>, hi: Option<Value>) -> Json {
        let mut bounds = Map::new();
        if let Some(lo) = lo {
            bounds.insert("$gte".into(), lo.to_json());
        }
        if let Some(hi) = hi {
            bounds.insert("$lte".into(), hi.to_json());
        }
        if bounds.is_empty() {
            return self.match_all();
        }
        json!({ field.column.clone(): bounds })
    }

    fn is_null(&self, field: &FieldDef) -> Json {
        self.operator(field, "$exists", json!(false))
    }

    fn not_null(&self, field: &FieldDef) -> Json {
        self.operator(field, "$exists", json!(true))
    }

    fn and(&self, preds: Vec<Json>) -> Json {
        json!({ "$and": preds })
    }

    fn or(&self, preds: Vec<Json>) -> Json {
        json!({ "$or": preds })
    }

    fn not(&self, pred: Json) -> Json {
        // The store has no general top-level negation; NOR over a single
        // branch is its equivalent.
        json!({ "$nor": [pred] })
    }
}

/// A find request under construction.
#[derive(Debug)]
pub struct FindRequest {
    collection: String,
    conjuncts: Vec<Json>,
    sort: Map<String, Json>,
    limit: Option<i64>,
    skip: Option<i64>,
    projection: Map<String, Json>,
}

impl FindRequest {
    fn new(collection: String) -> Self {
        Self {
            collection,
            conjuncts: Vec::new(),
            sort: Map::new(),
            limit: None,
            skip: None,
            projection: Map::new(),
        }
    }

    /// Target collection name.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Render the filter document, conjoining applied predicates.
    pub fn to_filter(&self) -> Json {
        let mut conjuncts: Vec<&Json> = self
            .conjuncts
            .iter()
            .filter(|c| c.as_object().map(|o| !o.is_empty()).unwrap_or(true))
            .collect();
        match conjuncts.len() {
            0 => Json::Object(Map::new()),
            1 => conjuncts.swap_remove(0).clone(),
            _ => json!({ "$and": conjuncts }),
        }
    }

    /// The sort document: property name to 1 (ascending) or -1 (descending).
    pub fn sort_doc(&self) -> &Map<String, Json> {
        &self.sort
    }

    pub fn limit(&self) -> Option<i64> {
        self.limit
    }

    pub fn skip(&self) -> Option<i64> {
        self.skip
    }

    /// The projection document; empty means all properties.
    pub fn projection_doc(&self) -> &Map<String, Json> {
        &self.projection
    }
}

/// Executes find requests against the application's document-store client.
pub trait DocumentExecutor {
    /// Run a find and return documents as records.
    fn find(&self, ctx: &Context, request: &FindRequest) -> Result<Vec<Record>, Error>;

    /// Count documents matching a filter.
    fn count(&self, ctx: &Context, collection: &str, filter: &Json) -> Result<u64, Error>;
}

/// Document-store backend adapter over an injected executor.
pub struct DocumentAdapter<E> {
    collection: String,
    executor: E,
    builder: DocumentPredicateBuilder,
    namer: Option<TenantNamer>,
}

impl<E: DocumentExecutor> DocumentAdapter<E> {
    pub fn new(collection: impl Into<String>, executor: E) -> Self {
        Self {
            collection: collection.into(),
            executor,
            builder: DocumentPredicateBuilder,
            namer: None,
        }
    }

    /// Scope collection names per tenant through the supplied naming
    /// function.
    pub fn with_namer(mut self, namer: TenantNamer) -> Self {
        self.namer = Some(namer);
        self
    }

    fn collection_for(&self, ctx: &Context) -> String {
        match &self.namer {
            Some(namer) => namer(ctx, &self.collection),
            None => self.collection.clone(),
        }
    }
}

impl<E: DocumentExecutor> BackendAdapter for DocumentAdapter<E> {
    type Row = Record;
    type Handle = FindRequest;
    type Builder = DocumentPredicateBuilder;

    fn predicate_builder(&self) -> &DocumentPredicateBuilder {
        &self.builder
    }

    fn open(&self, ctx: &Context) -> Result<FindRequest, Error> {
        ctx.check()?;
        Ok(FindRequest::new(self.collection_for(ctx)))
    }

    fn apply_predicate(&self, handle: &mut FindRequest, predicate: Json) {
        handle.conjuncts.push(predicate);
    }

    fn apply_order(&self, handle: &mut FindRequest, field: &FieldDef, direction: OrderDirection) {
        let sign = match direction {
            OrderDirection::Asc => 1,
            OrderDirection::Desc => -1,
        };
        handle.sort.insert(field.column.clone(), json!(sign));
    }

    fn limit(&self, handle: &mut FindRequest, limit: i64) {
        handle.limit = Some(limit);
    }

    fn offset(&self, handle: &mut FindRequest, offset: i64) {
        handle.skip = Some(offset);
    }

    fn project(&self, handle: &mut FindRequest, fields: &[&FieldDef]) {
        for field in fields {
            handle.projection.insert(field.column.clone(), json!(1));
        }
    }

    fn count(&self, ctx: &Context, handle: FindRequest) -> Result<u64, Error> {
        ctx.check()?;
        let filter = handle.to_filter();
        self.executor.count(ctx, &handle.collection, &filter)
    }

    fn fetch(&self, ctx: &Context, handle: FindRequest) -> Result<Vec<Record>, Error> {
        ctx.check()?;
        tracing::debug!(collection = %handle.collection, "executing find");
        self.executor.find(ctx, &handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polystore_core::FieldType;

    fn field(name: &str) -> FieldDef {
        FieldDef::new(name, FieldType::String)
    }

    #[test]
    fn test_operator_documents() {
        let b = DocumentPredicateBuilder;
        assert_eq!(
            b.gt(&field("age"), Value::Int64(20)),
            json!({ "age": { "$gt": 20 } })
        );
        assert_eq!(
            b.is_in(&field("id"), vec![Value::Int64(1), Value::Int64(2)]),
            json!({ "id": { "$in": [1, 2] } })
        );
        assert_eq!(b.is_null(&field("name")), json!({ "name": { "$exists": false } }));
    }

    #[test]
    fn test_like_becomes_anchored_regex() {
        let b = DocumentPredicateBuilder;
        assert_eq!(
            b.like(&field("name"), "Al%_c.e".into()),
            json!({ "name": { "$regex": "^Al.*.c\\.e$" } })
        );
        assert_eq!(
            b.not_like(&field("name"), "x%".into()),
            json!({ "name": { "$not": { "$regex": "^x.*$" } } })
        );
    }

    #[test]
    fn test_between_renders_bound_document() {
        let b = DocumentPredicateBuilder;
        assert_eq!(
            b.between(&field("age"), Some(Value::Int64(18)), Some(Value::Int64(65))),
            json!({ "age": { "$gte": 18, "$lte": 65 } })
        );
        assert_eq!(
            b.between(&field("age"), None, Some(Value::Int64(65))),
            json!({ "age": { "$lte": 65 } })
        );
    }

    #[test]
    fn test_combinators() {
        let b = DocumentPredicateBuilder;
        let p = b.or(vec![
            b.eq(&field("a"), Value::Int64(1)),
            b.eq(&field("b"), Value::Int64(2)),
        ]);
        assert_eq!(
            p,
            json!({ "$or": [{ "a": { "$eq": 1 } }, { "b": { "$eq": 2 } }] })
        );
        assert_eq!(
            b.not(b.eq(&field("a"), Value::Int64(1))),
            json!({ "$nor": [{ "a": { "$eq": 1 } }] })
        );
    }

    #[test]
    fn test_find_request_conjoins_filters() {
        struct Noop;
        impl DocumentExecutor for Noop {
            fn find(&self, _: &Context, _: &FindRequest) -> Result<Vec<Record>, Error> {
                Ok(Vec::new())
            }
            fn count(&self, _: &Context, _: &str, _: &Json) -> Result<u64, Error> {
                Ok(0)
            }
        }

        let adapter = DocumentAdapter::new("users", Noop);
        let ctx = Context::background();
        let b = adapter.predicate_builder();

        let mut handle = adapter.open(&ctx).unwrap();
        // An applied match-all drops out of the rendered filter.
        adapter.apply_predicate(&mut handle, b.match_all());
        assert_eq!(handle.to_filter(), json!({}));

        adapter.apply_predicate(&mut handle, b.gt(&field("age"), Value::Int64(20)));
        assert_eq!(handle.to_filter(), json!({ "age": { "$gt": 20 } }));

        adapter.apply_predicate(&mut handle, b.not_null(&field("name")));
        assert_eq!(
            handle.to_filter(),
            json!({ "$and": [{ "age": { "$gt": 20 } }, { "name": { "$exists": true } }] })
        );

        adapter.apply_order(&mut handle, &field("name"), OrderDirection::Desc);
        assert_eq!(handle.sort_doc().get("name"), Some(&json!(-1)));
    }
}
