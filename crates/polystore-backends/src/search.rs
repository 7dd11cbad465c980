//! Search-engine adapter: predicates are bool-query JSON trees, handles are
//! search requests.

use serde_json::{json, Map, Value as Json};

use polystore_core::{BackendAdapter, Context, Error, FieldDef, PredicateBuilder};
use polystore_types::{OrderDirection, Record, Value};

use crate::TenantNamer;

/// Translate a SQL LIKE pattern to the engine's wildcard syntax.
fn wildcard_pattern(pattern: &str) -> String {
    pattern.replace('%', "*").replace('_', "?")
}

fn must_not(clause: Json) -> Json {
    json!({ "bool": { "must_not": [clause] } })
}

/// Emits bool-query clauses. Negative operators land in `must_not` wrappers
/// here, so the engine can treat them like any other predicate.
#[derive(Debug, Default)]
pub struct SearchPredicateBuilder;

impl SearchPredicateBuilder {
    fn range(&self, field: &FieldDef, op: &str, value: Value) -> Json {
        json!({ "range": { field.column.clone(): { op: value.to_json() } } })
    }
}

impl PredicateBuilder for SearchPredicateBuilder {
    type Predicate = Json;

    fn match_all(&self) -> Json {
        json!({ "match_all": {} })
    }

    fn eq(&self, field: &FieldDef, value: Value) -> Json {
        json!({ "term": { field.column.clone(): value.to_json() } })
    }

    fn ne(&self, field: &FieldDef, value: Value) -> Json {
        must_not(self.eq(field, value))
    }

    fn gt(&self, field: &FieldDef, value: Value) -> Json {
        self.range(field, "gt", value)
    }

    fn gte(&self, field: &FieldDef, value: Value) -> Json {
        self.range(field, "gte", value)
    }

    fn lt(&self, field: &FieldDef, value: Value) -> Json {
        self.range(field, "lt", value)
    }

    fn lte(&self, field: &FieldDef, value: Value) -> Json {
        self.range(field, "lte", value)
    }

    fn like(&self, field: &FieldDef, pattern: String) -> Json {
        json!({ "wildcard": { field.column.clone(): wildcard_pattern(&pattern) } })
    }

    fn not_like(&self, field: &FieldDef, pattern: String) -> Json {
        must_not(self.like(field, pattern))
    }

    fn is_in(&self, field: &FieldDef, values: Vec<Value>) -> Json {
        let values: Vec<Json> = values.iter().map(Value::to_json).collect();
        json!({ "terms": { field.column.clone(): values } })
    }

    fn not_in(&self, field: &FieldDef, values: Vec<Value>) -> Json {
        must_not(self.is_in(field, values))
    }

    fn between(&self, field: &FieldDef, lo: Option<Value>, hi: Option<Value>) -> Json {
        let mut bounds = Map::new();
        if let Some(lo) = lo {
            bounds.insert("gte".into(), lo.to_json());
        }
        if let Some(hi) = hi {
            bounds.insert("lte".into(), hi.to_json());
        }
        if bounds.is_empty() {
            return self.match_all();
        }
        json!({ "range": { field.column.clone(): bounds } })
    }

    fn is_null(&self, field: &FieldDef) -> Json {
        must_not(self.not_null(field))
    }

    fn not_null(&self, field: &FieldDef) -> Json {
        json!({ "exists": { "field": field.column.clone() } })
    }

    fn and(&self, preds: Vec<Json>) -> Json {
        json!({ "bool": { "must": preds } })
    }

    fn or(&self, preds: Vec<Json>) -> Json {
        json!({ "bool": { "should": preds, "minimum_should_match": 1 } })
    }

    fn not(&self, pred: Json) -> Json {
        must_not(pred)
    }
}

/// A search request under construction.
#[derive(Debug)]
pub struct SearchRequest {
    index: String,
    musts: Vec<Json>,
    sort: Vec<Json>,
    size: Option<i64>,
    from: Option<i64>,
    source: Vec<String>,
}

impl SearchRequest {
    fn new(index: String) -> Self {
        Self {
            index,
            musts: Vec::new(),
            sort: Vec::new(),
            size: None,
            from: None,
            source: Vec::new(),
        }
    }

    /// Target index name.
    pub fn index(&self) -> &str {
        &self.index
    }

    /// Render the request body.
    pub fn to_body(&self) -> Json {
        let mut body = Map::new();
        body.insert("query".into(), json!({ "bool": { "must": self.musts } }));
        if !self.sort.is_empty() {
            body.insert("sort".into(), Json::Array(self.sort.clone()));
        }
        if let Some(size) = self.size {
            body.insert("size".into(), json!(size));
        }
        if let Some(from) = self.from {
            body.insert("from".into(), json!(from));
        }
        if !self.source.is_empty() {
            body.insert("_source".into(), json!(self.source));
        }
        Json::Object(body)
    }
}

/// Executes rendered requests against the application's search client.
pub trait SearchExecutor {
    /// Run a search and return hit sources as records.
    fn search(&self, ctx: &Context, index: &str, body: &Json) -> Result<Vec<Record>, Error>;

    /// Count documents matching the request's query.
    fn count(&self, ctx: &Context, index: &str, body: &Json) -> Result<u64, Error>;
}

/// Search-engine backend adapter over an injected executor.
pub struct SearchAdapter<E> {
    index: String,
    executor: E,
    builder: SearchPredicateBuilder,
    namer: Option<TenantNamer>,
}

impl<E: SearchExecutor> SearchAdapter<E> {
    pub fn new(index: impl Into<String>, executor: E) -> Self {
        Self {
            index: index.into(),
            executor,
            builder: SearchPredicateBuilder,
            namer: None,
        }
    }

    /// Scope index names per tenant through the supplied naming function.
    pub fn with_namer(mut self, namer: TenantNamer) -> Self {
        self.namer = Some(namer);
        self
    }

    fn index_for(&self, ctx: &Context) -> String {
        match &self.namer {
            Some(namer) => namer(ctx, &self.index),
            None => self.index.clone(),
        }
    }
}

impl<E: SearchExecutor> BackendAdapter for SearchAdapter<E> {
    type Row = Record;
    type Handle = SearchRequest;
    type Builder = SearchPredicateBuilder;

    fn predicate_builder(&self) -> &SearchPredicateBuilder {
        &self.builder
    }

    fn open(&self, ctx: &Context) -> Result<SearchRequest, Error> {
        ctx.check()?;
        Ok(SearchRequest::new(self.index_for(ctx)))
    }

    fn apply_predicate(&self, handle: &mut SearchRequest, predicate: Json) {
        handle.musts.push(predicate);
    }

    fn apply_order(&self, handle: &mut SearchRequest, field: &FieldDef, direction: OrderDirection) {
        let order = match direction {
            OrderDirection::Asc => "asc",
            OrderDirection::Desc => "desc",
        };
        handle
            .sort
            .push(json!({ field.column.clone(): { "order": order } }));
    }

    fn limit(&self, handle: &mut SearchRequest, limit: i64) {
        handle.size = Some(limit);
    }

    fn offset(&self, handle: &mut SearchRequest, offset: i64) {
        handle.from = Some(offset);
    }

    fn project(&self, handle: &mut SearchRequest, fields: &[&FieldDef]) {
        handle.source = fields.iter().map(|f| f.column.clone()).collect();
    }

    fn count(&self, ctx: &Context, handle: SearchRequest) -> Result<u64, Error> {
        ctx.check()?;
        let body = json!({ "query": { "bool": { "must": handle.musts } } });
        self.executor.count(ctx, &handle.index, &body)
    }

    fn fetch(&self, ctx: &Context, handle: SearchRequest) -> Result<Vec<Record>, Error> {
        ctx.check()?;
        let body = handle.to_body();
        tracing::debug!(index = %handle.index, "executing search");
        self.executor.search(ctx, &handle.index, &body)
    }
}
