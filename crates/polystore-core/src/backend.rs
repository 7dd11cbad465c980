//! Capability seams between the engine and concrete backends.
//!
//! The engine never sees a connection, a statement, or a wire format. It
//! talks to a [`PredicateBuilder`] to express filters, to a
//! [`BackendAdapter`] to assemble and run queries, and to [`FieldAccess`]
//! to read sort-key values back out of rows. Tenant-scoped resources are
//! produced by a [`ResourceFactory`].

use polystore_types::{OrderDirection, Record, Value};

use crate::catalog::FieldDef;
use crate::context::Context;
use crate::error::Error;

/// Builds backend-native predicates from resolved fields and coerced
/// operands.
///
/// Fields arrive already resolved, so implementations emit the backend
/// column or property name (`field.column`), never the caller-facing name.
/// Negative operators are first-class here; a backend that groups positive
/// and negative clauses differently (a search engine's must/must-not split,
/// say) does that grouping inside its own implementation.
pub trait PredicateBuilder {
    /// Backend-native predicate representation.
    type Predicate;

    /// A predicate every row satisfies.
    fn match_all(&self) -> Self::Predicate;

    fn eq(&self, field: &FieldDef, value: Value) -> Self::Predicate;
    fn ne(&self, field: &FieldDef, value: Value) -> Self::Predicate;
    fn gt(&self, field: &FieldDef, value: Value) -> Self::Predicate;
    fn gte(&self, field: &FieldDef, value: Value) -> Self::Predicate;
    fn lt(&self, field: &FieldDef, value: Value) -> Self::Predicate;
    fn lte(&self, field: &FieldDef, value: Value) -> Self::Predicate;

    /// SQL-LIKE pattern match (`%` multi-char wildcard, `_` single-char).
    fn like(&self, field: &FieldDef, pattern: String) -> Self::Predicate;
    fn not_like(&self, field: &FieldDef, pattern: String) -> Self::Predicate;

    fn is_in(&self, field: &FieldDef, values: Vec<Value>) -> Self::Predicate;
    fn not_in(&self, field: &FieldDef, values: Vec<Value>) -> Self::Predicate;

    /// Inclusive range; either bound may be `None` for a one-sided range.
    fn between(&self, field: &FieldDef, lo: Option<Value>, hi: Option<Value>) -> Self::Predicate;

    fn is_null(&self, field: &FieldDef) -> Self::Predicate;
    fn not_null(&self, field: &FieldDef) -> Self::Predicate;

    fn and(&self, preds: Vec<Self::Predicate>) -> Self::Predicate;
    fn or(&self, preds: Vec<Self::Predicate>) -> Self::Predicate;
    fn not(&self, pred: Self::Predicate) -> Self::Predicate;
}

/// Read access to ordering-field values in otherwise-opaque rows.
///
/// The engine needs exactly one thing from a row: the values of the fields
/// it ordered by, to mint that row's cursor. Lookup is by backend column
/// name.
pub trait FieldAccess {
    /// Value of the named column, if present.
    fn get(&self, column: &str) -> Option<Value>;
}

impl FieldAccess for Record {
    fn get(&self, column: &str) -> Option<Value> {
        Record::get(self, column).cloned()
    }
}

/// A concrete backend: query assembly plus execution.
///
/// A handle is one query under construction. The engine opens a handle,
/// layers predicates, ordering, limits, and projection onto it, then asks
/// for a count or a fetch. Handles are single-use; the paginators open a
/// fresh handle per statement.
pub trait BackendAdapter {
    /// Row type returned by [`BackendAdapter::fetch`].
    type Row: FieldAccess;
    /// Query under construction.
    type Handle;
    /// Predicate builder for this backend.
    type Builder: PredicateBuilder;

    /// The builder used to translate filters for this backend.
    fn predicate_builder(&self) -> &Self::Builder;

    /// Open a fresh query handle for the calling tenant.
    fn open(&self, ctx: &Context) -> Result<Self::Handle, Error>;

    /// Constrain the query. Repeated calls conjoin.
    fn apply_predicate(
        &self,
        handle: &mut Self::Handle,
        predicate: <Self::Builder as PredicateBuilder>::Predicate,
    );

    /// Append an ordering term.
    fn apply_order(&self, handle: &mut Self::Handle, field: &FieldDef, direction: OrderDirection);

    /// Cap the number of rows returned.
    fn limit(&self, handle: &mut Self::Handle, limit: i64);

    /// Skip leading rows.
    fn offset(&self, handle: &mut Self::Handle, offset: i64);

    /// Restrict returned columns.
    fn project(&self, handle: &mut Self::Handle, fields: &[&FieldDef]);

    /// Count matching rows, ignoring limit/offset/projection.
    fn count(&self, ctx: &Context, handle: Self::Handle) -> Result<u64, Error>;

    /// Execute and return matching rows.
    fn fetch(&self, ctx: &Context, handle: Self::Handle) -> Result<Vec<Self::Row>, Error>;
}

/// Creates and tears down one tenant-scoped resource.
///
/// `create` failures are returned to the caller and leave no trace in the
/// cache, so the next request for the same tenant retries.
pub trait ResourceFactory {
    /// The cached per-tenant resource (a pool, a client, a session).
    type Resource;

    /// Build the resource for a tenant.
    fn create(&self, ctx: &Context, tenant: &str) -> Result<Self::Resource, Error>;

    /// Release the resource. Called exactly once per cached entry.
    fn close(&self, resource: &Self::Resource);
}
