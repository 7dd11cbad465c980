//! Shared keyset machinery: resolved orders, cursor tuples, and the range
//! predicate both cursor-style paginators build on.

use polystore_types::{Order, OrderDirection, Value};

use crate::backend::{BackendAdapter, FieldAccess, PredicateBuilder};
use crate::catalog::{EntityDef, FieldDef};
use crate::cursor;
use crate::error::Error;

/// An order entry with its field resolved through the catalog.
#[derive(Debug, Clone)]
pub(crate) struct ActiveOrder {
    pub field: FieldDef,
    pub direction: OrderDirection,
}

/// Resolve every order entry's field, failing on unknown names.
pub(crate) fn resolve_orders(
    entity: &EntityDef,
    orders: &[Order],
) -> Result<Vec<ActiveOrder>, Error> {
    orders
        .iter()
        .map(|o| {
            let field = entity.resolve_required(&o.field)?.clone();
            Ok(ActiveOrder {
                field,
                direction: o.direction,
            })
        })
        .collect()
}

pub(crate) fn reversed(orders: &[ActiveOrder]) -> Vec<ActiveOrder> {
    orders
        .iter()
        .map(|o| ActiveOrder {
            field: o.field.clone(),
            direction: o.direction.reverse(),
        })
        .collect()
}

/// Decode a cursor token and check its arity against the active orders.
/// Absent or empty tokens decode to an empty tuple.
pub(crate) fn decode_cursor(
    token: Option<&str>,
    orders: &[ActiveOrder],
) -> Result<Vec<Value>, Error> {
    let token = match token {
        Some(t) if !t.is_empty() => t,
        _ => return Ok(Vec::new()),
    };
    let values = cursor::decode(token)?;
    if values.len() != orders.len() {
        return Err(Error::CursorShape {
            expected: orders.len(),
            actual: values.len(),
        });
    }
    Ok(values)
}

/// Build the keyset range predicate for a cursor position.
///
/// Conceptually `(f1, f2, …) > (v1, v2, …)` in the lexicographic order the
/// effective orders define. Backends have no native tuple comparison, so it
/// expands to the nested form every predicate model can execute:
///
/// `cmp1(f1,v1) OR (f1=v1 AND cmp2(f2,v2)) OR (f1=v1 AND f2=v2 AND …)`
///
/// where each level's comparator follows that level's direction: `>` for
/// ascending, `<` for descending. Callers pass the already-reversed orders
/// for backward traversal, which flips every comparator.
pub(crate) fn range_predicate<B: PredicateBuilder>(
    builder: &B,
    orders: &[ActiveOrder],
    values: &[Value],
) -> B::Predicate {
    let mut alternatives = Vec::with_capacity(orders.len());
    for (i, order) in orders.iter().enumerate() {
        let mut terms = Vec::with_capacity(i + 1);
        for (prior, value) in orders[..i].iter().zip(values) {
            terms.push(builder.eq(&prior.field, value.clone()));
        }
        let bound = values[i].clone();
        terms.push(match order.direction {
            OrderDirection::Asc => builder.gt(&order.field, bound),
            OrderDirection::Desc => builder.lt(&order.field, bound),
        });
        alternatives.push(if terms.len() == 1 {
            terms.swap_remove(0)
        } else {
            builder.and(terms)
        });
    }
    if alternatives.len() == 1 {
        alternatives.swap_remove(0)
    } else {
        builder.or(alternatives)
    }
}

/// Apply resolved orders to a query handle.
pub(crate) fn apply_orders<A: BackendAdapter>(
    adapter: &A,
    handle: &mut A::Handle,
    orders: &[ActiveOrder],
) {
    for order in orders {
        adapter.apply_order(handle, &order.field, order.direction);
    }
}

/// Mint a row's cursor from its ordering-field values.
///
/// Cursors carry only the sort tuple, never the whole row; a missing column
/// encodes as null so the token arity always matches the active orders.
pub(crate) fn row_cursor<R: FieldAccess>(row: &R, orders: &[ActiveOrder]) -> Result<String, Error> {
    let values: Vec<Value> = orders
        .iter()
        .map(|o| row.get(&o.field.column).unwrap_or(Value::Null))
        .collect();
    cursor::encode(&values)
}

/// Resolve a projection, keeping the ordering fields in it so cursors can
/// still be minted from the fetched rows. Empty input means no projection.
pub(crate) fn resolve_projection<'e>(
    entity: &'e EntityDef,
    fields: &[String],
    orders: &[ActiveOrder],
) -> Result<Vec<&'e FieldDef>, Error> {
    if fields.is_empty() {
        return Ok(Vec::new());
    }

    let mut out: Vec<&FieldDef> = Vec::with_capacity(fields.len() + orders.len());
    let push = |out: &mut Vec<&'e FieldDef>, field: &'e FieldDef| {
        if !out.iter().any(|f| f.name == field.name) {
            out.push(field);
        }
    };
    for name in fields {
        push(&mut out, entity.resolve_required(name)?);
    }
    for order in orders {
        push(&mut out, entity.resolve_required(&order.field.name)?);
    }
    Ok(out)
}
