//! Filter tree translation.
//!
//! Walks the JSON filter DSL and emits a backend-native predicate through a
//! [`PredicateBuilder`]. The root map is an implicit AND over its keys;
//! `AND`/`OR`/`NOR` keys combine lists of sub-filters; every other key is a
//! field name resolved case-insensitively against the entity catalog.

use serde_json::Value as Json;

use polystore_types::{Filter, Value};

use crate::backend::PredicateBuilder;
use crate::catalog::{EntityDef, FieldDef};
use crate::error::Error;
use crate::timeparse;

/// Translate a filter into a backend predicate. `None` and the empty map
/// both mean "match everything".
pub fn translate<B: PredicateBuilder>(
    builder: &B,
    entity: &EntityDef,
    filter: Option<&Filter>,
) -> Result<B::Predicate, Error> {
    match filter {
        Some(map) if !map.is_empty() => translate_map(builder, entity, map),
        _ => Ok(builder.match_all()),
    }
}

fn translate_map<B: PredicateBuilder>(
    builder: &B,
    entity: &EntityDef,
    map: &Filter,
) -> Result<B::Predicate, Error> {
    let mut preds = Vec::with_capacity(map.len());
    for (key, value) in map {
        preds.push(translate_entry(builder, entity, key, value)?);
    }
    Ok(conjoin(builder, preds))
}

fn translate_entry<B: PredicateBuilder>(
    builder: &B,
    entity: &EntityDef,
    key: &str,
    value: &Json,
) -> Result<B::Predicate, Error> {
    match key {
        "AND" | "OR" | "NOR" => {
            let children = combinator_children(builder, entity, key, value)?;
            Ok(match key {
                "AND" => builder.and(children),
                "OR" => builder.or(children),
                _ => builder.not(builder.or(children)),
            })
        }
        _ => {
            let field = entity.resolve_required(key)?;
            match value {
                Json::Object(ops) => {
                    let mut preds = Vec::with_capacity(ops.len());
                    for (op, operand) in ops {
                        preds.push(translate_operator(builder, field, op, operand)?);
                    }
                    Ok(conjoin(builder, preds))
                }
                scalar => Ok(builder.eq(field, convert_operand(field, "EQ", scalar)?)),
            }
        }
    }
}

fn combinator_children<B: PredicateBuilder>(
    builder: &B,
    entity: &EntityDef,
    key: &str,
    value: &Json,
) -> Result<Vec<B::Predicate>, Error> {
    let items = value
        .as_array()
        .ok_or_else(|| Error::MalformedFilter(format!("{key} expects a list of filters")))?;

    let mut children = Vec::with_capacity(items.len());
    for item in items {
        let map = item.as_object().ok_or_else(|| {
            Error::MalformedFilter(format!("{key} list elements must be filter maps"))
        })?;
        children.push(translate_map(builder, entity, map)?);
    }
    Ok(children)
}

fn translate_operator<B: PredicateBuilder>(
    builder: &B,
    field: &FieldDef,
    op: &str,
    operand: &Json,
) -> Result<B::Predicate, Error> {
    let pred = match op {
        "EQ" => builder.eq(field, convert_operand(field, op, operand)?),
        "NE" => builder.ne(field, convert_operand(field, op, operand)?),
        "GT" => builder.gt(field, convert_operand(field, op, operand)?),
        "GTE" => builder.gte(field, convert_operand(field, op, operand)?),
        "LT" => builder.lt(field, convert_operand(field, op, operand)?),
        "LTE" => builder.lte(field, convert_operand(field, op, operand)?),
        "LIKE" | "MATCH" => builder.like(field, pattern_operand(field, op, operand)?),
        "NOT_LIKE" => builder.not_like(field, pattern_operand(field, op, operand)?),
        "IN" => builder.is_in(field, list_operand(field, op, operand)?),
        "NOT_IN" => builder.not_in(field, list_operand(field, op, operand)?),
        "BETWEEN" => {
            let (lo, hi) = between_operand(field, op, operand)?;
            builder.between(field, lo, hi)
        }
        "IS_NULL" => builder.is_null(field),
        "NOT_NULL" => builder.not_null(field),
        other => {
            return Err(Error::MalformedFilter(format!(
                "unknown operator {other} on field {}",
                field.name
            )))
        }
    };
    Ok(pred)
}

/// Convert a JSON operand to a [`Value`], running temporal coercion for
/// timestamp fields.
fn convert_operand(field: &FieldDef, op: &str, operand: &Json) -> Result<Value, Error> {
    let value = Value::from_json(operand).ok_or_else(|| Error::FilterValueType {
        field: field.name.clone(),
        op: op.to_string(),
    })?;
    Ok(if field.is_temporal() {
        timeparse::coerce(value)
    } else {
        value
    })
}

fn pattern_operand(field: &FieldDef, op: &str, operand: &Json) -> Result<String, Error> {
    operand
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| Error::FilterValueType {
            field: field.name.clone(),
            op: op.to_string(),
        })
}

fn list_operand(field: &FieldDef, op: &str, operand: &Json) -> Result<Vec<Value>, Error> {
    let items = operand.as_array().ok_or_else(|| Error::FilterValueType {
        field: field.name.clone(),
        op: op.to_string(),
    })?;
    items
        .iter()
        .map(|item| convert_operand(field, op, item))
        .collect()
}

fn between_operand(
    field: &FieldDef,
    op: &str,
    operand: &Json,
) -> Result<(Option<Value>, Option<Value>), Error> {
    let items = operand.as_array().ok_or_else(|| Error::FilterValueType {
        field: field.name.clone(),
        op: op.to_string(),
    })?;
    if items.len() != 2 {
        return Err(Error::FilterValueSize {
            field: field.name.clone(),
            len: items.len(),
        });
    }
    let bound = |item: &Json| -> Result<Option<Value>, Error> {
        if item.is_null() {
            Ok(None)
        } else {
            convert_operand(field, op, item).map(Some)
        }
    };
    Ok((bound(&items[0])?, bound(&items[1])?))
}

fn conjoin<B: PredicateBuilder>(builder: &B, mut preds: Vec<B::Predicate>) -> B::Predicate {
    match preds.len() {
        0 => builder.match_all(),
        1 => preds.swap_remove(0),
        _ => builder.and(preds),
    }
}
