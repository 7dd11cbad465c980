//! Order resolution: turning caller-supplied sort entries into a total order.

use polystore_types::Order;

use crate::catalog::EntityDef;
use crate::error::Error;

/// Extend `orders` so comparisons over the sort tuple are unique.
///
/// Keyset pagination is only correct when no two rows compare equal on the
/// full sort tuple. Any identity field missing from the supplied orders is
/// appended ascending, covering composite identities in declaration order.
pub fn ensure_total_order(entity: &EntityDef, mut orders: Vec<Order>) -> Result<Vec<Order>, Error> {
    if entity.identity().is_empty() {
        return Err(Error::MissingIdentity(entity.name().to_string()));
    }

    for id in entity.identity() {
        let present = orders.iter().any(|o| o.field.eq_ignore_ascii_case(id));
        if !present {
            orders.push(Order::asc(id.clone()));
        }
    }

    Ok(orders)
}

/// Flip the direction of every entry.
///
/// Used when a traversal executes in the opposite physical order and the
/// rows are re-reversed before returning.
pub fn reverse(orders: &[Order]) -> Vec<Order> {
    orders
        .iter()
        .map(|o| Order {
            field: o.field.clone(),
            direction: o.direction.reverse(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{EntityDef, FieldDef, FieldType};
    use polystore_types::OrderDirection;

    fn entity() -> EntityDef {
        EntityDef::new("Member")
            .with_field(FieldDef::new("org", FieldType::String))
            .with_field(FieldDef::new("id", FieldType::Int))
            .with_field(FieldDef::new("name", FieldType::String))
            .with_identity("org")
            .with_identity("id")
    }

    #[test]
    fn test_appends_missing_identity_fields() {
        let orders = ensure_total_order(&entity(), vec![Order::asc("name")]).unwrap();
        assert_eq!(orders.len(), 3);
        assert_eq!(orders[1], Order::asc("org"));
        assert_eq!(orders[2], Order::asc("id"));
    }

    #[test]
    fn test_appends_only_absent_identity_fields() {
        let orders =
            ensure_total_order(&entity(), vec![Order::desc("ID"), Order::asc("name")]).unwrap();
        assert_eq!(orders.len(), 3);
        // "ID" counts as "id" (case-insensitive), so only "org" is appended.
        assert_eq!(orders[2], Order::asc("org"));
    }

    #[test]
    fn test_complete_orders_unchanged() {
        let supplied = vec![Order::desc("org"), Order::asc("id")];
        let orders = ensure_total_order(&entity(), supplied.clone()).unwrap();
        assert_eq!(orders, supplied);
    }

    #[test]
    fn test_empty_orders_get_full_identity() {
        let orders = ensure_total_order(&entity(), Vec::new()).unwrap();
        assert_eq!(orders, vec![Order::asc("org"), Order::asc("id")]);
    }

    #[test]
    fn test_no_identity_is_an_error() {
        let entity = EntityDef::new("Orphan").with_field(FieldDef::new("x", FieldType::Int));
        let err = ensure_total_order(&entity, Vec::new()).unwrap_err();
        assert!(matches!(err, Error::MissingIdentity(name) if name == "Orphan"));
    }

    #[test]
    fn test_reverse_flips_every_entry() {
        let orders = vec![Order::asc("a"), Order::desc("b"), Order::asc("c")];
        let reversed = reverse(&orders);
        assert_eq!(reversed[0].direction, OrderDirection::Desc);
        assert_eq!(reversed[1].direction, OrderDirection::Asc);
        assert_eq!(reversed[2].direction, OrderDirection::Desc);
        assert_eq!(reversed[0].field, "a");
    }
}
