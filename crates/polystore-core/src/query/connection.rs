//! Relay-style connection pagination.

use tracing::debug;

use polystore_types::{Connection, ConnectionQuery, Edge};

use crate::backend::BackendAdapter;
use crate::catalog::EntityDef;
use crate::context::Context;
use crate::error::Error;
use crate::query::{filter, keyset, order, DEFAULT_PAGE_SIZE};

/// Hard ceiling on a single connection fetch, including the overfetch row.
const MAX_FETCH: i64 = 1001;

/// Relay `first/last/before/after` pagination over the keyset machinery.
pub struct ConnectionPaginator<'a, A: BackendAdapter> {
    adapter: &'a A,
    entity: &'a EntityDef,
}

impl<'a, A: BackendAdapter> ConnectionPaginator<'a, A> {
    pub fn new(adapter: &'a A, entity: &'a EntityDef) -> Self {
        Self { adapter, entity }
    }

    /// Fetch one connection page.
    pub fn paginate(
        &self,
        ctx: &Context,
        query: &ConnectionQuery,
    ) -> Result<Connection<A::Row>, Error> {
        ctx.check()?;
        validate_args(query)?;

        let orders = order::ensure_total_order(self.entity, query.orders.clone())?;
        let active = keyset::resolve_orders(self.entity, &orders)?;

        let builder = self.adapter.predicate_builder();
        let mut connection = Connection::default();

        // A zero-row request is pure metadata: no fetch, flags derived from
        // the total when one was asked for.
        if query.first == Some(0) || query.last == Some(0) {
            if query.need_total {
                let predicate = filter::translate(builder, self.entity, query.filter.as_ref())?;
                let mut handle = self.adapter.open(ctx)?;
                self.adapter.apply_predicate(&mut handle, predicate);
                connection.total = self.adapter.count(ctx, handle)?;
                connection.page_info.has_next = query.first.is_some() && connection.total > 0;
                connection.page_info.has_previous = query.last.is_some() && connection.total > 0;
            }
            return Ok(connection);
        }

        if query.need_total {
            let predicate = filter::translate(builder, self.entity, query.filter.as_ref())?;
            let mut handle = self.adapter.open(ctx)?;
            self.adapter.apply_predicate(&mut handle, predicate);
            connection.total = self.adapter.count(ctx, handle)?;
        }

        let by_last = query.last.is_some();
        let effective = if by_last {
            keyset::reversed(&active)
        } else {
            active.clone()
        };

        let mut handle = self.adapter.open(ctx)?;
        let predicate = filter::translate(builder, self.entity, query.filter.as_ref())?;
        self.adapter.apply_predicate(&mut handle, predicate);

        // `after` advances along the display order, `before` recedes; the
        // receding bound is the same range predicate over flipped orders.
        let after_values = keyset::decode_cursor(query.after.as_deref(), &active)?;
        if !after_values.is_empty() {
            let range = keyset::range_predicate(builder, &active, &after_values);
            self.adapter.apply_predicate(&mut handle, range);
        }
        let before_values = keyset::decode_cursor(query.before.as_deref(), &active)?;
        if !before_values.is_empty() {
            let receding = keyset::reversed(&active);
            let range = keyset::range_predicate(builder, &receding, &before_values);
            self.adapter.apply_predicate(&mut handle, range);
        }

        // Clamp to the ceiling before the overfetch row so huge requested
        // page sizes cannot wrap the addition.
        let limit = query
            .first
            .or(query.last)
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .min(MAX_FETCH - 1)
            + 1;

        keyset::apply_orders(self.adapter, &mut handle, &effective);
        self.adapter.limit(&mut handle, limit);

        let projection = keyset::resolve_projection(self.entity, &query.fields, &active)?;
        if !projection.is_empty() {
            self.adapter.project(&mut handle, &projection);
        }

        let mut rows = self.adapter.fetch(ctx, handle)?;
        debug!(
            entity = self.entity.name(),
            fetched = rows.len(),
            limit,
            by_last,
            "connection page fetched"
        );

        if rows.is_empty() {
            return Ok(connection);
        }

        if rows.len() as i64 == limit {
            rows.pop();
            connection.page_info.has_next = true;
            connection.page_info.has_previous = true;
        }

        // Pagination by `last` fetched in reversed physical order; undo it
        // so edges come out in display order.
        if by_last {
            rows.reverse();
        }

        let mut edges = Vec::with_capacity(rows.len());
        for row in rows {
            let cursor = keyset::row_cursor(&row, &active)?;
            edges.push(Edge { node: row, cursor });
        }

        if let (Some(first), Some(last)) = (edges.first(), edges.last()) {
            connection.page_info.start_cursor = first.cursor.clone();
            connection.page_info.end_cursor = last.cursor.clone();
        }
        connection.edges = edges;

        Ok(connection)
    }
}

fn validate_args(query: &ConnectionQuery) -> Result<(), Error> {
    if query.first.is_some() && query.last.is_some() {
        return Err(Error::InvalidPaginationArgs(
            "first and last are mutually exclusive".into(),
        ));
    }
    if let Some(first) = query.first {
        if first < 0 {
            return Err(Error::InvalidPaginationArgs(format!(
                "first must be non-negative, got {first}"
            )));
        }
    }
    if let Some(last) = query.last {
        if last < 0 {
            return Err(Error::InvalidPaginationArgs(format!(
                "last must be non-negative, got {last}"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_and_last_are_mutually_exclusive() {
        let query = ConnectionQuery::new().with_first(5).with_last(5);
        assert!(matches!(
            validate_args(&query),
            Err(Error::InvalidPaginationArgs(_))
        ));
    }

    #[test]
    fn test_negative_bounds_rejected() {
        assert!(validate_args(&ConnectionQuery::new().with_first(-1)).is_err());
        assert!(validate_args(&ConnectionQuery::new().with_last(-3)).is_err());
        assert!(validate_args(&ConnectionQuery::new().with_first(0)).is_ok());
    }
}
