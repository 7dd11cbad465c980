//! Keyset (cursor) pagination.

use tracing::debug;

use polystore_types::{CursorDirection, CursorExtra, CursorQuery};

use crate::backend::BackendAdapter;
use crate::catalog::EntityDef;
use crate::context::Context;
use crate::error::Error;
use crate::query::{filter, keyset, order, DEFAULT_PAGE_SIZE};

/// Stateless keyset paginator over one entity and one backend.
///
/// Each call resolves a total order, positions via the request cursor, and
/// overfetches by one row to detect further pages. Cursor tokens round-trip
/// between calls; feeding a page's `end_cursor` back with
/// [`CursorDirection::After`] continues the traversal without gaps or
/// duplicates even while rows are inserted or deleted around the position.
pub struct CursorPaginator<'a, A: BackendAdapter> {
    adapter: &'a A,
    entity: &'a EntityDef,
}

impl<'a, A: BackendAdapter> CursorPaginator<'a, A> {
    pub fn new(adapter: &'a A, entity: &'a EntityDef) -> Self {
        Self { adapter, entity }
    }

    /// Fetch one page and its pagination metadata.
    pub fn paginate(
        &self,
        ctx: &Context,
        query: &CursorQuery,
    ) -> Result<(Vec<A::Row>, CursorExtra), Error> {
        ctx.check()?;

        let size = if query.size < 1 {
            DEFAULT_PAGE_SIZE
        } else {
            query.size
        };

        let orders = order::ensure_total_order(self.entity, query.orders.clone())?;
        let active = keyset::resolve_orders(self.entity, &orders)?;
        let effective = match query.direction {
            CursorDirection::After => active.clone(),
            CursorDirection::Before => keyset::reversed(&active),
        };

        let builder = self.adapter.predicate_builder();
        let mut extra = CursorExtra::default();

        if query.need_total {
            let predicate = filter::translate(builder, self.entity, query.filter.as_ref())?;
            let mut handle = self.adapter.open(ctx)?;
            self.adapter.apply_predicate(&mut handle, predicate);
            extra.total = self.adapter.count(ctx, handle)?;
        }

        let mut handle = self.adapter.open(ctx)?;
        let predicate = filter::translate(builder, self.entity, query.filter.as_ref())?;
        self.adapter.apply_predicate(&mut handle, predicate);

        let cursor_values = keyset::decode_cursor(query.cursor.as_deref(), &effective)?;
        if !cursor_values.is_empty() {
            let range = keyset::range_predicate(builder, &effective, &cursor_values);
            self.adapter.apply_predicate(&mut handle, range);
        }

        // Overfetch by one; saturate so an absurdly large size cannot wrap.
        let limit = size.saturating_add(1);
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
            size,
            "cursor page fetched"
        );

        // The overfetch row only signals that more rows exist past the page;
        // both flags follow it regardless of traversal direction.
        if rows.len() as i64 == limit {
            rows.pop();
            extra.has_next = true;
            extra.has_previous = true;
        }

        // A backward fetch ran in reversed physical order; restore display
        // order before minting cursors.
        if query.direction == CursorDirection::Before {
            rows.reverse();
        }

        if let (Some(first), Some(last)) = (rows.first(), rows.last()) {
            extra.start_cursor = keyset::row_cursor(first, &active)?;
            extra.end_cursor = keyset::row_cursor(last, &active)?;
        }

        Ok((rows, extra))
    }
}
