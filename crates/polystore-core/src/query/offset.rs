//! Classic page-number/page-size pagination.

use polystore_types::PageQuery;

use crate::backend::BackendAdapter;
use crate::catalog::EntityDef;
use crate::context::Context;
use crate::error::Error;
use crate::query::{filter, keyset, DEFAULT_PAGE_SIZE};

/// Offset paginator: a count plus a limited/offset fetch through the same
/// filter and order translation as the keyset paginators. Orders apply as
/// given; offset traversal does not need a total order.
pub struct OffsetPaginator<'a, A: BackendAdapter> {
    adapter: &'a A,
    entity: &'a EntityDef,
}

impl<'a, A: BackendAdapter> OffsetPaginator<'a, A> {
    pub fn new(adapter: &'a A, entity: &'a EntityDef) -> Self {
        Self { adapter, entity }
    }

    /// Fetch one page and the total matching-row count.
    pub fn paginate(&self, ctx: &Context, query: &PageQuery) -> Result<(Vec<A::Row>, u64), Error> {
        ctx.check()?;

        let page_size = if query.page_size < 1 {
            DEFAULT_PAGE_SIZE
        } else {
            query.page_size
        };
        let page_no = query.page_no.max(1);

        let builder = self.adapter.predicate_builder();

        let predicate = filter::translate(builder, self.entity, query.filter.as_ref())?;
        let mut handle = self.adapter.open(ctx)?;
        self.adapter.apply_predicate(&mut handle, predicate);
        let total = self.adapter.count(ctx, handle)?;

        let mut handle = self.adapter.open(ctx)?;
        let predicate = filter::translate(builder, self.entity, query.filter.as_ref())?;
        self.adapter.apply_predicate(&mut handle, predicate);

        let active = keyset::resolve_orders(self.entity, &query.orders)?;
        keyset::apply_orders(self.adapter, &mut handle, &active);
        self.adapter.limit(&mut handle, page_size);
        self.adapter.offset(&mut handle, (page_no - 1) * page_size);

        let items = self.adapter.fetch(ctx, handle)?;
        Ok((items, total))
    }
}
