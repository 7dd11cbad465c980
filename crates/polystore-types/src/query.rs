//! Query and pagination types shared by all backends.

use serde::{Deserialize, Serialize};

/// The generic filter DSL: a JSON map of field names (or the logical
/// combinators `AND`/`OR`/`NOR`) to scalar values, operator maps, or lists
/// of sub-filters.
pub type Filter = serde_json::Map<String, serde_json::Value>;

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderDirection {
    /// Ascending order.
    Asc,
    /// Descending order.
    Desc,
}

impl OrderDirection {
    /// The opposite direction.
    pub fn reverse(self) -> Self {
        match self {
            OrderDirection::Asc => OrderDirection::Desc,
            OrderDirection::Desc => OrderDirection::Asc,
        }
    }
}

/// A sort entry: field name plus direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Field to order by.
    pub field: String,
    /// Sort direction.
    pub direction: OrderDirection,
}

impl Order {
    /// Create an ascending order.
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: OrderDirection::Asc,
        }
    }

    /// Create a descending order.
    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: OrderDirection::Desc,
        }
    }
}

/// Traversal direction for keyset pagination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CursorDirection {
    /// Rows after the cursor position, in sort order.
    #[default]
    After,
    /// Rows before the cursor position.
    Before,
}

/// A keyset pagination request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CursorQuery {
    /// Filter conditions.
    pub filter: Option<Filter>,
    /// Opaque cursor token from a previous page; empty or absent means the
    /// first page.
    pub cursor: Option<String>,
    /// Sort entries; the engine appends the entity's identity fields when
    /// they are missing.
    pub orders: Vec<Order>,
    /// Page size; values below 1 fall back to the engine default.
    pub size: i64,
    /// Traversal direction relative to the cursor.
    pub direction: CursorDirection,
    /// Whether to also count all matching rows.
    pub need_total: bool,
    /// Field projection; empty means all fields.
    pub fields: Vec<String>,
}

impl CursorQuery {
    /// Create a query for the first page of `size` rows.
    pub fn new(size: i64) -> Self {
        Self {
            size,
            ..Self::default()
        }
    }

    /// Set the filter.
    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Set the cursor token.
    pub fn with_cursor(mut self, cursor: impl Into<String>) -> Self {
        self.cursor = Some(cursor.into());
        self
    }

    /// Add a sort entry.
    pub fn with_order(mut self, order: Order) -> Self {
        self.orders.push(order);
        self
    }

    /// Set the traversal direction.
    pub fn with_direction(mut self, direction: CursorDirection) -> Self {
        self.direction = direction;
        self
    }

    /// Request a total count alongside the page.
    pub fn with_total(mut self) -> Self {
        self.need_total = true;
        self
    }
}

/// Pagination metadata accompanying a keyset page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CursorExtra {
    /// Total matching rows; only populated when requested.
    pub total: u64,
    /// Whether rows exist before this page.
    pub has_previous: bool,
    /// Whether rows exist after this page.
    pub has_next: bool,
    /// Cursor of the first row in the page; empty when the page is empty.
    pub start_cursor: String,
    /// Cursor of the last row in the page; empty when the page is empty.
    pub end_cursor: String,
}

/// A Relay-style connection request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConnectionQuery {
    /// Filter conditions.
    pub filter: Option<Filter>,
    /// Fetch the first N rows after `after`. Mutually exclusive with `last`.
    pub first: Option<i64>,
    /// Fetch the last N rows before `before`. Mutually exclusive with `first`.
    pub last: Option<i64>,
    /// Exclusive lower cursor bound.
    pub after: Option<String>,
    /// Exclusive upper cursor bound.
    pub before: Option<String>,
    /// Sort entries; identity fields are appended when missing.
    pub orders: Vec<Order>,
    /// Whether to also count all matching rows.
    pub need_total: bool,
    /// Field projection; empty means all fields.
    pub fields: Vec<String>,
}

impl ConnectionQuery {
    /// Create an empty connection query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the filter.
    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Fetch the first N rows.
    pub fn with_first(mut self, first: i64) -> Self {
        self.first = Some(first);
        self
    }

    /// Fetch the last N rows.
    pub fn with_last(mut self, last: i64) -> Self {
        self.last = Some(last);
        self
    }

    /// Set the exclusive lower cursor bound.
    pub fn with_after(mut self, after: impl Into<String>) -> Self {
        self.after = Some(after.into());
        self
    }

    /// Set the exclusive upper cursor bound.
    pub fn with_before(mut self, before: impl Into<String>) -> Self {
        self.before = Some(before.into());
        self
    }

    /// Add a sort entry.
    pub fn with_order(mut self, order: Order) -> Self {
        self.orders.push(order);
        self
    }

    /// Request a total count alongside the edges.
    pub fn with_total(mut self) -> Self {
        self.need_total = true;
        self
    }
}

/// A node plus its keyset position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge<N> {
    /// The fetched row.
    pub node: N,
    /// Opaque cursor encoding the node's ordering-field values.
    pub cursor: String,
}

/// Relay `pageInfo`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageInfo {
    /// Whether rows exist before this page.
    pub has_previous: bool,
    /// Whether rows exist after this page.
    pub has_next: bool,
    /// First edge's cursor; empty when there are no edges.
    pub start_cursor: String,
    /// Last edge's cursor; empty when there are no edges.
    pub end_cursor: String,
}

/// A Relay-style connection page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection<N> {
    /// Total matching rows; only populated when requested.
    pub total: u64,
    /// The page of edges in display order.
    pub edges: Vec<Edge<N>>,
    /// Pagination metadata.
    pub page_info: PageInfo,
}

impl<N> Default for Connection<N> {
    fn default() -> Self {
        Self {
            total: 0,
            edges: Vec::new(),
            page_info: PageInfo::default(),
        }
    }
}

/// A classic offset pagination request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageQuery {
    /// Filter conditions.
    pub filter: Option<Filter>,
    /// 1-based page number; values below 1 clamp to 1.
    pub page_no: i64,
    /// Page size; values below 1 fall back to the engine default.
    pub page_size: i64,
    /// Sort entries, applied as given.
    pub orders: Vec<Order>,
}

impl PageQuery {
    /// Create a query for page `page_no` of `page_size` rows.
    pub fn new(page_no: i64, page_size: i64) -> Self {
        Self {
            page_no,
            page_size,
            ..Self::default()
        }
    }

    /// Set the filter.
    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Add a sort entry.
    pub fn with_order(mut self, order: Order) -> Self {
        self.orders.push(order);
        self
    }
}
