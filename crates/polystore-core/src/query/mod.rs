//! Filter translation, order resolution, and the pagination engines.

pub mod connection;
pub mod cursor;
pub mod filter;
mod keyset;
pub mod offset;
pub mod order;

pub use connection::ConnectionPaginator;
pub use cursor::CursorPaginator;
pub use offset::OffsetPaginator;

/// Page size used when a request asks for fewer than one row.
pub const DEFAULT_PAGE_SIZE: i64 = 20;
