//! Polystore shared types.
//!
//! Value, record, and query/pagination DTOs used by the engine and every
//! backend adapter.

pub mod query;
pub mod record;
pub mod value;

pub use query::{
    Connection, ConnectionQuery, CursorDirection, CursorExtra, CursorQuery, Edge, Filter, Order,
    OrderDirection, PageInfo, PageQuery,
};
pub use record::Record;
pub use value::Value;
