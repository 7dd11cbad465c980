//! Entity catalog: field metadata registered once, resolved per query.

mod entity;
mod field;

pub use entity::EntityDef;
pub use field::{FieldDef, FieldType};
