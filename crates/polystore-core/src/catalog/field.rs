//! Field metadata for registered entities.

/// Declared type of an entity field.
///
/// The engine only needs enough type information to coerce filter operands
/// and cursor values; backends keep their own richer column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// Boolean.
    Bool,
    /// Signed integer.
    Int,
    /// Floating point.
    Float,
    /// UTF-8 string.
    String,
    /// Binary data.
    Bytes,
    /// Point in time; operands are run through lenient time parsing.
    Timestamp,
    /// UUID.
    Uuid,
}

/// A field declaration: the name callers use, the backend column or property
/// name, and the declared type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    /// Declared field name (what filters, orders, and projections use).
    pub name: String,
    /// Backend column/property name.
    pub column: String,
    /// Declared type.
    pub field_type: FieldType,
}

impl FieldDef {
    /// Create a field whose column name equals its declared name.
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        let name = name.into();
        Self {
            column: name.clone(),
            name,
            field_type,
        }
    }

    /// Override the backend column name.
    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column = column.into();
        self
    }

    /// Whether operands for this field should be time-coerced.
    pub fn is_temporal(&self) -> bool {
        self.field_type == FieldType::Timestamp
    }
}
