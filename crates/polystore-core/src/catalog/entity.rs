//! Entity registration and field lookup.

use std::collections::HashMap;

use super::field::FieldDef;
use crate::error::Error;

/// A registered entity: its fields, identity field set, and a pre-built
/// case-insensitive name lookup.
///
/// The lookup map is constructed once as fields are added, so per-query
/// field resolution is a plain hash probe. Each entity owns its own map;
/// there is no process-global field cache.
#[derive(Debug, Clone)]
pub struct EntityDef {
    name: String,
    fields: Vec<FieldDef>,
    identity: Vec<String>,
    lookup: HashMap<String, usize>,
}

impl EntityDef {
    /// Create an entity definition.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            identity: Vec::new(),
            lookup: HashMap::new(),
        }
    }

    /// Add a field. Later declarations with the same (case-insensitive)
    /// name shadow earlier ones.
    pub fn with_field(mut self, field: FieldDef) -> Self {
        self.lookup
            .insert(field.name.to_ascii_lowercase(), self.fields.len());
        self.fields.push(field);
        self
    }

    /// Declare an identity (unique key) field. Call once per field for
    /// composite identities.
    pub fn with_identity(mut self, field: impl Into<String>) -> Self {
        self.identity.push(field.into());
        self
    }

    /// Entity name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared identity field names.
    pub fn identity(&self) -> &[String] {
        &self.identity
    }

    /// All declared fields.
    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    /// Resolve a field by declared name, case-insensitively.
    pub fn resolve(&self, name: &str) -> Option<&FieldDef> {
        self.lookup
            .get(&name.to_ascii_lowercase())
            .map(|&idx| &self.fields[idx])
    }

    /// Resolve a field or fail with [`Error::UnknownField`].
    pub fn resolve_required(&self, name: &str) -> Result<&FieldDef, Error> {
        self.resolve(name)
            .ok_or_else(|| Error::UnknownField(name.to_string()))
    }
}
