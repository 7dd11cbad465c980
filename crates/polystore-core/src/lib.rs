//! Backend-agnostic data-access engine.
//!
//! One filter DSL, one keyset pagination algorithm, one Relay connection
//! layer, and one tenant resource cache, written once against a pair of
//! capability traits ([`PredicateBuilder`], [`BackendAdapter`]) that each
//! concrete backend implements. Everything here is synchronous and
//! stateless per call; the tenancy cache is the only shared mutable state.

pub mod backend;
pub mod catalog;
pub mod context;
pub mod cursor;
pub mod error;
pub mod query;
pub mod tenancy;
pub mod timeparse;

pub use backend::{BackendAdapter, FieldAccess, PredicateBuilder, ResourceFactory};
pub use catalog::{EntityDef, FieldDef, FieldType};
pub use context::Context;
pub use error::Error;
pub use query::{ConnectionPaginator, CursorPaginator, OffsetPaginator};
pub use tenancy::TenantCache;
