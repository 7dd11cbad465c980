//! Backend adapters for the polystore engine.
//!
//! Each adapter implements the engine's capability traits for one query
//! model: parameterized SQL, search-engine bool queries, document-store
//! operator documents, and an in-process memory backend that executes
//! queries directly and backs the integration tests.
//!
//! None of the adapters open connections. Statement or request execution is
//! delegated to a small executor trait the embedding application implements
//! over its own client or pool.

pub mod document;
pub mod memory;
pub mod search;
pub mod sql;

use polystore_core::Context;

/// Maps the caller's context and a base name to the tenant-scoped table,
/// index, or collection name. Naming policy belongs to the embedding
/// application; adapters only apply the function.
pub type TenantNamer = Box<dyn Fn(&Context, &str) -> String + Send + Sync>;
