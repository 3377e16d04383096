//! Generic declarative resource store.
//!
//! # Responsibility
//! - Persist resource objects of any `Resource` kind as JSON documents.
//! - Manage storage metadata (uid, generation, resource version) through a
//!   `CrudStrategy`.
//!
//! # Invariants
//! - Keys are `(group, resource, namespace, name)`.
//! - Every successful write advances one store-wide revision counter.

pub mod options;
pub mod store;
pub mod strategy;

pub use options::StoreOptions;
pub use store::SqliteResourceStore;
pub use strategy::CrudStrategy;
