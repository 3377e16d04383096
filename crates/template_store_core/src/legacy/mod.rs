//! Legacy template service and its resource-storage adapter.
//!
//! # Responsibility
//! - Own the authoritative template rows during the migration window.
//! - Present them through the `Storage` contract as `Template` resources.
//!
//! # Invariants
//! - Every template is scoped by org id; names are unique per org.
//! - The adapter never talks to the generic store.

pub mod service;
pub mod storage;
