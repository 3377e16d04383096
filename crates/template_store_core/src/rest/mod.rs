//! Resource storage contract consumed by the API-serving layer.
//!
//! # Responsibility
//! - Define the `Storage` trait every backend (legacy adapter, generic
//!   store, dual writer) implements.
//! - Carry request scope, error taxonomy and table rendering.
//!
//! # Invariants
//! - Objects are addressed by `(ctx.namespace(), name)`.
//! - Write results may carry warnings; a warning never turns a successful
//!   write into a failure.

pub mod context;
pub mod error;
pub mod table;

pub use context::{CancellationToken, RequestContext};
pub use error::{Status, StorageError, StorageResult};
pub use table::{Object, Table, TableColumnDefinition, TableConverter, TableRow};

use crate::apis::info::ResourceInfo;
use crate::model::resource::{Resource, ResourceList};
use std::fmt::{Display, Formatter};

/// Mutating storage operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Create,
    Update,
    Delete,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl Display for Operation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Non-fatal condition attached to a successful write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteWarning {
    /// The authoritative write succeeded but the generic-store write did not.
    SecondaryWriteFailed {
        operation: Operation,
        name: String,
        reason: String,
    },
}

/// Outcome of a successful write.
#[derive(Debug, Clone)]
pub struct WriteResult<R> {
    /// Stored object; for deletes, the object as it was before deletion.
    pub object: R,
    pub warnings: Vec<WriteWarning>,
}

impl<R> WriteResult<R> {
    pub fn new(object: R) -> Self {
        Self {
            object,
            warnings: Vec::new(),
        }
    }

    pub fn has_secondary_failure(&self) -> bool {
        self.warnings
            .iter()
            .any(|warning| matches!(warning, WriteWarning::SecondaryWriteFailed { .. }))
    }
}

/// CRUD + list + table rendering over one resource kind.
pub trait Storage<R: Resource>: Send + Sync {
    fn resource_info(&self) -> &ResourceInfo;

    fn get(&self, ctx: &RequestContext, name: &str) -> StorageResult<R>;

    fn list(&self, ctx: &RequestContext) -> StorageResult<ResourceList<R>>;

    fn create(&self, ctx: &RequestContext, object: &R) -> StorageResult<WriteResult<R>>;

    /// Replaces the object named by `object.metadata().name`.
    fn update(&self, ctx: &RequestContext, object: &R) -> StorageResult<WriteResult<R>>;

    fn delete(&self, ctx: &RequestContext, name: &str) -> StorageResult<WriteResult<R>>;

    fn convert_to_table(&self, object: &Object<R>) -> StorageResult<Table>;
}

/// Rejects objects addressed to a namespace other than the request's.
///
/// An empty object namespace is accepted and means "the request namespace".
pub fn ensure_namespace<R: Resource>(ctx: &RequestContext, object: &R) -> StorageResult<()> {
    let namespace = &object.metadata().namespace;
    if !namespace.is_empty() && namespace != ctx.namespace() {
        return Err(StorageError::Invalid(format!(
            "object namespace `{namespace}` does not match request namespace `{}`",
            ctx.namespace()
        )));
    }
    Ok(())
}
