//! Dual-write coordinator over a legacy storage and a generic store.
//!
//! # Responsibility
//! - Apply every write to the legacy storage first, then replay the legacy
//!   result into the generic store.
//! - Serve reads from the generic copy while the legacy store decides
//!   whether an object exists and what its spec and annotations are.
//! - Report every observed divergence through logs and a `DivergenceLog`.
//!
//! # Invariants
//! - The legacy store is authoritative. A generic-store failure never fails
//!   or rolls back a write whose legacy step succeeded.
//! - A failed legacy write never writes to the generic store.
//! - A stale `resourceVersion` on update is rejected before legacy is
//!   touched; once legacy accepts an update the generic copy follows it
//!   without a precondition.
//! - Reads never return content that contradicts the legacy copy.
//! - An object present in legacy is never reported as not found.
//! - An object present only in the generic store surfaces as
//!   `StorageError::Corrupted` from get, list and delete; it is not repaired.
//! - Cancellation and deadline errors propagate from reads and from the
//!   legacy step of a write. After legacy commits, a cancelled generic step
//!   is a secondary failure like any other.
//! - No locking and no retries are added on top of either backend.

pub mod divergence;

pub use divergence::{Divergence, DivergenceKind, DivergenceLog};

use crate::apis::info::ResourceInfo;
use crate::model::resource::{Resource, ResourceList};
use crate::rest::{
    Object, Operation, RequestContext, Storage, StorageError, StorageResult, Table, WriteResult,
    WriteWarning,
};
use log::{debug, warn};
use std::collections::HashMap;
use std::marker::PhantomData;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DualWriterOptions {
    /// Copy legacy-only objects into the generic store when they are read.
    pub backfill_on_read: bool,
}

pub struct DualWriter<R, L, G> {
    legacy: L,
    storage: G,
    options: DualWriterOptions,
    divergences: DivergenceLog,
    _resource: PhantomData<fn() -> R>,
}

impl<R, L, G> DualWriter<R, L, G>
where
    R: Resource,
    L: Storage<R>,
    G: Storage<R>,
{
    pub fn new(legacy: L, storage: G, options: DualWriterOptions) -> Self {
        Self {
            legacy,
            storage,
            options,
            divergences: DivergenceLog::new(),
            _resource: PhantomData,
        }
    }

    /// Replaces the divergence sink, e.g. to share one across resources.
    pub fn with_divergence_log(mut self, divergences: DivergenceLog) -> Self {
        self.divergences = divergences;
        self
    }

    pub fn legacy(&self) -> &L {
        &self.legacy
    }

    pub fn storage(&self) -> &G {
        &self.storage
    }

    pub fn options(&self) -> DualWriterOptions {
        self.options
    }

    pub fn divergences(&self) -> &DivergenceLog {
        &self.divergences
    }

    fn report(&self, ctx: &RequestContext, name: &str, kind: DivergenceKind, detail: String) {
        warn!(
            "event=dual_write_divergence module=dualwrite status=warn kind={} resource={} namespace={} name={} detail={}",
            kind.as_str(),
            self.legacy.resource_info().group_resource(),
            ctx.namespace(),
            name,
            detail
        );
        self.divergences.record(Divergence {
            kind,
            namespace: ctx.namespace().to_string(),
            name: name.to_string(),
            detail,
        });
    }

    /// Attaches a secondary failure to an otherwise successful write.
    fn secondary_failed(
        &self,
        ctx: &RequestContext,
        operation: Operation,
        mut result: WriteResult<R>,
        err: StorageError,
    ) -> WriteResult<R> {
        let name = result.object.name().to_string();
        self.report(
            ctx,
            &name,
            DivergenceKind::SecondaryWriteFailed(operation),
            err.to_string(),
        );
        result.warnings.push(WriteWarning::SecondaryWriteFailed {
            operation,
            name,
            reason: err.to_string(),
        });
        result
    }

    /// Resolves one object that the legacy store holds.
    ///
    /// Returns the object to serve and whether it is the generic copy
    /// verbatim.
    fn reconcile_read(
        &self,
        ctx: &RequestContext,
        legacy: R,
        secondary: StorageResult<R>,
    ) -> StorageResult<(R, bool)> {
        match secondary {
            Ok(mut stored) => {
                let mut verbatim = true;
                if !legacy.same_spec(&stored) {
                    self.report(
                        ctx,
                        legacy.name(),
                        DivergenceKind::SpecMismatch,
                        "generic copy differs from legacy copy".to_string(),
                    );
                    verbatim = false;
                }
                if !annotations_match(&legacy, &stored) {
                    self.report(
                        ctx,
                        legacy.name(),
                        DivergenceKind::AnnotationMismatch,
                        "generic copy carries stale legacy annotations".to_string(),
                    );
                    verbatim = false;
                }
                if !verbatim {
                    stored.adopt_content(&legacy);
                }
                Ok((stored, verbatim))
            }
            Err(err) if err.is_cancellation() => Err(err),
            Err(err) if err.is_not_found() => Ok(self.backfill(ctx, legacy)),
            Err(err) => {
                self.report(
                    ctx,
                    legacy.name(),
                    DivergenceKind::SecondaryReadFailed,
                    err.to_string(),
                );
                Ok((legacy, false))
            }
        }
    }

    fn backfill(&self, ctx: &RequestContext, legacy: R) -> (R, bool) {
        if !self.options.backfill_on_read {
            return (legacy, false);
        }
        match self.storage.create(ctx, &legacy) {
            Ok(created) => {
                debug!(
                    "event=dual_write_backfill module=dualwrite status=ok namespace={} name={}",
                    ctx.namespace(),
                    legacy.name()
                );
                (created.object, false)
            }
            Err(err) => {
                self.report(
                    ctx,
                    legacy.name(),
                    DivergenceKind::BackfillFailed,
                    err.to_string(),
                );
                (legacy, false)
            }
        }
    }

    fn corrupted(&self, ctx: &RequestContext, names: Vec<String>) -> StorageError {
        for name in &names {
            self.report(
                ctx,
                name,
                DivergenceKind::MissingInLegacy,
                "object exists only in generic store".to_string(),
            );
        }
        StorageError::Corrupted {
            resource: self.legacy.resource_info().group_resource(),
            names,
        }
    }

    /// Turns a legacy `NotFound` into `Corrupted` when the generic store
    /// still holds the name. Only reads the generic store.
    fn check_missing_in_legacy(
        &self,
        ctx: &RequestContext,
        name: &str,
        not_found: StorageError,
    ) -> StorageError {
        match self.storage.get(ctx, name) {
            Ok(_) => self.corrupted(ctx, vec![name.to_string()]),
            Err(secondary) if secondary.is_cancellation() => secondary,
            Err(_) => not_found,
        }
    }

    /// Rejects an update whose resource version is stale against the
    /// generic copy, before the legacy store is touched.
    fn check_precondition(&self, ctx: &RequestContext, object: &R) -> StorageResult<()> {
        let expected = &object.metadata().resource_version;
        if expected.is_empty() {
            return Ok(());
        }
        match self.storage.get(ctx, object.name()) {
            Ok(current) if current.metadata().resource_version != *expected => {
                Err(StorageError::conflict(
                    self.legacy.resource_info().group_resource(),
                    object.name(),
                    format!(
                        "resource version {expected} is stale, current is {}",
                        current.metadata().resource_version
                    ),
                ))
            }
            Ok(_) => Ok(()),
            Err(err) if err.is_cancellation() => Err(err),
            // Not migrated yet; legacy carries no versions to compare.
            Err(err) if err.is_not_found() => Ok(()),
            Err(err) => {
                self.report(
                    ctx,
                    object.name(),
                    DivergenceKind::SecondaryReadFailed,
                    format!("precondition not checked: {err}"),
                );
                Ok(())
            }
        }
    }
}

impl<R, L, G> Storage<R> for DualWriter<R, L, G>
where
    R: Resource,
    L: Storage<R>,
    G: Storage<R>,
{
    fn resource_info(&self) -> &ResourceInfo {
        self.legacy.resource_info()
    }

    fn get(&self, ctx: &RequestContext, name: &str) -> StorageResult<R> {
        match self.legacy.get(ctx, name) {
            Ok(legacy) => {
                let secondary = self.storage.get(ctx, name);
                self.reconcile_read(ctx, legacy, secondary)
                    .map(|(object, _)| object)
            }
            Err(err) if err.is_not_found() => Err(self.check_missing_in_legacy(ctx, name, err)),
            Err(err) => Err(err),
        }
    }

    fn list(&self, ctx: &RequestContext) -> StorageResult<ResourceList<R>> {
        let legacy = self.legacy.list(ctx)?;
        let resource = self.resource_info().group_resource();
        let secondary = match self.storage.list(ctx) {
            Ok(list) => list,
            Err(err) if err.is_cancellation() => return Err(err),
            Err(err) => {
                self.report(
                    ctx,
                    &resource.to_string(),
                    DivergenceKind::SecondaryReadFailed,
                    format!("list: {err}"),
                );
                return Ok(legacy);
            }
        };

        let mut stored: HashMap<String, R> = secondary
            .items
            .into_iter()
            .map(|item| (item.name().to_string(), item))
            .collect();
        let mut items = Vec::with_capacity(legacy.items.len());
        let mut all_verbatim = true;
        for item in legacy.items {
            let found = stored
                .remove(item.name())
                .ok_or_else(|| StorageError::not_found(resource, item.name()));
            let (object, verbatim) = self.reconcile_read(ctx, item, found)?;
            all_verbatim &= verbatim;
            items.push(object);
        }

        if !stored.is_empty() {
            let mut orphans: Vec<String> = stored.into_keys().collect();
            orphans.sort();
            return Err(self.corrupted(ctx, orphans));
        }

        // The generic revision only describes the list when every item came
        // from the generic store unchanged.
        let resource_version = if all_verbatim {
            secondary.resource_version
        } else {
            String::new()
        };
        Ok(ResourceList {
            resource_version,
            items,
        })
    }

    fn create(&self, ctx: &RequestContext, object: &R) -> StorageResult<WriteResult<R>> {
        let created = self.legacy.create(ctx, object)?;
        match self.storage.create(ctx, &created.object) {
            Ok(stored) => Ok(WriteResult {
                object: stored.object,
                warnings: created.warnings,
            }),
            Err(err) => Ok(self.secondary_failed(ctx, Operation::Create, created, err)),
        }
    }

    fn update(&self, ctx: &RequestContext, object: &R) -> StorageResult<WriteResult<R>> {
        self.check_precondition(ctx, object)?;
        let updated = self.legacy.update(ctx, object)?;

        // Legacy already accepted the write; the generic copy follows it
        // unconditionally.
        let mut replay = updated.object.clone();
        replay.metadata_mut().resource_version.clear();

        let stored = match self.storage.update(ctx, &replay) {
            Err(err) if err.is_not_found() => {
                debug!(
                    "event=dual_write_update module=dualwrite status=migrating namespace={} name={}",
                    ctx.namespace(),
                    replay.name()
                );
                self.storage.create(ctx, &replay)
            }
            other => other,
        };

        match stored {
            Ok(stored) => Ok(WriteResult {
                object: stored.object,
                warnings: updated.warnings,
            }),
            Err(err) => Ok(self.secondary_failed(ctx, Operation::Update, updated, err)),
        }
    }

    fn delete(&self, ctx: &RequestContext, name: &str) -> StorageResult<WriteResult<R>> {
        let deleted = match self.legacy.delete(ctx, name) {
            Ok(deleted) => deleted,
            Err(err) if err.is_not_found() => {
                return Err(self.check_missing_in_legacy(ctx, name, err))
            }
            Err(err) => return Err(err),
        };
        match self.storage.delete(ctx, name) {
            Ok(_) => Ok(deleted),
            Err(err) if err.is_not_found() => {
                debug!(
                    "event=dual_write_delete module=dualwrite status=unmigrated namespace={} name={name}",
                    ctx.namespace()
                );
                Ok(deleted)
            }
            Err(err) => Ok(self.secondary_failed(ctx, Operation::Delete, deleted, err)),
        }
    }

    fn convert_to_table(&self, object: &Object<R>) -> StorageResult<Table> {
        self.legacy.convert_to_table(object)
    }
}

/// Legacy-owned annotations must match on the generic copy.
fn annotations_match<R: Resource>(legacy: &R, stored: &R) -> bool {
    let stored = &stored.metadata().annotations;
    legacy
        .metadata()
        .annotations
        .iter()
        .all(|(key, value)| stored.get(key) == Some(value))
}
