//! Default create/update/delete strategy for generic-store objects.
//!
//! # Invariants
//! - `uid` and `creationTimestamp` are assigned once, at create.
//! - `generation` starts at 1 and moves only when the spec changes.
//! - Callers never choose the resource version of a new object.

use crate::apis::info::ResourceInfo;
use crate::model::resource::Resource;
use crate::rest::{StorageError, StorageResult};
use std::marker::PhantomData;
use uuid::Uuid;

const MAX_NAME_LEN: usize = 253;

pub struct CrudStrategy<R> {
    info: ResourceInfo,
    _resource: PhantomData<fn() -> R>,
}

impl<R> Clone for CrudStrategy<R> {
    fn clone(&self) -> Self {
        Self::new(self.info)
    }
}

impl<R> CrudStrategy<R> {
    pub fn new(info: ResourceInfo) -> Self {
        Self {
            info,
            _resource: PhantomData,
        }
    }
}

impl<R: Resource> CrudStrategy<R> {
    pub fn validate(&self, object: &R) -> StorageResult<()> {
        let meta = object.metadata();
        if meta.name.is_empty() {
            return Err(StorageError::Invalid(format!(
                "{} name is required",
                self.info.singular
            )));
        }
        if meta.name.len() > MAX_NAME_LEN {
            return Err(StorageError::Invalid(format!(
                "{} name must be at most {MAX_NAME_LEN} bytes",
                self.info.singular
            )));
        }
        if meta.name.contains('/') {
            return Err(StorageError::Invalid(format!(
                "{} name `{}` must not contain `/`",
                self.info.singular, meta.name
            )));
        }
        if meta.namespace.is_empty() {
            return Err(StorageError::Invalid(format!(
                "{} `{}` has no namespace",
                self.info.singular, meta.name
            )));
        }
        Ok(())
    }

    pub fn prepare_for_create(&self, object: &mut R, now_ms: i64) {
        let meta = object.metadata_mut();
        meta.uid = Uuid::new_v4().to_string();
        meta.generation = 1;
        meta.creation_timestamp = Some(now_ms);
        meta.resource_version.clear();
    }

    pub fn prepare_for_update(&self, object: &mut R, old: &R) {
        let generation = if object.same_spec(old) {
            old.metadata().generation
        } else {
            old.metadata().generation + 1
        };
        let old_meta = old.metadata();
        let meta = object.metadata_mut();
        meta.uid = old_meta.uid.clone();
        meta.creation_timestamp = old_meta.creation_timestamp;
        meta.generation = generation;
    }
}
