//! Construction-time choice between legacy-only and dual-write storage.

use crate::apis::info::{templates_resource_info, ResourceInfo};
use crate::apis::namespace::NamespaceMapper;
use crate::config::StorageConfig;
use crate::dualwrite::{DivergenceLog, DualWriter};
use crate::generic::{CrudStrategy, SqliteResourceStore};
use crate::legacy::service::TemplateService;
use crate::legacy::storage::{template_table_converter, LegacyTemplateStorage};
use crate::model::resource::{TemplateList, TemplateResource};
use crate::rest::{Object, RequestContext, Storage, StorageResult, Table, WriteResult};
use log::info;
use std::sync::Arc;

pub type TemplateDualWriter =
    DualWriter<TemplateResource, LegacyTemplateStorage, SqliteResourceStore<TemplateResource>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageMode {
    LegacyOnly,
    DualWrite,
}

/// `Template` storage selected once by `build_template_storage`.
pub enum TemplateStorage {
    Legacy(LegacyTemplateStorage),
    DualWrite(TemplateDualWriter),
}

impl TemplateStorage {
    pub fn mode(&self) -> StorageMode {
        match self {
            Self::Legacy(_) => StorageMode::LegacyOnly,
            Self::DualWrite(_) => StorageMode::DualWrite,
        }
    }

    /// Divergence sink of the dual writer; `None` in legacy-only mode.
    pub fn divergences(&self) -> Option<&DivergenceLog> {
        match self {
            Self::Legacy(_) => None,
            Self::DualWrite(writer) => Some(writer.divergences()),
        }
    }

    fn inner(&self) -> &dyn Storage<TemplateResource> {
        match self {
            Self::Legacy(storage) => storage,
            Self::DualWrite(writer) => writer,
        }
    }
}

impl Storage<TemplateResource> for TemplateStorage {
    fn resource_info(&self) -> &ResourceInfo {
        self.inner().resource_info()
    }

    fn get(&self, ctx: &RequestContext, name: &str) -> StorageResult<TemplateResource> {
        self.inner().get(ctx, name)
    }

    fn list(&self, ctx: &RequestContext) -> StorageResult<TemplateList> {
        self.inner().list(ctx)
    }

    fn create(
        &self,
        ctx: &RequestContext,
        object: &TemplateResource,
    ) -> StorageResult<WriteResult<TemplateResource>> {
        self.inner().create(ctx, object)
    }

    fn update(
        &self,
        ctx: &RequestContext,
        object: &TemplateResource,
    ) -> StorageResult<WriteResult<TemplateResource>> {
        self.inner().update(ctx, object)
    }

    fn delete(
        &self,
        ctx: &RequestContext,
        name: &str,
    ) -> StorageResult<WriteResult<TemplateResource>> {
        self.inner().delete(ctx, name)
    }

    fn convert_to_table(&self, object: &Object<TemplateResource>) -> StorageResult<Table> {
        self.inner().convert_to_table(object)
    }
}

/// Builds the `Template` storage.
///
/// - `dual_write == false` or no `store`: legacy-only; no generic store is
///   opened.
/// - otherwise: generic store with the templates descriptor and default
///   strategy, composed with the legacy storage by a `DualWriter`.
///
/// # Errors
/// - `StorageError::Configuration` when the generic store cannot be opened.
pub fn build_template_storage(
    service: Arc<dyn TemplateService>,
    namespacer: Arc<dyn NamespaceMapper>,
    config: &StorageConfig,
) -> StorageResult<TemplateStorage> {
    let legacy = LegacyTemplateStorage::new(service, namespacer);
    let info = templates_resource_info();

    let store_options = match (config.dual_write, config.store.as_ref()) {
        (true, Some(options)) => options,
        (dual_write, _) => {
            info!(
                "event=storage_build module=factory status=ok mode=legacy resource={} dual_write={dual_write}",
                info.group_resource()
            );
            return Ok(TemplateStorage::Legacy(legacy));
        }
    };

    let store = SqliteResourceStore::new(
        info,
        CrudStrategy::new(info),
        store_options,
        template_table_converter(),
    )?;
    info!(
        "event=storage_build module=factory status=ok mode=dual_write resource={} backend={} backfill_on_read={}",
        info.group_resource(),
        store_options.describe(),
        config.backfill_on_read
    );
    Ok(TemplateStorage::DualWrite(DualWriter::new(
        legacy,
        store,
        config.dual_writer_options(),
    )))
}
