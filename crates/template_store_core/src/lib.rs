//! Notification template storage for the migration from the legacy template
//! service to the generic resource store.
//! Callers see one `Template` resource whichever backend is authoritative.

pub mod apis;
pub mod config;
pub mod convert;
pub mod db;
pub mod dualwrite;
pub mod factory;
pub mod generic;
pub mod legacy;
pub mod logging;
pub mod model;
pub mod rest;

pub use apis::info::{templates_resource_info, GroupResource, ResourceInfo};
pub use apis::namespace::{NamespaceError, NamespaceMapper, OrgNamespaceMapper};
pub use config::{ConfigError, StorageConfig};
pub use dualwrite::{Divergence, DivergenceKind, DivergenceLog, DualWriter, DualWriterOptions};
pub use factory::{build_template_storage, StorageMode, TemplateDualWriter, TemplateStorage};
pub use generic::{CrudStrategy, SqliteResourceStore, StoreOptions};
pub use legacy::service::{LegacyError, LegacyResult, SqliteTemplateService, TemplateService};
pub use legacy::storage::{template_table_converter, LegacyTemplateStorage};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::resource::{
    ObjectMeta, Resource, ResourceList, TemplateList, TemplateResource, TemplateSpec, TypeMeta,
    PROVENANCE_ANNOTATION,
};
pub use model::template::{NotificationTemplate, Provenance, TemplateValidationError};
pub use rest::{
    CancellationToken, Object, Operation, RequestContext, Status, Storage, StorageError,
    StorageResult, Table, WriteResult, WriteWarning,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
