//! `Storage` adapter over the legacy template service.
//!
//! # Responsibility
//! - Resolve the request namespace to an org id.
//! - Translate every call through the domain converter.
//! - Pass legacy error classes through as storage error classes.

use super::service::{LegacyError, TemplateService};
use crate::apis::info::{templates_resource_info, ResourceInfo};
use crate::apis::namespace::NamespaceMapper;
use crate::convert::{to_domain, to_resource, to_resource_list};
use crate::model::resource::{TemplateList, TemplateResource};
use crate::rest::{
    ensure_namespace, Object, RequestContext, Storage, StorageError, StorageResult, Table,
    TableColumnDefinition, TableConverter, WriteResult,
};
use log::{debug, error};
use serde_json::Value;
use std::sync::Arc;

/// Table converter shared by every `Template` storage: one `Name` column.
pub fn template_table_converter() -> TableConverter<TemplateResource> {
    TableConverter::new(
        templates_resource_info().group_resource(),
        vec![TableColumnDefinition::new("Name", "string", "name")],
        |object: &Object<TemplateResource>| match object {
            Object::Item(template) => Ok(vec![Value::String(template.metadata.name.clone())]),
            other => Err(StorageError::TypeMismatch {
                expected: "Template",
                found: other.kind_name(),
            }),
        },
    )
}

/// Legacy-only `Template` storage.
pub struct LegacyTemplateStorage {
    info: ResourceInfo,
    service: Arc<dyn TemplateService>,
    namespacer: Arc<dyn NamespaceMapper>,
    table: TableConverter<TemplateResource>,
}

impl LegacyTemplateStorage {
    pub fn new(service: Arc<dyn TemplateService>, namespacer: Arc<dyn NamespaceMapper>) -> Self {
        Self {
            info: templates_resource_info(),
            service,
            namespacer,
            table: template_table_converter(),
        }
    }

    pub fn table_converter(&self) -> &TableConverter<TemplateResource> {
        &self.table
    }

    fn org_id(&self, ctx: &RequestContext) -> StorageResult<i64> {
        self.namespacer
            .org_id(ctx.namespace())
            .map_err(|err| StorageError::Invalid(err.to_string()))
    }

    fn map_error(
        &self,
        op: &str,
        ctx: &RequestContext,
        name: &str,
        err: LegacyError,
    ) -> StorageError {
        let resource = self.info.group_resource();
        let mapped = match err {
            LegacyError::NotFound(name) => StorageError::not_found(resource, name),
            LegacyError::Conflict(name) => {
                StorageError::conflict(resource, name, "already exists in legacy store")
            }
            LegacyError::Validation(err) => StorageError::Invalid(err.to_string()),
            other => StorageError::backend(other),
        };
        if mapped.is_not_found() {
            debug!(
                "event=legacy_storage module=legacy status=not_found op={op} namespace={} name={name}",
                ctx.namespace()
            );
        } else {
            error!(
                "event=legacy_storage module=legacy status=error op={op} namespace={} name={name} error={mapped}",
                ctx.namespace()
            );
        }
        mapped
    }
}

impl Storage<TemplateResource> for LegacyTemplateStorage {
    fn resource_info(&self) -> &ResourceInfo {
        &self.info
    }

    fn get(&self, ctx: &RequestContext, name: &str) -> StorageResult<TemplateResource> {
        let org_id = self.org_id(ctx)?;
        ctx.check()?;
        let template = self
            .service
            .get_template(org_id, name)
            .map_err(|err| self.map_error("get", ctx, name, err))?;
        Ok(to_resource(org_id, &template, self.namespacer.as_ref()))
    }

    fn list(&self, ctx: &RequestContext) -> StorageResult<TemplateList> {
        let org_id = self.org_id(ctx)?;
        ctx.check()?;
        let templates = self
            .service
            .get_templates(org_id)
            .map_err(|err| self.map_error("list", ctx, "", err))?;
        Ok(to_resource_list(org_id, &templates, self.namespacer.as_ref()))
    }

    fn create(
        &self,
        ctx: &RequestContext,
        object: &TemplateResource,
    ) -> StorageResult<WriteResult<TemplateResource>> {
        ensure_namespace(ctx, object)?;
        let org_id = self.org_id(ctx)?;
        ctx.check()?;
        let created = self
            .service
            .create_template(org_id, &to_domain(object))
            .map_err(|err| self.map_error("create", ctx, &object.metadata.name, err))?;
        Ok(WriteResult::new(to_resource(
            org_id,
            &created,
            self.namespacer.as_ref(),
        )))
    }

    fn update(
        &self,
        ctx: &RequestContext,
        object: &TemplateResource,
    ) -> StorageResult<WriteResult<TemplateResource>> {
        ensure_namespace(ctx, object)?;
        let org_id = self.org_id(ctx)?;
        ctx.check()?;
        let updated = self
            .service
            .update_template(org_id, &to_domain(object))
            .map_err(|err| self.map_error("update", ctx, &object.metadata.name, err))?;
        Ok(WriteResult::new(to_resource(
            org_id,
            &updated,
            self.namespacer.as_ref(),
        )))
    }

    fn delete(
        &self,
        ctx: &RequestContext,
        name: &str,
    ) -> StorageResult<WriteResult<TemplateResource>> {
        let existing = self.get(ctx, name)?;
        let org_id = self.org_id(ctx)?;
        ctx.check()?;
        self.service
            .delete_template(org_id, name)
            .map_err(|err| self.map_error("delete", ctx, name, err))?;
        Ok(WriteResult::new(existing))
    }

    fn convert_to_table(&self, object: &Object<TemplateResource>) -> StorageResult<Table> {
        self.table.convert_to_table(object)
    }
}
