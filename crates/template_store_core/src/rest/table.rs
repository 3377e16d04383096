//! Tabular rendering for list views.
//!
//! # Invariants
//! - Every row has exactly one cell per column definition.
//! - Lists render one row per item, in list order.

use super::error::{Status, StorageError, StorageResult};
use crate::apis::info::GroupResource;
use crate::model::resource::{Resource, ResourceList};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// Any object a storage may hand back to the serving layer.
#[derive(Debug, Clone)]
pub enum Object<R> {
    Item(R),
    List(ResourceList<R>),
    Status(Status),
}

impl<R> Object<R> {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Item(_) => "item",
            Self::List(_) => "list",
            Self::Status(_) => "status",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableColumnDefinition {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub format: String,
}

impl TableColumnDefinition {
    pub fn new(
        name: impl Into<String>,
        column_type: impl Into<String>,
        format: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            column_type: column_type.into(),
            format: format.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableRow {
    pub cells: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    pub column_definitions: Vec<TableColumnDefinition>,
    pub rows: Vec<TableRow>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub resource_version: String,
}

type CellsFn<R> = dyn Fn(&Object<R>) -> StorageResult<Vec<Value>> + Send + Sync;

/// Converts single objects and lists into a `Table` with fixed columns.
pub struct TableConverter<R> {
    resource: GroupResource,
    columns: Vec<TableColumnDefinition>,
    cells: Arc<CellsFn<R>>,
}

impl<R> Clone for TableConverter<R> {
    fn clone(&self) -> Self {
        Self {
            resource: self.resource,
            columns: self.columns.clone(),
            cells: Arc::clone(&self.cells),
        }
    }
}

impl<R: Resource> TableConverter<R> {
    /// `cells` receives one `Object::Item` per row and must return exactly
    /// one value per column.
    pub fn new(
        resource: GroupResource,
        columns: Vec<TableColumnDefinition>,
        cells: impl Fn(&Object<R>) -> StorageResult<Vec<Value>> + Send + Sync + 'static,
    ) -> Self {
        Self {
            resource,
            columns,
            cells: Arc::new(cells),
        }
    }

    pub fn resource(&self) -> GroupResource {
        self.resource
    }

    pub fn columns(&self) -> &[TableColumnDefinition] {
        &self.columns
    }

    pub fn convert_to_table(&self, object: &Object<R>) -> StorageResult<Table> {
        let (rows, resource_version) = match object {
            Object::List(list) => {
                let rows = list
                    .items
                    .iter()
                    .map(|item| self.row(&Object::Item(item.clone())))
                    .collect::<StorageResult<Vec<_>>>()?;
                (rows, list.resource_version.clone())
            }
            Object::Item(item) => (
                vec![self.row(object)?],
                item.metadata().resource_version.clone(),
            ),
            Object::Status(_) => (vec![self.row(object)?], String::new()),
        };

        Ok(Table {
            column_definitions: self.columns.clone(),
            rows,
            resource_version,
        })
    }

    fn row(&self, object: &Object<R>) -> StorageResult<TableRow> {
        let cells = (self.cells)(object)?;
        if cells.len() != self.columns.len() {
            return Err(StorageError::Internal(format!(
                "{} table row has {} cells for {} columns",
                self.resource,
                cells.len(),
                self.columns.len()
            )));
        }
        Ok(TableRow { cells })
    }
}
