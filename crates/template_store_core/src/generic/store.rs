//! SQLite-backed generic resource store.
//!
//! # Invariants
//! - Objects are stored as JSON with storage metadata already applied.
//! - `update` with a non-empty resource version is a compare-and-swap.
//! - `list` reports the store revision at read time.

use super::options::StoreOptions;
use super::strategy::CrudStrategy;
use crate::apis::info::ResourceInfo;
use crate::model::resource::{Resource, ResourceList};
use crate::rest::{
    ensure_namespace, Object, RequestContext, Storage, StorageError, StorageResult, Table,
    TableConverter, WriteResult,
};
use log::{debug, error, info};
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use std::sync::{Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};

pub struct SqliteResourceStore<R> {
    info: ResourceInfo,
    strategy: CrudStrategy<R>,
    table: TableConverter<R>,
    conn: Mutex<Connection>,
}

impl<R: Resource> SqliteResourceStore<R> {
    /// Opens the backing store described by `options`.
    ///
    /// # Errors
    /// - `StorageError::Configuration` when the backing store cannot be
    ///   opened or migrated.
    pub fn new(
        info: ResourceInfo,
        strategy: CrudStrategy<R>,
        options: &StoreOptions,
        table: TableConverter<R>,
    ) -> StorageResult<Self> {
        let conn = options.open().map_err(|err| {
            error!(
                "event=store_open module=generic status=error resource={} backend={} error={}",
                info.group_resource(),
                options.describe(),
                err
            );
            StorageError::Configuration(format!(
                "failed to open generic store `{}` for {}: {err}",
                options.describe(),
                info.group_resource()
            ))
        })?;
        info!(
            "event=store_open module=generic status=ok resource={} backend={}",
            info.group_resource(),
            options.describe()
        );
        Ok(Self::from_connection(info, strategy, conn, table))
    }

    /// Wraps a connection that already has migrations applied.
    pub fn from_connection(
        info: ResourceInfo,
        strategy: CrudStrategy<R>,
        conn: Connection,
        table: TableConverter<R>,
    ) -> Self {
        Self {
            info,
            strategy,
            table,
            conn: Mutex::new(conn),
        }
    }

    fn conn(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StorageError::Internal("generic store connection lock poisoned".into()))
    }

    fn load(&self, conn: &Connection, namespace: &str, name: &str) -> StorageResult<Option<R>> {
        let json = conn
            .query_row(
                "SELECT object_json FROM resource_objects
                 WHERE api_group = ?1 AND resource = ?2 AND namespace = ?3 AND name = ?4;",
                params![self.info.group, self.info.resource, namespace, name],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        json.map(|json| decode(&json)).transpose()
    }

    fn write(&self, tx: &Transaction<'_>, object: &R) -> StorageResult<()> {
        let meta = object.metadata();
        let revision: i64 = meta.resource_version.parse().map_err(|_| {
            StorageError::Internal(format!(
                "resource version `{}` is not numeric",
                meta.resource_version
            ))
        })?;
        let json = serde_json::to_string(object).map_err(StorageError::backend)?;
        tx.execute(
            "INSERT INTO resource_objects
                (api_group, resource, namespace, name, resource_version, object_json)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT (api_group, resource, namespace, name) DO UPDATE SET
                resource_version = excluded.resource_version,
                object_json = excluded.object_json;",
            params![
                self.info.group,
                self.info.resource,
                meta.namespace.as_str(),
                meta.name.as_str(),
                revision,
                json,
            ],
        )?;
        Ok(())
    }

    fn scoped(&self, ctx: &RequestContext, object: &R) -> StorageResult<R> {
        ensure_namespace(ctx, object)?;
        let mut scoped = object.clone();
        scoped.metadata_mut().namespace = ctx.namespace().to_string();
        self.strategy.validate(&scoped)?;
        Ok(scoped)
    }

    fn not_found(&self, name: &str) -> StorageError {
        StorageError::not_found(self.info.group_resource(), name)
    }
}

impl<R: Resource> Storage<R> for SqliteResourceStore<R> {
    fn resource_info(&self) -> &ResourceInfo {
        &self.info
    }

    fn get(&self, ctx: &RequestContext, name: &str) -> StorageResult<R> {
        ctx.check()?;
        let conn = self.conn()?;
        self.load(&conn, ctx.namespace(), name)?
            .ok_or_else(|| self.not_found(name))
    }

    fn list(&self, ctx: &RequestContext) -> StorageResult<ResourceList<R>> {
        ctx.check()?;
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let revision = current_revision(&tx)?;
        let items = {
            let mut stmt = tx.prepare(
                "SELECT object_json FROM resource_objects
                 WHERE api_group = ?1 AND resource = ?2 AND namespace = ?3
                 ORDER BY name ASC;",
            )?;
            let mut rows =
                stmt.query(params![self.info.group, self.info.resource, ctx.namespace()])?;
            let mut items = Vec::new();
            while let Some(row) = rows.next()? {
                items.push(decode(&row.get::<_, String>(0)?)?);
            }
            items
        };
        tx.commit()?;

        Ok(ResourceList {
            resource_version: revision.to_string(),
            items,
        })
    }

    fn create(&self, ctx: &RequestContext, object: &R) -> StorageResult<WriteResult<R>> {
        let mut object = self.scoped(ctx, object)?;
        ctx.check()?;

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        if self.load(&tx, ctx.namespace(), object.name())?.is_some() {
            return Err(StorageError::conflict(
                self.info.group_resource(),
                object.name(),
                "already exists in generic store",
            ));
        }

        self.strategy.prepare_for_create(&mut object, now_epoch_ms());
        object.metadata_mut().resource_version = next_revision(&tx)?.to_string();
        self.write(&tx, &object)?;
        tx.commit()?;

        debug!(
            "event=store_write module=generic status=ok op=create resource={} namespace={} name={} rv={}",
            self.info.group_resource(),
            ctx.namespace(),
            object.name(),
            object.metadata().resource_version
        );
        Ok(WriteResult::new(object))
    }

    fn update(&self, ctx: &RequestContext, object: &R) -> StorageResult<WriteResult<R>> {
        let mut object = self.scoped(ctx, object)?;
        ctx.check()?;

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let existing = self
            .load(&tx, ctx.namespace(), object.name())?
            .ok_or_else(|| self.not_found(object.name()))?;

        let expected = &object.metadata().resource_version;
        let stored = &existing.metadata().resource_version;
        if !expected.is_empty() && expected != stored {
            return Err(StorageError::conflict(
                self.info.group_resource(),
                object.name(),
                format!("resource version {expected} is stale, current is {stored}"),
            ));
        }

        self.strategy.prepare_for_update(&mut object, &existing);
        object.metadata_mut().resource_version = next_revision(&tx)?.to_string();
        self.write(&tx, &object)?;
        tx.commit()?;

        debug!(
            "event=store_write module=generic status=ok op=update resource={} namespace={} name={} rv={}",
            self.info.group_resource(),
            ctx.namespace(),
            object.name(),
            object.metadata().resource_version
        );
        Ok(WriteResult::new(object))
    }

    fn delete(&self, ctx: &RequestContext, name: &str) -> StorageResult<WriteResult<R>> {
        ctx.check()?;

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let existing = self
            .load(&tx, ctx.namespace(), name)?
            .ok_or_else(|| self.not_found(name))?;
        tx.execute(
            "DELETE FROM resource_objects
             WHERE api_group = ?1 AND resource = ?2 AND namespace = ?3 AND name = ?4;",
            params![self.info.group, self.info.resource, ctx.namespace(), name],
        )?;
        next_revision(&tx)?;
        tx.commit()?;

        debug!(
            "event=store_write module=generic status=ok op=delete resource={} namespace={} name={name}",
            self.info.group_resource(),
            ctx.namespace()
        );
        Ok(WriteResult::new(existing))
    }

    fn convert_to_table(&self, object: &Object<R>) -> StorageResult<Table> {
        self.table.convert_to_table(object)
    }
}

fn decode<R: Resource>(json: &str) -> StorageResult<R> {
    serde_json::from_str(json).map_err(StorageError::backend)
}

fn current_revision(conn: &Connection) -> StorageResult<i64> {
    let revision = conn.query_row(
        "SELECT revision FROM resource_revision WHERE id = 1;",
        [],
        |row| row.get::<_, i64>(0),
    )?;
    Ok(revision)
}

fn next_revision(tx: &Transaction<'_>) -> StorageResult<i64> {
    tx.execute(
        "UPDATE resource_revision SET revision = revision + 1 WHERE id = 1;",
        [],
    )?;
    current_revision(tx)
}

fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or_default()
}
