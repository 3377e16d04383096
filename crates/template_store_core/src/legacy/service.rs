//! Legacy template service contract and SQLite implementation.
//!
//! # Invariants
//! - Writes call `NotificationTemplate::validate()` before SQL mutations.
//! - Reads reject rows with unknown provenance instead of masking them.
//! - Create never overwrites; update and delete never create.

use crate::db::{open_db, open_db_in_memory, DbError, DbResult};
use crate::model::template::{NotificationTemplate, Provenance, TemplateValidationError};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

pub type LegacyResult<T> = Result<T, LegacyError>;

#[derive(Debug)]
pub enum LegacyError {
    NotFound(String),
    Conflict(String),
    Validation(TemplateValidationError),
    InvalidData(String),
    Db(DbError),
    LockPoisoned,
}

impl Display for LegacyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(name) => write!(f, "template not found: {name}"),
            Self::Conflict(name) => write!(f, "template already exists: {name}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted template data: {message}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::LockPoisoned => write!(f, "template store connection lock poisoned"),
        }
    }
}

impl Error for LegacyError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound(_) | Self::Conflict(_) | Self::InvalidData(_) | Self::LockPoisoned => {
                None
            }
        }
    }
}

impl From<TemplateValidationError> for LegacyError {
    fn from(value: TemplateValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for LegacyError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for LegacyError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// CRUD-by-name over legacy templates, scoped by org id.
pub trait TemplateService: Send + Sync {
    fn get_templates(&self, org_id: i64) -> LegacyResult<Vec<NotificationTemplate>>;

    fn get_template(&self, org_id: i64, name: &str) -> LegacyResult<NotificationTemplate>;

    fn create_template(
        &self,
        org_id: i64,
        template: &NotificationTemplate,
    ) -> LegacyResult<NotificationTemplate>;

    fn update_template(
        &self,
        org_id: i64,
        template: &NotificationTemplate,
    ) -> LegacyResult<NotificationTemplate>;

    fn delete_template(&self, org_id: i64, name: &str) -> LegacyResult<()>;
}

/// SQLite-backed legacy template service.
pub struct SqliteTemplateService {
    conn: Mutex<Connection>,
}

impl SqliteTemplateService {
    /// Wraps a connection that already has migrations applied.
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    pub fn open(path: impl AsRef<Path>) -> DbResult<Self> {
        open_db(path).map(Self::new)
    }

    pub fn open_in_memory() -> DbResult<Self> {
        open_db_in_memory().map(Self::new)
    }

    fn conn(&self) -> LegacyResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| LegacyError::LockPoisoned)
    }
}

impl TemplateService for SqliteTemplateService {
    fn get_templates(&self, org_id: i64) -> LegacyResult<Vec<NotificationTemplate>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT name, template, provenance
             FROM notification_templates
             WHERE org_id = ?1
             ORDER BY name ASC;",
        )?;
        let mut rows = stmt.query([org_id])?;
        let mut templates = Vec::new();
        while let Some(row) = rows.next()? {
            templates.push(parse_template_row(row)?);
        }
        Ok(templates)
    }

    fn get_template(&self, org_id: i64, name: &str) -> LegacyResult<NotificationTemplate> {
        let conn = self.conn()?;
        let raw = conn
            .query_row(
                "SELECT name, template, provenance
                 FROM notification_templates
                 WHERE org_id = ?1 AND name = ?2;",
                params![org_id, name],
                |row| {
                    Ok((
                        row.get::<_, String>("name")?,
                        row.get::<_, String>("template")?,
                        row.get::<_, String>("provenance")?,
                    ))
                },
            )
            .optional()?;

        match raw {
            Some((name, template, provenance)) => build_template(name, template, &provenance),
            None => Err(LegacyError::NotFound(name.to_string())),
        }
    }

    fn create_template(
        &self,
        org_id: i64,
        template: &NotificationTemplate,
    ) -> LegacyResult<NotificationTemplate> {
        template.validate()?;

        let conn = self.conn()?;
        let changed = conn.execute(
            "INSERT INTO notification_templates (org_id, name, template, provenance)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (org_id, name) DO NOTHING;",
            params![
                org_id,
                template.name.as_str(),
                template.template.as_str(),
                template.provenance.as_str(),
            ],
        )?;

        if changed == 0 {
            return Err(LegacyError::Conflict(template.name.clone()));
        }
        Ok(template.clone())
    }

    fn update_template(
        &self,
        org_id: i64,
        template: &NotificationTemplate,
    ) -> LegacyResult<NotificationTemplate> {
        template.validate()?;

        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE notification_templates
             SET
                template = ?1,
                provenance = ?2,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE org_id = ?3 AND name = ?4;",
            params![
                template.template.as_str(),
                template.provenance.as_str(),
                org_id,
                template.name.as_str(),
            ],
        )?;

        if changed == 0 {
            return Err(LegacyError::NotFound(template.name.clone()));
        }
        Ok(template.clone())
    }

    fn delete_template(&self, org_id: i64, name: &str) -> LegacyResult<()> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "DELETE FROM notification_templates WHERE org_id = ?1 AND name = ?2;",
            params![org_id, name],
        )?;

        if changed == 0 {
            return Err(LegacyError::NotFound(name.to_string()));
        }
        Ok(())
    }
}

fn parse_template_row(row: &Row<'_>) -> LegacyResult<NotificationTemplate> {
    let provenance: String = row.get("provenance")?;
    build_template(row.get("name")?, row.get("template")?, &provenance)
}

fn build_template(
    name: String,
    template: String,
    provenance: &str,
) -> LegacyResult<NotificationTemplate> {
    let provenance = Provenance::parse(provenance).ok_or_else(|| {
        LegacyError::InvalidData(format!(
            "invalid provenance `{provenance}` in notification_templates.provenance"
        ))
    })?;
    Ok(NotificationTemplate {
        name,
        template,
        provenance,
    })
}
