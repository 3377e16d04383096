//! Backing-store selection for the generic store.

use crate::db::{open_db, open_db_in_memory, DbResult};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum StoreOptions {
    /// SQLite database file; created when missing.
    Sqlite { path: PathBuf },
    /// Private in-memory database, lost when the store is dropped.
    Memory,
}

impl StoreOptions {
    pub fn sqlite(path: impl Into<PathBuf>) -> Self {
        Self::Sqlite { path: path.into() }
    }

    pub(crate) fn open(&self) -> DbResult<Connection> {
        match self {
            Self::Sqlite { path } => open_db(path),
            Self::Memory => open_db_in_memory(),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Self::Sqlite { path } => format!("sqlite:{}", path.display()),
            Self::Memory => "memory".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::StoreOptions;

    #[test]
    fn deserializes_tagged_backends() {
        let file: StoreOptions =
            serde_json::from_str(r#"{"backend":"sqlite","path":"/var/lib/store.db"}"#)
                .expect("sqlite options should parse");
        assert_eq!(file, StoreOptions::sqlite("/var/lib/store.db"));

        let memory: StoreOptions =
            serde_json::from_str(r#"{"backend":"memory"}"#).expect("memory options should parse");
        assert_eq!(memory, StoreOptions::Memory);

        assert!(serde_json::from_str::<StoreOptions>(r#"{"backend":"etcd"}"#).is_err());
    }
}
