use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{Connection, OptionalExtension, params};

use presage_core::{Model, ModelBackend, ModelId};

use crate::error::{Result, StoreError};
use crate::schema;

/// SQLite implementation of the core's key-value backend.
///
/// Models are stored whole as serialized bodies keyed by (namespace, id).
/// The connection sits behind a mutex — rusqlite connections are not
/// `Sync` — which also gives the backend the self-synchronization the
/// `ModelBackend` contract asks for. WAL mode keeps concurrent readers
/// cheap across processes.
pub struct SqliteBackend {
    conn: Mutex<Connection>,
}

impl SqliteBackend {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        schema::initialize(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::initialize(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    // --- Metadata ---

    pub fn get_metadata(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT value FROM metadata WHERE key = ?1")?;
        let result = stmt.query_row([key], |row| row.get(0)).optional()?;
        Ok(result)
    }

    pub fn set_metadata(&self, key: &str, value: &str) -> Result<()> {
        self.conn().execute(
            "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    // --- Models ---

    pub(crate) fn get_model(&self, namespace: &str, id: &ModelId) -> Result<Option<Model>> {
        let conn = self.conn();
        let mut stmt =
            conn.prepare("SELECT body FROM models WHERE namespace = ?1 AND id = ?2")?;
        let body: Option<String> = stmt
            .query_row(params![namespace, id.as_str()], |row| row.get(0))
            .optional()?;

        body.map(|body| {
            serde_json::from_str(&body).map_err(|e| {
                StoreError::InvalidData(format!("corrupt model body for {id}: {e}"))
            })
        })
        .transpose()
    }

    pub(crate) fn put_model(&self, namespace: &str, model: &Model) -> Result<()> {
        let body = serde_json::to_string(model)
            .map_err(|e| StoreError::InvalidData(format!("model serialization failed: {e}")))?;
        self.conn().execute(
            "INSERT OR REPLACE INTO models (namespace, id, frequency, body)
             VALUES (?1, ?2, ?3, ?4)",
            params![namespace, model.id().as_str(), model.frequency(), body],
        )?;
        Ok(())
    }

    pub(crate) fn model_ids(&self, namespace: &str) -> Result<Vec<ModelId>> {
        let conn = self.conn();
        let mut stmt =
            conn.prepare("SELECT id FROM models WHERE namespace = ?1 ORDER BY id")?;
        let ids = stmt
            .query_map([namespace], |row| {
                let id: String = row.get(0)?;
                Ok(ModelId::from_raw(id))
            })?
            .collect::<std::result::Result<Vec<ModelId>, _>>()?;
        Ok(ids)
    }

    /// Number of models in one namespace.
    pub fn model_count(&self, namespace: &str) -> Result<usize> {
        let count: i64 = self.conn().query_row(
            "SELECT count(*) FROM models WHERE namespace = ?1",
            [namespace],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// All namespaces with at least one model, sorted.
    pub fn namespaces(&self) -> Result<Vec<String>> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT DISTINCT namespace FROM models ORDER BY namespace")?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(names)
    }
}

impl ModelBackend for SqliteBackend {
    fn get(&self, namespace: &str, id: &ModelId) -> presage_core::Result<Option<Model>> {
        Ok(self.get_model(namespace, id)?)
    }

    fn put(&self, namespace: &str, model: &Model) -> presage_core::Result<()> {
        Ok(self.put_model(namespace, model)?)
    }

    fn ids(&self, namespace: &str) -> presage_core::Result<Vec<ModelId>> {
        Ok(self.model_ids(namespace)?)
    }
}
