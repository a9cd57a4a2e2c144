use rusqlite::{params, Connection, OptionalExtension, Result as SqlResult};
use std::path::PathBuf;

use crate::models::{Mapping, MappingMethod};

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn new(db_path: PathBuf) -> SqlResult<Self> {
        let conn = Connection::open(db_path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        let mut db = Database { conn };
        db.run_migrations()?;
        Ok(db)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> SqlResult<Self> {
        let conn = Connection::open_in_memory()?;
        let mut db = Database { conn };
        db.run_migrations()?;
        Ok(db)
    }

    fn run_migrations(&mut self) -> SqlResult<()> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS schema_migrations (
                name TEXT PRIMARY KEY,
                applied_at TEXT NOT NULL
            );",
        )?;

        let migrations = vec![(
            "001_create_mappings.sql",
            include_str!(concat!(
                env!("CARGO_MANIFEST_DIR"),
                "/migrations/001_create_mappings.sql"
            )),
        )];

        for (name, sql) in migrations {
            let applied: Option<String> = self
                .conn
                .query_row(
                    "SELECT name FROM schema_migrations WHERE name = ?1",
                    params![name],
                    |row| row.get(0),
                )
                .optional()?;

            if applied.is_none() {
                let tx = self.conn.transaction()?;
                tx.execute_batch(sql)?;
                tx.execute(
                    "INSERT INTO schema_migrations (name, applied_at) VALUES (?1, datetime('now'))",
                    params![name],
                )?;
                tx.commit()?;
            }
        }

        Ok(())
    }

    /// Last-write-wins upsert; at most one mapping per invoice id.
    pub fn upsert_mapping(&self, mapping: &Mapping) -> SqlResult<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO mappings (
                invoice_id, project_id, project_name, method, mapped_at, mapped_by
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                mapping.invoice_id,
                mapping.project_id,
                mapping.project_name,
                mapping.method.as_str(),
                mapping.mapped_at,
                mapping.mapped_by,
            ],
        )?;
        Ok(())
    }

    pub fn get_mapping(&self, invoice_id: &str) -> SqlResult<Option<Mapping>> {
        let mut stmt = self.conn.prepare(
            "SELECT invoice_id, project_id, project_name, method, mapped_at, mapped_by
             FROM mappings WHERE invoice_id = ?1",
        )?;

        stmt.query_row(params![invoice_id], row_to_mapping).optional()
    }

    pub fn remove_mapping(&self, invoice_id: &str) -> SqlResult<()> {
        self.conn.execute(
            "DELETE FROM mappings WHERE invoice_id = ?1",
            params![invoice_id],
        )?;
        Ok(())
    }

    pub fn list_mappings(&self) -> SqlResult<Vec<Mapping>> {
        let mut stmt = self.conn.prepare(
            "SELECT invoice_id, project_id, project_name, method, mapped_at, mapped_by
             FROM mappings
             ORDER BY mapped_at DESC, invoice_id",
        )?;

        let rows = stmt.query_map([], row_to_mapping)?;
        rows.collect()
    }

    /// Persist a set of mappings in one transaction (all-or-nothing), as
    /// required for an auto-mapping run.
    pub fn apply_mappings(&mut self, mappings: &[Mapping]) -> SqlResult<()> {
        let tx = self.conn.transaction()?;
        for mapping in mappings {
            tx.execute(
                "INSERT OR REPLACE INTO mappings (
                    invoice_id, project_id, project_name, method, mapped_at, mapped_by
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    mapping.invoice_id,
                    mapping.project_id,
                    mapping.project_name,
                    mapping.method.as_str(),
                    mapping.mapped_at,
                    mapping.mapped_by,
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }
}

fn row_to_mapping(row: &rusqlite::Row<'_>) -> rusqlite::Result<Mapping> {
    let method_raw: String = row.get(3)?;
    let method = MappingMethod::parse(&method_raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            3,
            rusqlite::types::Type::Text,
            format!("unknown mapping method: {method_raw}").into(),
        )
    })?;

    Ok(Mapping {
        invoice_id: row.get(0)?,
        project_id: row.get(1)?,
        project_name: row.get(2)?,
        method,
        mapped_at: row.get(4)?,
        mapped_by: row.get(5)?,
    })
}
