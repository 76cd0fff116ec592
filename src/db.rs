//! SQLite-backed hazard record store

use std::path::Path;
use std::sync::Mutex;

use anyhow::Result;
use rusqlite::Connection;

use crate::error::HazardLookupError;
use crate::hazard_provider::{Epoch, HazardRecord, HazardStore, HazardType, ReturnPeriod};

/// Initialize the database schema
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- One magnitude per identity and scenario
        CREATE TABLE IF NOT EXISTS hazard_records (
            identity TEXT NOT NULL,
            epoch TEXT NOT NULL,
            hazard_type TEXT NOT NULL,
            return_period INTEGER NOT NULL,
            depth REAL NOT NULL,
            PRIMARY KEY (identity, epoch, hazard_type, return_period)
        );

        CREATE INDEX IF NOT EXISTS idx_hazard_records_identity ON hazard_records(identity);
        "#,
    )?;
    Ok(())
}

/// Insert or replace every magnitude of a record
pub fn upsert_hazard_record(conn: &Connection, record: &HazardRecord) -> Result<()> {
    let mut stmt = conn.prepare(
        "INSERT OR REPLACE INTO hazard_records (identity, epoch, hazard_type, return_period, depth)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )?;
    for (epoch, hazard_type, return_period, depth) in record.entries() {
        stmt.execute((
            &record.identity,
            epoch.as_str(),
            hazard_type.as_str(),
            return_period.years(),
            depth,
        ))?;
    }
    Ok(())
}

/// Clear all hazard records (for re-ingestion)
pub fn clear_hazard_records(conn: &Connection) -> Result<()> {
    conn.execute_batch("DELETE FROM hazard_records;")?;
    Ok(())
}

/// List every identity with at least one magnitude
pub fn list_identities(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt =
        conn.prepare("SELECT DISTINCT identity FROM hazard_records ORDER BY identity")?;

    let rows = stmt.query_map([], |row| row.get(0))?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row?);
    }
    Ok(results)
}

/// Number of stored magnitudes
pub fn count_records(conn: &Connection) -> Result<usize> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM hazard_records", [], |row| row.get(0))?;
    Ok(count as usize)
}

/// Read one identity's record, `None` when nothing is stored for it
pub fn load_hazard_record(
    conn: &Connection,
    identity: &str,
) -> Result<Option<HazardRecord>, HazardLookupError> {
    let query_failed = |e: rusqlite::Error| {
        HazardLookupError::hazard(format!("reading hazard records for {}", identity), e)
    };

    let mut stmt = conn
        .prepare(
            "SELECT epoch, hazard_type, return_period, depth
             FROM hazard_records
             WHERE identity = ?1",
        )
        .map_err(query_failed)?;

    let rows = stmt
        .query_map([identity], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, u32>(2)?,
                row.get::<_, f64>(3)?,
            ))
        })
        .map_err(query_failed)?;

    let mut record = HazardRecord::new(identity);
    for row in rows {
        let (epoch, hazard_type, return_period, depth) = row.map_err(query_failed)?;
        let malformed =
            |e: String| HazardLookupError::hazard(format!("malformed hazard record for {}", identity), e);
        record.insert(
            epoch.parse::<Epoch>().map_err(malformed)?,
            hazard_type.parse::<HazardType>().map_err(malformed)?,
            ReturnPeriod::try_from(return_period).map_err(malformed)?,
            depth,
        );
    }

    Ok(if record.is_empty() { None } else { Some(record) })
}

/// Hazard store over a single shared connection
pub struct SqliteHazardStore {
    conn: Mutex<Connection>,
}

impl SqliteHazardStore {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        init_schema(&conn)?;
        Ok(Self::from_connection(conn))
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }
}

impl HazardStore for SqliteHazardStore {
    fn load(&self, identity: &str) -> Result<Option<HazardRecord>, HazardLookupError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| HazardLookupError::hazard("hazard store unavailable", e.to_string()))?;
        load_hazard_record(&conn, identity)
    }
}
