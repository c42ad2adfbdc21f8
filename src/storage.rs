use crate::error::{EtlError, Result};
use crate::types::EnrichedMeetingRecord;
use async_trait::async_trait;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::Mutex;
use tracing::{info, warn};

/// Sink for one run's enriched batch. The write contract is
/// replace-all: the previous snapshot is superseded wholesale.
#[async_trait]
pub trait MeetingStore: Send + Sync {
    /// Creates the meetings table when missing and adds the UTC
    /// schedule columns to a pre-existing table that lacks them.
    /// Failure here is fatal to the run.
    async fn ensure_schema(&self) -> Result<()>;

    /// Clears the table and inserts the new batch. The clear step
    /// failing is fatal; a single row failing to insert is logged and
    /// skipped. Returns the number of rows written.
    async fn replace_all(&self, meetings: &[EnrichedMeetingRecord]) -> Result<usize>;

    async fn count(&self) -> Result<usize>;
}

const RAW_COLUMNS: [&str; 31] = [
    "id_bigint",
    "worldid_mixed",
    "service_body_bigint",
    "weekday_tinyint",
    "venue_type",
    "start_time",
    "duration_time",
    "time_zone",
    "formats",
    "longitude",
    "latitude",
    "root_server_uri",
    "format_shared_id_list",
    "meeting_name",
    "location_text",
    "location_info",
    "location_street",
    "location_neighborhood",
    "location_municipality",
    "location_sub_province",
    "location_province",
    "location_postal_code_1",
    "contact_name_1",
    "contact_phone_1",
    "contact_email_1",
    "contact_name_2",
    "contact_phone_2",
    "contact_email_2",
    "phone_meeting_number",
    "virtual_meeting_link",
    "virtual_meeting_additional_info",
];

/// SQLite-backed store.
pub struct SqliteMeetingStore {
    conn: Mutex<Connection>,
}

impl SqliteMeetingStore {
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path).map_err(db_err)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Ids currently in the table, in insertion order.
    pub fn meeting_ids(&self) -> Result<Vec<String>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare("SELECT id_bigint FROM meetings ORDER BY rowid")
            .map_err(db_err)?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(db_err)?;
        let mut ids = Vec::new();
        for id in rows {
            ids.push(id.map_err(db_err)?);
        }
        Ok(ids)
    }
}

fn db_err(e: rusqlite::Error) -> EtlError {
    EtlError::Database {
        message: e.to_string(),
    }
}

fn column_exists(conn: &Connection, table: &str, column: &str) -> Result<bool> {
    let mut stmt = conn
        .prepare(&format!("PRAGMA table_info({table})"))
        .map_err(db_err)?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(1))
        .map_err(db_err)?;
    for name in names {
        if name.map_err(db_err)? == column {
            return Ok(true);
        }
    }
    Ok(false)
}

fn ensure_column(conn: &Connection, table: &str, column: &str, column_type: &str) -> Result<()> {
    if !column_exists(conn, table, column)? {
        conn.execute(
            &format!("ALTER TABLE {table} ADD COLUMN {column} {column_type}"),
            [],
        )
        .map_err(db_err)?;
        info!(table, column, "Added missing column");
    }
    Ok(())
}

#[async_trait]
impl MeetingStore for SqliteMeetingStore {
    async fn ensure_schema(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();

        let raw_defs: Vec<String> = RAW_COLUMNS
            .iter()
            .map(|c| {
                if *c == "id_bigint" {
                    format!("{c} TEXT PRIMARY KEY")
                } else {
                    format!("{c} TEXT")
                }
            })
            .collect();
        conn.execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS meetings ({}, utc_offset REAL)",
                raw_defs.join(", ")
            ),
            [],
        )
        .map_err(db_err)?;

        // Older deployments predate the UTC schedule columns.
        ensure_column(&conn, "meetings", "utc_start_time", "TEXT")?;
        ensure_column(&conn, "meetings", "utc_end_time", "TEXT")?;
        Ok(())
    }

    async fn replace_all(&self, meetings: &[EnrichedMeetingRecord]) -> Result<usize> {
        let conn = self.conn.lock().unwrap();

        conn.execute("DELETE FROM meetings", []).map_err(db_err)?;

        let insert_sql = format!(
            "INSERT INTO meetings ({}, utc_offset, utc_start_time, utc_end_time) VALUES ({})",
            RAW_COLUMNS.join(", "),
            vec!["?"; RAW_COLUMNS.len() + 3].join(", ")
        );
        let mut stmt = conn.prepare(&insert_sql).map_err(db_err)?;

        let mut inserted = 0usize;
        for meeting in meetings {
            let raw = &meeting.raw;
            let result = stmt.execute(params![
                raw.id_bigint,
                raw.worldid_mixed,
                raw.service_body_bigint,
                raw.weekday_tinyint,
                raw.venue_type,
                raw.start_time,
                raw.duration_time,
                raw.time_zone,
                raw.formats,
                raw.longitude,
                raw.latitude,
                raw.root_server_uri,
                raw.format_shared_id_list,
                raw.meeting_name,
                raw.location_text,
                raw.location_info,
                raw.location_street,
                raw.location_neighborhood,
                raw.location_municipality,
                raw.location_sub_province,
                raw.location_province,
                raw.location_postal_code_1,
                raw.contact_name_1,
                raw.contact_phone_1,
                raw.contact_email_1,
                raw.contact_name_2,
                raw.contact_phone_2,
                raw.contact_email_2,
                raw.phone_meeting_number,
                raw.virtual_meeting_link,
                raw.virtual_meeting_additional_info,
                meeting.utc_offset_hours,
                meeting.utc_start_time.format("%H:%M:%S").to_string(),
                meeting.utc_end_time.format("%H:%M:%S").to_string(),
            ]);
            match result {
                Ok(_) => inserted += 1,
                Err(e) => {
                    let serialized = serde_json::to_string(meeting)
                        .unwrap_or_else(|_| "<unserializable record>".to_string());
                    warn!(
                        meeting_id = %raw.id_bigint,
                        error = %e,
                        record = %serialized,
                        "Failed to insert meeting, continuing"
                    );
                }
            }
        }

        info!(inserted, total = meetings.len(), "Replaced meetings table contents");
        Ok(inserted)
    }

    async fn count(&self) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM meetings", [], |row| row.get(0))
            .map_err(db_err)?;
        Ok(count as usize)
    }
}

/// In-memory store for tests and dry runs.
#[derive(Default)]
pub struct InMemoryMeetingStore {
    meetings: Mutex<Vec<EnrichedMeetingRecord>>,
}

impl InMemoryMeetingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Vec<EnrichedMeetingRecord> {
        self.meetings.lock().unwrap().clone()
    }
}

#[async_trait]
impl MeetingStore for InMemoryMeetingStore {
    async fn ensure_schema(&self) -> Result<()> {
        Ok(())
    }

    async fn replace_all(&self, meetings: &[EnrichedMeetingRecord]) -> Result<usize> {
        let mut stored = self.meetings.lock().unwrap();
        *stored = meetings.to_vec();
        Ok(stored.len())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.meetings.lock().unwrap().len())
    }
}
