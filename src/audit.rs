use crate::model::{OpStatus, OperationKind, REGISTRATION_DATE_FORMAT};
use rusqlite::Connection;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub id: i64,
    pub logged_at: String,
    pub file_name: String,
    pub status: i64,
    pub status_label: String,
    pub detail: Option<String>,
}

/// History writer for one operation kind. Writes are best effort: a failure
/// is logged and never aborts the operation being recorded.
pub struct AuditLog<'c> {
    conn: &'c Connection,
    kind: OperationKind,
}

impl<'c> AuditLog<'c> {
    pub fn new(conn: &'c Connection, kind: OperationKind) -> Self {
        Self { conn, kind }
    }

    /// Inserts a pending row and returns its id.
    pub fn begin(&self, file_name: &str) -> Option<i64> {
        let now = chrono::Local::now()
            .format(REGISTRATION_DATE_FORMAT)
            .to_string();
        let sql = format!(
            "INSERT INTO {}(logged_at, file_name, status) VALUES (?, ?, ?)",
            self.kind.table()
        );
        match self
            .conn
            .execute(&sql, (&now, file_name, OpStatus::Pending.code()))
        {
            Ok(_) => Some(self.conn.last_insert_rowid()),
            Err(e) => {
                log::warn!("failed to write {} log for {}: {}", self.kind.table(), file_name, e);
                None
            }
        }
    }

    pub fn finish(&self, id: Option<i64>, status: OpStatus, detail: Option<&str>) {
        let Some(id) = id else {
            return;
        };
        let sql = format!(
            "UPDATE {} SET status = ?, detail = ? WHERE id = ?",
            self.kind.table()
        );
        if let Err(e) = self.conn.execute(&sql, (status.code(), detail, id)) {
            log::warn!("failed to update {} log {}: {}", self.kind.table(), id, e);
        }
    }

    /// Newest first.
    pub fn list(&self) -> rusqlite::Result<Vec<LogEntry>> {
        let sql = format!(
            "SELECT id, logged_at, file_name, status, detail FROM {} ORDER BY logged_at DESC, id DESC",
            self.kind.table()
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let kind = self.kind;
        let rows = stmt
            .query_map([], |r| {
                let status: i64 = r.get(3)?;
                Ok(LogEntry {
                    id: r.get(0)?,
                    logged_at: r.get(1)?,
                    file_name: r.get(2)?,
                    status,
                    status_label: OpStatus::from_code(status)
                        .map(|s| s.label(kind))
                        .unwrap_or_else(|| "알 수 없음".to_string()),
                    detail: r.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}
