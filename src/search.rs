use crate::backup;
use crate::model::TrainingRecord;
use crate::store::{self, SELECT_RECORD_COLUMNS};
use rusqlite::types::Value;
use rusqlite::Connection;
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Clone, Default)]
pub struct SearchQuery {
    pub year: i64,
    pub semester: i64,
    /// Exact match on teacher name.
    pub name: Option<String>,
    /// Exact match on birthday text, e.g. "19800101-1".
    pub birthday: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Period {
    pub year: i64,
    pub semester: i64,
}

fn non_blank(v: &Option<String>) -> Option<&str> {
    v.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

pub fn try_search(conn: &Connection, q: &SearchQuery) -> rusqlite::Result<Vec<TrainingRecord>> {
    let mut sql = format!(
        "SELECT {} FROM training_records WHERE year = ? AND semester = ?",
        SELECT_RECORD_COLUMNS
    );
    let mut params: Vec<Value> = vec![Value::Integer(q.year), Value::Integer(q.semester)];
    if let Some(name) = non_blank(&q.name) {
        sql.push_str(" AND teacher_name = ?");
        params.push(Value::Text(name.to_string()));
    }
    if let Some(birthday) = non_blank(&q.birthday) {
        sql.push_str(" AND birthday = ?");
        params.push(Value::Text(birthday.to_string()));
    }
    sql.push_str(" ORDER BY teacher_name ASC, id ASC");

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(rusqlite::params_from_iter(params), store::record_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Query failures are logged and reported as "no results".
pub fn search(conn: &Connection, q: &SearchQuery) -> Vec<TrainingRecord> {
    match try_search(conn, q) {
        Ok(rows) => rows,
        Err(e) => {
            log::error!("record search failed: {}", e);
            Vec::new()
        }
    }
}

/// Distinct (year, semester) pairs present in the store, newest first.
pub fn available_periods(conn: &Connection) -> Vec<Period> {
    let run = || -> rusqlite::Result<Vec<Period>> {
        let mut stmt = conn.prepare(
            "SELECT DISTINCT year, semester FROM training_records
             ORDER BY year DESC, semester DESC",
        )?;
        let rows = stmt
            .query_map([], |r| {
                Ok(Period {
                    year: r.get(0)?,
                    semester: r.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    };
    run().unwrap_or_else(|e| {
        log::error!("period listing failed: {}", e);
        Vec::new()
    })
}

/// Saves a result set as CSV. An empty result set is refused.
pub fn export_results(path: &Path, rows: &[TrainingRecord], bom: bool) -> anyhow::Result<()> {
    if rows.is_empty() {
        anyhow::bail!("nothing to save: the result set is empty");
    }
    backup::write_records_csv(path, rows, bom)?;
    log::info!("exported {} search results to {}", rows.len(), path.to_string_lossy());
    Ok(())
}
