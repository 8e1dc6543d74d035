use crate::audit::AuditLog;
use crate::error::PipelineError;
use crate::model::{OpStatus, OperationKind, SchoolType, TrainingRecord, REGISTRATION_DATE_FORMAT};
use crate::normalize::parse_int_text;
use crate::store;
use chrono::NaiveDateTime;
use rusqlite::Connection;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;

/// Columns every backup must carry. `school_type` is checked separately since
/// older backups split it into `ele_school`/`mid_school`.
const REQUIRED_COLUMNS: [&str; 13] = [
    "year",
    "semester",
    "agency_name",
    "affiliation",
    "agency_number",
    "teacher_name",
    "nice_number",
    "birthday",
    "area",
    "start_date",
    "end_date",
    "registration_date",
    "remarks",
];

/// Older column names still accepted on restore.
const COLUMN_ALIASES: [(&str, &str); 2] = [("t_name", "teacher_name"), ("reg_date", "registration_date")];

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreSummary {
    pub file: String,
    pub replaced: i64,
    pub restored: usize,
}

struct Columns {
    index: HashMap<String, usize>,
}

impl Columns {
    fn from_headers(headers: &csv::StringRecord) -> Self {
        let mut index = HashMap::new();
        for (i, h) in headers.iter().enumerate() {
            let name = h.trim().trim_start_matches('\u{feff}').to_string();
            index.entry(name).or_insert(i);
        }
        for (old, new) in COLUMN_ALIASES {
            if !index.contains_key(new) {
                if let Some(i) = index.get(old).copied() {
                    index.insert(new.to_string(), i);
                }
            }
        }
        Columns { index }
    }

    fn missing(&self) -> Vec<&'static str> {
        let mut missing: Vec<&'static str> = REQUIRED_COLUMNS
            .iter()
            .copied()
            .filter(|c| !self.index.contains_key(*c))
            .collect();
        let has_school = self.index.contains_key("school_type")
            || (self.index.contains_key("ele_school") && self.index.contains_key("mid_school"));
        if !has_school {
            missing.push("school_type");
        }
        missing
    }

    fn get<'r>(&self, rec: &'r csv::StringRecord, name: &str) -> Option<&'r str> {
        let i = *self.index.get(name)?;
        let v = rec.get(i)?;
        if v.trim().is_empty() {
            None
        } else {
            Some(v)
        }
    }
}

/// Parses a backup CSV into records. Fails without side effects when a
/// required column is absent or a row has no usable year/semester.
pub fn read_backup_file(path: &Path) -> Result<Vec<TrainingRecord>, PipelineError> {
    let bytes = std::fs::read(path).map_err(|e| {
        PipelineError::parse(format!("failed to read {}: {}", path.to_string_lossy(), e))
    })?;
    let text = String::from_utf8(bytes).map_err(|e| {
        PipelineError::parse(format!(
            "backup file is not valid UTF-8 (byte offset {}): {}",
            e.utf8_error().valid_up_to(),
            path.to_string_lossy()
        ))
    })?;
    let text = text.trim_start_matches('\u{feff}');

    let mut rdr = csv::ReaderBuilder::new().from_reader(text.as_bytes());
    let headers = rdr
        .headers()
        .map_err(|e| PipelineError::parse(format!("failed to read CSV header: {}", e)))?
        .clone();
    let cols = Columns::from_headers(&headers);
    let missing = cols.missing();
    if !missing.is_empty() {
        return Err(PipelineError::parse(format!(
            "missing required columns: {}",
            missing.join(", ")
        )));
    }

    let mut records = Vec::new();
    for rec in rdr.records() {
        let rec = rec.map_err(|e| PipelineError::parse(format!("malformed CSV: {}", e)))?;
        let line = rec.position().map(|p| p.line()).unwrap_or(0);
        records.push(record_from_csv(&cols, &rec, line)?);
    }
    Ok(records)
}

fn record_from_csv(
    cols: &Columns,
    rec: &csv::StringRecord,
    line: u64,
) -> Result<TrainingRecord, PipelineError> {
    let text = |name: &str| cols.get(rec, name).map(|s| s.to_string());
    let int = |name: &str| cols.get(rec, name).and_then(parse_int_text);
    let required_int = |name: &str| {
        int(name).ok_or_else(|| {
            PipelineError::parse(format!("line {}: {} must be an integer", line, name))
        })
    };

    let school_type = match cols.get(rec, "school_type") {
        Some(code) => SchoolType::from_code(code),
        None if cols.get(rec, "ele_school").is_some() => Some(SchoolType::Elementary),
        None if cols.get(rec, "mid_school").is_some() => Some(SchoolType::Middle),
        None => None,
    };

    Ok(TrainingRecord {
        year: required_int("year")?,
        semester: required_int("semester")?,
        agency_name: text("agency_name"),
        affiliation: text("affiliation"),
        agency_number: int("agency_number"),
        school_type,
        teacher_name: text("teacher_name"),
        nice_number: text("nice_number"),
        birthday: text("birthday"),
        area: text("area"),
        start_date: int("start_date"),
        end_date: int("end_date"),
        registration_date: cols
            .get(rec, "registration_date")
            .and_then(normalize_timestamp),
        remarks: text("remarks"),
    })
}

/// Unparseable timestamps are dropped rather than failing the restore.
fn normalize_timestamp(s: &str) -> Option<String> {
    let t = s.trim();
    NaiveDateTime::parse_from_str(t, REGISTRATION_DATE_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(t, "%Y-%m-%d %H:%M:%S%.f"))
        .or_else(|_| NaiveDateTime::parse_from_str(t, "%Y-%m-%dT%H:%M:%S%.f"))
        .ok()
        .map(|dt| dt.format(REGISTRATION_DATE_FORMAT).to_string())
}

/// Deletes every record, resets the identity counter and inserts `records`,
/// all in one transaction.
pub fn replace_all(conn: &Connection, records: &[TrainingRecord]) -> Result<i64, PipelineError> {
    let tx = conn.unchecked_transaction()?;
    let step = (|| -> Result<i64, PipelineError> {
        let replaced = tx
            .execute("DELETE FROM training_records", [])
            .map_err(|e| PipelineError::Insert {
                context: "delete existing records".to_string(),
                source: e,
            })?;
        tx.execute(
            "DELETE FROM sqlite_sequence WHERE name = 'training_records'",
            [],
        )
        .map_err(|e| PipelineError::Insert {
            context: "reset identity counter".to_string(),
            source: e,
        })?;
        store::insert_in_tx(&tx, records)?;
        Ok(replaced as i64)
    })();

    match step {
        Ok(replaced) => {
            tx.commit()?;
            Ok(replaced)
        }
        Err(e) => {
            let _ = tx.rollback();
            Err(e)
        }
    }
}

/// Replaces the records table with the content of a backup file and records
/// the attempt in `restore_logs`.
pub fn restore_from_file(conn: &Connection, path: &Path) -> Result<RestoreSummary, PipelineError> {
    let file_name = path.to_string_lossy().to_string();
    let audit = AuditLog::new(conn, OperationKind::Restore);
    let log_id = audit.begin(&file_name);

    let result = read_backup_file(path).and_then(|records| {
        let replaced = replace_all(conn, &records)?;
        Ok(RestoreSummary {
            file: file_name.clone(),
            replaced,
            restored: records.len(),
        })
    });

    match &result {
        Ok(s) => {
            log::info!(
                "restored {} records from {} ({} replaced)",
                s.restored,
                file_name,
                s.replaced
            );
            audit.finish(
                log_id,
                OpStatus::Success,
                Some(&format!("{} records restored", s.restored)),
            );
        }
        Err(e) => {
            log::error!("restore from {} failed: {}", file_name, e);
            audit.finish(log_id, OpStatus::Failure, Some(&e.to_string()));
        }
    }
    result
}
