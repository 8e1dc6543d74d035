use crate::audit::AuditLog;
use crate::config::Config;
use crate::model::{OpStatus, OperationKind, TrainingRecord, RECORD_COLUMNS};
use crate::store;
use anyhow::Context;
use rusqlite::Connection;
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupSummary {
    pub path: String,
    pub record_count: usize,
}

/// `backup_<date>.csv`, or `backup_<date>_<n>.csv` for n >= 1.
pub fn backup_file_name(date: &str, counter: u32) -> String {
    if counter == 0 {
        format!("backup_{}.csv", date)
    } else {
        format!("backup_{}_{}.csv", date, counter)
    }
}

/// First free backup path for `date` inside `dir`.
pub fn next_backup_path(dir: &Path, date: &str) -> PathBuf {
    let mut counter = 0u32;
    loop {
        let candidate = dir.join(backup_file_name(date, counter));
        if !candidate.exists() {
            return candidate;
        }
        counter += 1;
    }
}

/// Writes records as CSV with a header row of column names.
pub fn write_records_csv(path: &Path, records: &[TrainingRecord], bom: bool) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create directory {}", parent.to_string_lossy())
            })?;
        }
    }
    let mut file = File::create(path)
        .with_context(|| format!("failed to create {}", path.to_string_lossy()))?;
    if bom {
        file.write_all(UTF8_BOM).context("failed to write BOM")?;
    }
    let mut wtr = csv::Writer::from_writer(file);
    wtr.write_record(RECORD_COLUMNS)
        .context("failed to write CSV header")?;
    for r in records {
        wtr.write_record(r.to_csv_fields())
            .context("failed to write CSV record")?;
    }
    wtr.flush().context("failed to flush CSV writer")?;
    Ok(())
}

/// Writes the backup under a `.partial` name and renames it into place, so a
/// failed write never leaves a listable `.csv` behind.
pub fn write_backup_file(path: &Path, records: &[TrainingRecord], bom: bool) -> anyhow::Result<()> {
    let mut partial = path.as_os_str().to_owned();
    partial.push(".partial");
    let partial = PathBuf::from(partial);

    let result = write_records_csv(&partial, records, bom).and_then(|_| {
        std::fs::rename(&partial, path).with_context(|| {
            format!("failed to move backup into place at {}", path.to_string_lossy())
        })
    });
    if result.is_err() {
        let _ = std::fs::remove_file(&partial);
    }
    result
}

/// Dumps every record to a dated CSV file in the configured backup directory.
pub fn create_backup(
    conn: &Connection,
    cfg: &Config,
    workspace: &Path,
) -> anyhow::Result<BackupSummary> {
    let dir = cfg.backup_dir_in(workspace);
    let date = chrono::Local::now().format("%Y%m%d").to_string();
    let path = next_backup_path(&dir, &date);
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    let audit = AuditLog::new(conn, OperationKind::Backup);
    let log_id = audit.begin(&file_name);

    let result = std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create backup directory {}", dir.to_string_lossy()))
        .and_then(|_| store::all_records(conn).context("failed to read training_records"))
        .and_then(|records| {
            write_backup_file(&path, &records, cfg.export_bom)?;
            Ok(records.len())
        });

    match result {
        Ok(count) => {
            log::info!("backed up {} records to {}", count, path.to_string_lossy());
            audit.finish(log_id, OpStatus::Success, Some(&format!("{} records", count)));
            Ok(BackupSummary {
                path: path.to_string_lossy().to_string(),
                record_count: count,
            })
        }
        Err(e) => {
            log::error!("backup to {} failed: {:#}", path.to_string_lossy(), e);
            audit.finish(log_id, OpStatus::Failure, Some(&format!("{:#}", e)));
            Err(e)
        }
    }
}

/// CSV files in `dir`, optionally restricted to names starting with `prefix`,
/// sorted by name descending so the newest dated backup comes first.
pub fn list_backups(dir: &Path, prefix: Option<&str>) -> anyhow::Result<Vec<String>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut names = Vec::new();
    for ent in std::fs::read_dir(dir)
        .with_context(|| format!("failed to read {}", dir.to_string_lossy()))?
    {
        let p = ent?.path();
        if !p.is_file() {
            continue;
        }
        let Some(name) = p.file_name().and_then(|s| s.to_str()) else {
            continue;
        };
        if !name.ends_with(".csv") {
            continue;
        }
        if let Some(pre) = prefix {
            if !name.starts_with(pre) {
                continue;
            }
        }
        names.push(name.to_string());
    }
    names.sort_by(|a, b| b.cmp(a));
    Ok(names)
}
