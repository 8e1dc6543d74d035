use crate::audit::AuditLog;
use crate::config::Config;
use crate::error::PipelineError;
use crate::header;
use crate::model::{OpStatus, OperationKind, SchoolType, REGISTRATION_DATE_FORMAT};
use crate::normalize::{self, NormalizedSheet, SheetContext, SOURCE_COLUMNS};
use crate::store;
use crate::workbook::{self, SheetData};
use rusqlite::Connection;
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetSummary {
    pub sheet: String,
    pub school_type: SchoolType,
    pub year: i64,
    pub semester: i64,
    pub inserted: usize,
    pub skipped_blank: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadSummary {
    pub file: String,
    pub sheets: Vec<SheetSummary>,
    pub total_inserted: usize,
}

struct PreparedSheet {
    name: String,
    ctx: SheetContext,
    normalized: NormalizedSheet,
}

pub fn validate_extension(path: &Path) -> Result<(), PipelineError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("xlsx") | Some("xls") => Ok(()),
        _ => Err(PipelineError::parse(format!(
            "unsupported file type (only .xlsx or .xls): {}",
            path.to_string_lossy()
        ))),
    }
}

/// Loads one workbook into `training_records`, recording the attempt in
/// `upload_logs`.
///
/// Every sheet is parsed before anything is written, so a bad sheet anywhere
/// rejects the whole file. Each sheet is then written in its own transaction.
pub fn upload_workbook(
    conn: &Connection,
    cfg: &Config,
    path: &Path,
    expected_period: Option<(i64, i64)>,
) -> Result<UploadSummary, PipelineError> {
    let file_name = path.to_string_lossy().to_string();
    let audit = AuditLog::new(conn, OperationKind::Upload);
    let log_id = audit.begin(&file_name);

    let result = run_upload(conn, cfg, path, expected_period);
    match &result {
        Ok(summary) => {
            log::info!(
                "uploaded {} records from {} sheet(s) of {}",
                summary.total_inserted,
                summary.sheets.len(),
                file_name
            );
            let detail = format!(
                "{} records from {} sheet(s)",
                summary.total_inserted,
                summary.sheets.len()
            );
            audit.finish(log_id, OpStatus::Success, Some(&detail));
        }
        Err(e) => {
            log::error!("upload of {} failed: {}", file_name, e);
            audit.finish(log_id, OpStatus::Failure, Some(&e.to_string()));
        }
    }
    result
}

fn run_upload(
    conn: &Connection,
    cfg: &Config,
    path: &Path,
    expected_period: Option<(i64, i64)>,
) -> Result<UploadSummary, PipelineError> {
    validate_extension(path)?;
    if !path.is_file() {
        return Err(PipelineError::parse(format!(
            "file not found: {}",
            path.to_string_lossy()
        )));
    }

    let sheets = workbook::read_workbook(path, cfg.header_skip_rows, &SOURCE_COLUMNS)
        .map_err(|e| PipelineError::parse(format!("{:#}", e)))?;
    let registered_at = chrono::Local::now()
        .format(REGISTRATION_DATE_FORMAT)
        .to_string();
    let prepared = prepare_sheets(&sheets, &registered_at, expected_period)?;

    let mut summaries = Vec::with_capacity(prepared.len());
    for sheet in prepared {
        let inserted = store::insert_batch(conn, &sheet.normalized.records).map_err(|e| match e {
            PipelineError::Insert { context, source } => PipelineError::Insert {
                context: format!("sheet '{}', {}", sheet.name, context),
                source,
            },
            other => other,
        })?;
        log::debug!("sheet '{}': {} records written", sheet.name, inserted);
        summaries.push(SheetSummary {
            sheet: sheet.name,
            school_type: sheet.ctx.school_type,
            year: sheet.ctx.year,
            semester: sheet.ctx.semester,
            inserted,
            skipped_blank: sheet.normalized.skipped_blank,
        });
    }

    Ok(UploadSummary {
        file: path.to_string_lossy().to_string(),
        total_inserted: summaries.iter().map(|s| s.inserted).sum(),
        sheets: summaries,
    })
}

fn prepare_sheets(
    sheets: &[SheetData],
    registered_at: &str,
    expected_period: Option<(i64, i64)>,
) -> Result<Vec<PreparedSheet>, PipelineError> {
    if sheets.is_empty() {
        return Err(PipelineError::parse("workbook has no sheets"));
    }
    let mut out = Vec::with_capacity(sheets.len());
    for sheet in sheets {
        let Some(school_type) = SchoolType::from_sheet_name(&sheet.name) else {
            return Err(PipelineError::parse(format!(
                "unrecognized sheet name '{}' (expected 초/초등/초등학교 or 중/중등/중학교)",
                sheet.name
            )));
        };
        let (year, semester) = header::extract_year_semester(&sheet.title)
            .map_err(|e| PipelineError::parse(format!("sheet '{}': {}", sheet.name, e)))?;
        if let Some((want_year, want_semester)) = expected_period {
            if (want_year, want_semester) != (year, semester) {
                return Err(PipelineError::parse(format!(
                    "sheet '{}' is titled {}학년도 {}학기 but {}학년도 {}학기 was selected",
                    sheet.name, year, semester, want_year, want_semester
                )));
            }
        }
        let ctx = SheetContext {
            year,
            semester,
            school_type,
            registered_at: registered_at.to_string(),
        };
        let normalized = normalize::normalize_rows(&sheet.rows, &ctx);
        log::debug!(
            "sheet '{}': {} records from row {}, {} blank rows skipped",
            sheet.name,
            normalized.records.len(),
            sheet.first_data_row + 1,
            normalized.skipped_blank
        );
        out.push(PreparedSheet {
            name: sheet.name.clone(),
            ctx,
            normalized,
        });
    }
    Ok(out)
}
