use crate::ipc::error::ok;
use crate::ipc::helpers::{
    get_optional_i64, get_optional_str, get_required_i64, get_required_str, require_db,
    resolve_path, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::search::{self, SearchQuery};
use crate::upload;
use serde_json::json;
use std::path::PathBuf;

fn upload_records(state: &AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let (conn, workspace) = require_db(state)?;
    let path = resolve_path(workspace, &get_required_str(params, "path")?);
    let year = get_optional_i64(params, "year")?;
    let semester = get_optional_i64(params, "semester")?;
    let expected = match (year, semester) {
        (Some(y), Some(s)) => Some((y, s)),
        (None, None) => None,
        _ => {
            return Err(HandlerErr::bad_params(
                "year and semester must be given together",
            ))
        }
    };
    let summary = upload::upload_workbook(conn, &state.config, &path, expected)?;
    serde_json::to_value(summary).map_err(|e| HandlerErr::new("internal", e.to_string()))
}

fn query_from_params(params: &serde_json::Value) -> Result<SearchQuery, HandlerErr> {
    Ok(SearchQuery {
        year: get_required_i64(params, "year")?,
        semester: get_required_i64(params, "semester")?,
        name: get_optional_str(params, "name"),
        birthday: get_optional_str(params, "birthday"),
    })
}

fn search_records(state: &AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let (conn, _) = require_db(state)?;
    let q = query_from_params(params)?;
    let rows = search::search(conn, &q);
    Ok(json!({ "count": rows.len(), "rows": rows }))
}

fn export_search(state: &AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let (conn, workspace) = require_db(state)?;
    let q = query_from_params(params)?;
    let out: PathBuf = resolve_path(workspace, &get_required_str(params, "outPath")?);
    let rows = search::search(conn, &q);
    search::export_results(&out, &rows, state.config.export_bom)
        .map_err(|e| HandlerErr::new("export_failed", format!("{e:#}")))?;
    Ok(json!({ "path": out.to_string_lossy(), "count": rows.len() }))
}

fn list_periods(state: &AppState) -> Result<serde_json::Value, HandlerErr> {
    let (conn, _) = require_db(state)?;
    Ok(json!({ "periods": search::available_periods(conn) }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "records.upload" => upload_records(state, &req.params),
        "records.periods" => list_periods(state),
        "records.search" => search_records(state, &req.params),
        "search.export" => export_search(state, &req.params),
        _ => return None,
    };
    Some(match result {
        Ok(v) => ok(&req.id, v),
        Err(e) => e.response(&req.id),
    })
}
