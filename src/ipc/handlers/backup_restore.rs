use crate::backup;
use crate::ipc::error::ok;
use crate::ipc::helpers::{get_optional_str, get_required_str, require_db, resolve_path, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::restore;
use serde_json::json;

fn create_backup(state: &AppState) -> Result<serde_json::Value, HandlerErr> {
    let (conn, workspace) = require_db(state)?;
    let summary = backup::create_backup(conn, &state.config, workspace)
        .map_err(|e| HandlerErr::new("backup_failed", format!("{e:#}")))?;
    serde_json::to_value(summary).map_err(|e| HandlerErr::new("internal", e.to_string()))
}

fn list_backups(state: &AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let (_, workspace) = require_db(state)?;
    let dir = match get_optional_str(params, "dir") {
        Some(d) => resolve_path(workspace, &d),
        None => state.config.backup_dir_in(workspace),
    };
    let prefix = get_optional_str(params, "prefix");
    let files = backup::list_backups(&dir, prefix.as_deref())
        .map_err(|e| HandlerErr::new("io_failed", format!("{e:#}")))?;
    Ok(json!({ "dir": dir.to_string_lossy(), "files": files }))
}

/// `path` may be a bare file name from `backups.list`; it is looked up in
/// the backup directory first.
fn restore_backup(state: &AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let (conn, workspace) = require_db(state)?;
    let raw = get_required_str(params, "path")?;
    let confirmed = params
        .get("confirm")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);
    if !confirmed {
        return Err(HandlerErr::new(
            "confirmation_required",
            "restore deletes every current record; resend with confirm: true",
        ));
    }

    let in_backup_dir = resolve_path(&state.config.backup_dir_in(workspace), &raw);
    let path = if in_backup_dir.is_file() {
        in_backup_dir
    } else {
        resolve_path(workspace, &raw)
    };
    if !path.is_file() {
        return Err(HandlerErr {
            code: "not_found",
            message: format!("backup file not found: {}", raw),
            details: Some(json!({ "path": path.to_string_lossy() })),
        });
    }

    let summary = restore::restore_from_file(conn, &path)?;
    serde_json::to_value(summary).map_err(|e| HandlerErr::new("internal", e.to_string()))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "backup.create" => create_backup(state),
        "backups.list" => list_backups(state, &req.params),
        "backup.restore" => restore_backup(state, &req.params),
        _ => return None,
    };
    Some(match result {
        Ok(v) => ok(&req.id, v),
        Err(e) => e.response(&req.id),
    })
}
