use crate::audit::AuditLog;
use crate::ipc::error::ok;
use crate::ipc::helpers::{get_required_str, require_db, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::model::OperationKind;
use serde_json::json;

fn list_logs(state: &AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let (conn, _) = require_db(state)?;
    let kind_raw = get_required_str(params, "kind")?;
    let Some(kind) = OperationKind::parse(&kind_raw) else {
        return Err(HandlerErr::bad_params(format!(
            "kind must be upload, backup or restore (got {})",
            kind_raw
        )));
    };
    // Listing failures are not fatal for the caller.
    let entries = AuditLog::new(conn, kind).list().unwrap_or_else(|e| {
        log::error!("failed to list {}: {}", kind.table(), e);
        Vec::new()
    });
    Ok(json!({ "kind": kind, "entries": entries }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "logs.list" => Some(match list_logs(state, &req.params) {
            Ok(v) => ok(&req.id, v),
            Err(e) => e.response(&req.id),
        }),
        _ => None,
    }
}
