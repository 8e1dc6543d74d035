use crate::config::Config;
use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use serde_json::json;
use std::path::PathBuf;

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string())
        }),
    )
}

fn handle_workspace_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    let p = req
        .params
        .get("path")
        .and_then(|v| v.as_str())
        .map(PathBuf::from);
    let Some(path) = p else {
        return err(&req.id, "bad_params", "missing params.path", None);
    };

    match db::open_db(&path) {
        Ok(conn) => {
            // A broken elearnd.json must not keep the workspace from opening.
            let config = match Config::load(&path) {
                Ok(c) => c,
                Err(e) => {
                    log::warn!("using default config: {:#}", e);
                    Config::default()
                }
            };
            log::info!("workspace opened: {}", path.to_string_lossy());
            state.workspace = Some(path.clone());
            state.db = Some(conn);
            state.config = config;
            ok(
                &req.id,
                json!({
                    "workspacePath": path.to_string_lossy(),
                    "backupDir": state.config.backup_dir_in(&path).to_string_lossy(),
                    "headerSkipRows": state.config.header_skip_rows,
                }),
            )
        }
        Err(e) => {
            log::error!("cannot open workspace {}: {:#}", path.to_string_lossy(), e);
            err(&req.id, "db_open_failed", format!("{e:#}"), None)
        }
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "workspace.select" => Some(handle_workspace_select(state, req)),
        _ => None,
    }
}
