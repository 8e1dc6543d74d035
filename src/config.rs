use anyhow::Context;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "elearnd.json";

/// Per-workspace settings, read from `elearnd.json` in the workspace root.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Rows above the column header row of an upload sheet (the title sits in A1).
    pub header_skip_rows: usize,
    /// Backup directory; relative paths are resolved against the workspace.
    pub backup_dir: PathBuf,
    /// Prefix CSV output with a UTF-8 BOM so spreadsheet apps detect the encoding.
    pub export_bom: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            header_skip_rows: 4,
            backup_dir: PathBuf::from("backup"),
            export_bom: true,
        }
    }
}

impl Config {
    /// Missing file means defaults; a malformed file is an error.
    pub fn load(workspace: &Path) -> anyhow::Result<Config> {
        let path = workspace.join(CONFIG_FILE_NAME);
        if !path.is_file() {
            return Ok(Config::default());
        }
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.to_string_lossy()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("invalid config {}", path.to_string_lossy()))
    }

    pub fn backup_dir_in(&self, workspace: &Path) -> PathBuf {
        if self.backup_dir.is_absolute() {
            self.backup_dir.clone()
        } else {
            workspace.join(&self.backup_dir)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_other_defaults() {
        let cfg: Config = serde_json::from_str(r#"{ "headerSkipRows": 2 }"#).expect("parse");
        assert_eq!(cfg.header_skip_rows, 2);
        assert_eq!(cfg.backup_dir, PathBuf::from("backup"));
        assert!(cfg.export_bom);
    }

    #[test]
    fn relative_backup_dir_resolves_under_workspace() {
        let cfg = Config::default();
        let ws = Path::new("/data/ws");
        assert_eq!(cfg.backup_dir_in(ws), PathBuf::from("/data/ws/backup"));
    }
}
