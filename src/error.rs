use std::fmt;

/// Failures of the upload/restore pipelines.
///
/// Row-level coercion problems never show up here: they are absorbed by the
/// normalizer as nulls. Audit-log write failures are logged and swallowed.
#[derive(Debug)]
pub enum PipelineError {
    /// The input file is unusable as a whole (bad extension, unreadable
    /// workbook, unknown sheet name, missing year/semester or columns).
    Parse(String),
    /// A statement failed inside a batch; the transaction was rolled back.
    Insert { context: String, source: rusqlite::Error },
    /// Store access outside a batch (opening a transaction, committing).
    Db(rusqlite::Error),
}

impl PipelineError {
    pub fn parse(message: impl Into<String>) -> Self {
        PipelineError::Parse(message.into())
    }

    pub fn code(&self) -> &'static str {
        match self {
            PipelineError::Parse(_) => "parse_failed",
            PipelineError::Insert { .. } => "insert_failed",
            PipelineError::Db(_) => "db_query_failed",
        }
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::Parse(msg) => write!(f, "{}", msg),
            PipelineError::Insert { context, source } => {
                write!(f, "insert failed ({}): {}", context, source)
            }
            PipelineError::Db(e) => write!(f, "database error: {}", e),
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PipelineError::Parse(_) => None,
            PipelineError::Insert { source, .. } => Some(source),
            PipelineError::Db(e) => Some(e),
        }
    }
}

impl From<rusqlite::Error> for PipelineError {
    fn from(e: rusqlite::Error) -> Self {
        PipelineError::Db(e)
    }
}
