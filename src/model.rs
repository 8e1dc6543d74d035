use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SchoolType {
    Elementary,
    Middle,
}

impl SchoolType {
    /// Short code stored in `training_records.school_type`.
    pub fn code(self) -> &'static str {
        match self {
            SchoolType::Elementary => "초",
            SchoolType::Middle => "중",
        }
    }

    pub fn from_code(code: &str) -> Option<SchoolType> {
        match code.trim() {
            "초" => Some(SchoolType::Elementary),
            "중" => Some(SchoolType::Middle),
            _ => None,
        }
    }

    /// Sheet names are matched exactly (after trimming); anything else is rejected.
    pub fn from_sheet_name(name: &str) -> Option<SchoolType> {
        match name.trim() {
            "초" | "초등" | "초등학교" => Some(SchoolType::Elementary),
            "중" | "중등" | "중학교" => Some(SchoolType::Middle),
            _ => None,
        }
    }
}

/// One row of `training_records`, excluding the identity column.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingRecord {
    pub year: i64,
    pub semester: i64,
    pub agency_name: Option<String>,
    pub affiliation: Option<String>,
    pub agency_number: Option<i64>,
    pub school_type: Option<SchoolType>,
    pub teacher_name: Option<String>,
    pub nice_number: Option<String>,
    pub birthday: Option<String>,
    pub area: Option<String>,
    pub start_date: Option<i64>,
    pub end_date: Option<i64>,
    pub registration_date: Option<String>,
    pub remarks: Option<String>,
}

/// Column order used by the records table, backups and search exports.
pub const RECORD_COLUMNS: [&str; 14] = [
    "year",
    "semester",
    "agency_name",
    "affiliation",
    "agency_number",
    "school_type",
    "teacher_name",
    "nice_number",
    "birthday",
    "area",
    "start_date",
    "end_date",
    "registration_date",
    "remarks",
];

pub const REGISTRATION_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

impl TrainingRecord {
    /// Values in `RECORD_COLUMNS` order, rendered for CSV output. Nulls become "".
    pub fn to_csv_fields(&self) -> Vec<String> {
        fn opt_s(v: &Option<String>) -> String {
            v.clone().unwrap_or_default()
        }
        fn opt_i(v: Option<i64>) -> String {
            v.map(|n| n.to_string()).unwrap_or_default()
        }
        vec![
            self.year.to_string(),
            self.semester.to_string(),
            opt_s(&self.agency_name),
            opt_s(&self.affiliation),
            opt_i(self.agency_number),
            self.school_type
                .map(|s| s.code().to_string())
                .unwrap_or_default(),
            opt_s(&self.teacher_name),
            opt_s(&self.nice_number),
            opt_s(&self.birthday),
            opt_s(&self.area),
            opt_i(self.start_date),
            opt_i(self.end_date),
            opt_s(&self.registration_date),
            opt_s(&self.remarks),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum OperationKind {
    Upload,
    Backup,
    Restore,
}

impl OperationKind {
    pub fn parse(s: &str) -> Option<OperationKind> {
        match s {
            "upload" => Some(OperationKind::Upload),
            "backup" => Some(OperationKind::Backup),
            "restore" => Some(OperationKind::Restore),
            _ => None,
        }
    }

    pub fn table(self) -> &'static str {
        match self {
            OperationKind::Upload => "upload_logs",
            OperationKind::Backup => "backup_logs",
            OperationKind::Restore => "restore_logs",
        }
    }

    fn verb_label(self) -> &'static str {
        match self {
            OperationKind::Upload => "업로드",
            OperationKind::Backup => "백업",
            OperationKind::Restore => "복구",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum OpStatus {
    Pending,
    Success,
    Failure,
}

impl OpStatus {
    pub fn code(self) -> i64 {
        match self {
            OpStatus::Pending => 0,
            OpStatus::Success => 1,
            OpStatus::Failure => 2,
        }
    }

    pub fn from_code(code: i64) -> Option<OpStatus> {
        match code {
            0 => Some(OpStatus::Pending),
            1 => Some(OpStatus::Success),
            2 => Some(OpStatus::Failure),
            _ => None,
        }
    }

    /// User-facing label, e.g. "업로드 완료".
    pub fn label(self, kind: OperationKind) -> String {
        match self {
            OpStatus::Pending => "처리중".to_string(),
            OpStatus::Success => format!("{} 완료", kind.verb_label()),
            OpStatus::Failure => format!("{} 실패", kind.verb_label()),
        }
    }
}
