use crate::model::{SchoolType, TrainingRecord};
use crate::workbook::Cell;
use chrono::Datelike;

/// Positional column names of the upload sheet, starting at column A.
pub const SOURCE_COLUMNS: [&str; 11] = [
    "연번",
    "청번",
    "청명",
    "소속",
    "성명",
    "나이스 개인번호",
    "생년월일",
    "영역",
    "시작일",
    "종료일",
    "비고",
];

const COL_AGENCY_NUMBER: usize = 1;
const COL_AGENCY_NAME: usize = 2;
const COL_AFFILIATION: usize = 3;
const COL_TEACHER_NAME: usize = 4;
const COL_NICE_NUMBER: usize = 5;
const COL_BIRTHDAY: usize = 6;
const COL_AREA: usize = 7;
const COL_START_DATE: usize = 8;
const COL_END_DATE: usize = 9;
const COL_REMARKS: usize = 10;

/// Per-sheet values stamped onto every record.
#[derive(Debug, Clone)]
pub struct SheetContext {
    pub year: i64,
    pub semester: i64,
    pub school_type: SchoolType,
    /// Registration timestamp, already formatted.
    pub registered_at: String,
}

#[derive(Debug, Clone, Default)]
pub struct NormalizedSheet {
    pub records: Vec<TrainingRecord>,
    pub skipped_blank: usize,
}

pub fn normalize_rows(rows: &[Vec<Cell>], ctx: &SheetContext) -> NormalizedSheet {
    let mut out = NormalizedSheet::default();
    for row in rows {
        match normalize_row(row, ctx) {
            Some(rec) => out.records.push(rec),
            None => out.skipped_blank += 1,
        }
    }
    out
}

/// Returns `None` when both affiliation and teacher name are blank.
pub fn normalize_row(row: &[Cell], ctx: &SheetContext) -> Option<TrainingRecord> {
    let cell = |i: usize| row.get(i).unwrap_or(&Cell::Empty);

    let affiliation = text_field(cell(COL_AFFILIATION));
    let teacher_name = text_field(cell(COL_TEACHER_NAME));
    if affiliation.is_none() && teacher_name.is_none() {
        return None;
    }

    Some(TrainingRecord {
        year: ctx.year,
        semester: ctx.semester,
        agency_name: text_field(cell(COL_AGENCY_NAME)),
        affiliation,
        agency_number: int_field(cell(COL_AGENCY_NUMBER)),
        school_type: Some(ctx.school_type),
        teacher_name,
        nice_number: text_field(cell(COL_NICE_NUMBER)),
        birthday: text_field(cell(COL_BIRTHDAY)),
        area: text_field(cell(COL_AREA)),
        start_date: date_field(cell(COL_START_DATE)),
        end_date: date_field(cell(COL_END_DATE)),
        registration_date: Some(ctx.registered_at.clone()),
        remarks: text_field(cell(COL_REMARKS)),
    })
}

/// Blank cells become `None`; numbers are rendered without a trailing ".0".
pub fn text_field(c: &Cell) -> Option<String> {
    if c.is_blank() {
        return None;
    }
    let s = c.display();
    let t = s.trim();
    if t.is_empty() {
        None
    } else {
        Some(t.to_string())
    }
}

/// Integer coercion that never fails: anything non-integral is `None`.
pub fn int_field(c: &Cell) -> Option<i64> {
    match c {
        Cell::Int(i) => Some(*i),
        Cell::Float(f) => float_to_int(*f),
        Cell::Text(s) => parse_int_text(s),
        Cell::Empty | Cell::Bool(_) | Cell::Date(_) => None,
    }
}

/// Like `int_field`, but a real date cell is turned into `YYYYMMDD`.
pub fn date_field(c: &Cell) -> Option<i64> {
    match c {
        Cell::Date(dt) => {
            let d = dt.date();
            Some(d.year() as i64 * 10_000 + d.month() as i64 * 100 + d.day() as i64)
        }
        other => int_field(other),
    }
}

pub fn parse_int_text(s: &str) -> Option<i64> {
    let t = s.trim();
    if t.is_empty() {
        return None;
    }
    if let Ok(v) = t.parse::<i64>() {
        return Some(v);
    }
    t.parse::<f64>().ok().and_then(float_to_int)
}

fn float_to_int(f: f64) -> Option<i64> {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 9.0e15 {
        Some(f as i64)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ctx() -> SheetContext {
        SheetContext {
            year: 2024,
            semester: 1,
            school_type: SchoolType::Elementary,
            registered_at: "2024-03-02 09:00:00".to_string(),
        }
    }

    fn text(s: &str) -> Cell {
        Cell::Text(s.to_string())
    }

    fn full_row() -> Vec<Cell> {
        vec![
            Cell::Float(1.0),
            Cell::Float(12.0),
            text("서울특별시교육청"),
            text("한빛초등학교"),
            text("홍길동"),
            Cell::Float(1234567890.0),
            text("19800101-1"),
            text("디지털 역량"),
            Cell::Float(20240301.0),
            Cell::Float(20240630.0),
            Cell::Empty,
        ]
    }

    #[test]
    fn full_row_maps_every_column() {
        let rec = normalize_row(&full_row(), &ctx()).expect("record");
        assert_eq!(rec.year, 2024);
        assert_eq!(rec.semester, 1);
        assert_eq!(rec.agency_number, Some(12));
        assert_eq!(rec.agency_name.as_deref(), Some("서울특별시교육청"));
        assert_eq!(rec.affiliation.as_deref(), Some("한빛초등학교"));
        assert_eq!(rec.teacher_name.as_deref(), Some("홍길동"));
        assert_eq!(rec.nice_number.as_deref(), Some("1234567890"));
        assert_eq!(rec.birthday.as_deref(), Some("19800101-1"));
        assert_eq!(rec.area.as_deref(), Some("디지털 역량"));
        assert_eq!(rec.start_date, Some(20240301));
        assert_eq!(rec.end_date, Some(20240630));
        assert_eq!(rec.remarks, None);
        assert_eq!(rec.school_type, Some(SchoolType::Elementary));
        assert_eq!(rec.registration_date.as_deref(), Some("2024-03-02 09:00:00"));
    }

    #[test]
    fn rows_without_affiliation_and_name_are_skipped() {
        let mut blank = full_row();
        blank[COL_AFFILIATION] = Cell::Empty;
        blank[COL_TEACHER_NAME] = text("   ");
        let mut only_name = full_row();
        only_name[COL_AFFILIATION] = Cell::Empty;
        let mut only_affiliation = full_row();
        only_affiliation[COL_TEACHER_NAME] = Cell::Empty;

        let rows = vec![blank, only_name, only_affiliation, vec![Cell::Empty; 11], vec![]];
        let sheet = normalize_rows(&rows, &ctx());
        assert_eq!(sheet.records.len(), 2);
        assert_eq!(sheet.skipped_blank, 3);
        assert_eq!(sheet.records[0].affiliation, None);
        assert_eq!(sheet.records[1].teacher_name, None);
    }

    #[test]
    fn agency_number_coercion_never_fails() {
        assert_eq!(int_field(&text("42")), Some(42));
        assert_eq!(int_field(&text(" 42 ")), Some(42));
        assert_eq!(int_field(&text("42.0")), Some(42));
        assert_eq!(int_field(&text("4a2")), None);
        assert_eq!(int_field(&text("42.5")), None);
        assert_eq!(int_field(&Cell::Float(7.0)), Some(7));
        assert_eq!(int_field(&Cell::Float(f64::NAN)), None);
        assert_eq!(int_field(&Cell::Bool(true)), None);
        assert_eq!(int_field(&Cell::Empty), None);
    }

    #[test]
    fn blank_text_becomes_null() {
        assert_eq!(text_field(&text("")), None);
        assert_eq!(text_field(&text(" \t")), None);
        assert_eq!(text_field(&text(" 비고 ")), Some("비고".to_string()));
    }

    #[test]
    fn date_cells_become_yyyymmdd() {
        let dt = NaiveDate::from_ymd_opt(2024, 3, 4)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .expect("date");
        assert_eq!(date_field(&Cell::Date(dt)), Some(20240304));
        assert_eq!(date_field(&text("20240304")), Some(20240304));
        assert_eq!(date_field(&text("3월 4일")), None);
    }
}
