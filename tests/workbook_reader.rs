#[path = "../src/workbook.rs"]
mod workbook;

use rust_xlsxwriter::Workbook;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};
use workbook::Cell;

const COLUMNS: [&str; 11] = [
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

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

fn write_fixture(path: &PathBuf, width: usize) {
    let mut wb = Workbook::new();
    let ws = wb.add_worksheet();
    ws.set_name("초").expect("sheet name");
    ws.write_string(0, 0, "2024학년도 1학기 원격연수").expect("title");
    ws.write_string(2, 0, "(단위: 명)").expect("note");
    for (c, name) in COLUMNS.iter().take(width).enumerate() {
        ws.write_string(4, c as u16, *name).expect("header");
    }
    ws.write_number(5, 0, 1).expect("serial");
    ws.write_number(5, 1, 12).expect("agency number");
    ws.write_string(5, 3, "한빛초등학교").expect("affiliation");
    ws.write_string(5, 4, "홍길동").expect("name");
    if width > 8 {
        ws.write_number(5, 8, 20240301).expect("start");
    }
    ws.write_string(7, 4, "김철수").expect("second name");
    wb.save(path).expect("save workbook");
}

#[test]
fn reads_title_and_rows_below_header() {
    let dir = temp_dir("elearnd-workbook");
    let path = dir.join("upload.xlsx");
    write_fixture(&path, COLUMNS.len());

    let sheets = workbook::read_workbook(&path, 4, &COLUMNS).expect("read");
    assert_eq!(sheets.len(), 1);
    let sheet = &sheets[0];
    assert_eq!(sheet.name, "초");
    assert_eq!(sheet.title, "2024학년도 1학기 원격연수");
    assert_eq!(sheet.first_data_row, 5);
    // Row 6, a blank row 7 and row 8.
    assert_eq!(sheet.rows.len(), 3);
    assert!(sheet.rows.iter().all(|r| r.len() == COLUMNS.len()));

    assert_eq!(sheet.rows[0][1], Cell::Float(12.0));
    assert_eq!(sheet.rows[0][4], Cell::Text("홍길동".to_string()));
    assert_eq!(sheet.rows[0][8].display(), "20240301");
    assert!(sheet.rows[0][10].is_blank());
    assert!(sheet.rows[1].iter().all(Cell::is_blank));
    assert_eq!(sheet.rows[2][4].display(), "김철수");

    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn narrow_sheet_is_rejected() {
    let dir = temp_dir("elearnd-workbook-narrow");
    let path = dir.join("narrow.xlsx");
    write_fixture(&path, 6);

    let err = workbook::read_workbook(&path, 4, &COLUMNS).expect_err("too few columns");
    assert!(format!("{:#}", err).contains("has 6 columns, expected 11"));

    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn unreadable_file_is_an_error() {
    let dir = temp_dir("elearnd-workbook-bad");
    let path = dir.join("not-really.xlsx");
    std::fs::write(&path, b"plain text").expect("write");
    assert!(workbook::read_workbook(&path, 4, &COLUMNS).is_err());
    let _ = std::fs::remove_dir_all(dir);
}
