use crate::error::PipelineError;
use crate::model::{SchoolType, TrainingRecord};
use rusqlite::{params, Connection, Row, Transaction};

const INSERT_RECORD_SQL: &str = "INSERT INTO training_records(
        year, semester, agency_name, affiliation, agency_number, school_type,
        teacher_name, nice_number, birthday, area, start_date, end_date,
        registration_date, remarks
    ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)";

pub const SELECT_RECORD_COLUMNS: &str = "year, semester, agency_name, affiliation, agency_number,
        school_type, teacher_name, nice_number, birthday, area, start_date, end_date,
        registration_date, remarks";

/// Inserts a batch inside one transaction. Either every record lands or none.
pub fn insert_batch(conn: &Connection, records: &[TrainingRecord]) -> Result<usize, PipelineError> {
    let tx = conn.unchecked_transaction()?;
    if let Err(e) = insert_in_tx(&tx, records) {
        let _ = tx.rollback();
        return Err(e);
    }
    tx.commit()?;
    Ok(records.len())
}

/// Inserts into an open transaction. The caller owns commit/rollback.
pub fn insert_in_tx(tx: &Transaction<'_>, records: &[TrainingRecord]) -> Result<(), PipelineError> {
    let mut stmt = tx
        .prepare_cached(INSERT_RECORD_SQL)
        .map_err(|e| PipelineError::Insert {
            context: "prepare".to_string(),
            source: e,
        })?;
    for (i, r) in records.iter().enumerate() {
        stmt.execute(params![
            r.year,
            r.semester,
            r.agency_name,
            r.affiliation,
            r.agency_number,
            r.school_type.map(|s| s.code()),
            r.teacher_name,
            r.nice_number,
            r.birthday,
            r.area,
            r.start_date,
            r.end_date,
            r.registration_date,
            r.remarks,
        ])
        .map_err(|e| PipelineError::Insert {
            context: format!("record {}", i + 1),
            source: e,
        })?;
    }
    Ok(())
}

/// Maps a row selected with `SELECT_RECORD_COLUMNS`.
pub fn record_from_row(row: &Row<'_>) -> rusqlite::Result<TrainingRecord> {
    let school: Option<String> = row.get(5)?;
    Ok(TrainingRecord {
        year: row.get(0)?,
        semester: row.get(1)?,
        agency_name: row.get(2)?,
        affiliation: row.get(3)?,
        agency_number: row.get(4)?,
        school_type: school.as_deref().and_then(SchoolType::from_code),
        teacher_name: row.get(6)?,
        nice_number: row.get(7)?,
        birthday: row.get(8)?,
        area: row.get(9)?,
        start_date: row.get(10)?,
        end_date: row.get(11)?,
        registration_date: row.get(12)?,
        remarks: row.get(13)?,
    })
}

pub fn all_records(conn: &Connection) -> rusqlite::Result<Vec<TrainingRecord>> {
    let sql = format!(
        "SELECT {} FROM training_records ORDER BY id",
        SELECT_RECORD_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], record_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

#[cfg(test)]
pub fn count_records(conn: &Connection) -> rusqlite::Result<i64> {
    conn.query_row("SELECT COUNT(*) FROM training_records", [], |r| r.get(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn record(name: &str) -> TrainingRecord {
        TrainingRecord {
            year: 2024,
            semester: 1,
            agency_name: Some("서울특별시교육청".to_string()),
            affiliation: Some("한빛초등학교".to_string()),
            agency_number: Some(1),
            school_type: Some(SchoolType::Elementary),
            teacher_name: Some(name.to_string()),
            nice_number: None,
            birthday: Some("19800101-1".to_string()),
            area: None,
            start_date: Some(20240301),
            end_date: Some(20240630),
            registration_date: Some("2024-03-02 09:00:00".to_string()),
            remarks: None,
        }
    }

    #[test]
    fn batch_commits_all_rows() {
        let conn = db::open_in_memory().expect("open db");
        let batch: Vec<_> = (0..10).map(|i| record(&format!("교사{}", i))).collect();
        assert_eq!(insert_batch(&conn, &batch).expect("insert"), 10);
        let stored = all_records(&conn).expect("select");
        assert_eq!(stored, batch);
    }

    #[test]
    fn failing_row_rolls_back_whole_batch() {
        let conn = db::open_in_memory().expect("open db");
        conn.execute_batch(
            "CREATE TRIGGER reject_marked BEFORE INSERT ON training_records
             WHEN NEW.teacher_name = 'REJECT'
             BEGIN SELECT RAISE(ABORT, 'rejected row'); END;",
        )
        .expect("create trigger");

        let mut batch: Vec<_> = (0..10).map(|i| record(&format!("교사{}", i))).collect();
        batch[4] = record("REJECT");

        let err = insert_batch(&conn, &batch).expect_err("batch must fail");
        match err {
            PipelineError::Insert { ref context, .. } => assert_eq!(context, "record 5"),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(count_records(&conn).expect("count"), 0);

        // The connection is still usable after the rollback.
        batch[4] = record("교사4");
        insert_batch(&conn, &batch).expect("retry insert");
        assert_eq!(count_records(&conn).expect("count"), 10);
    }
}
