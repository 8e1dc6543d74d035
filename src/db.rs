use rusqlite::Connection;
use std::path::Path;

pub const DB_FILE_NAME: &str = "elearning.sqlite3";

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join(DB_FILE_NAME);
    let conn = Connection::open(db_path)?;
    init_schema(&conn)?;
    Ok(conn)
}

#[cfg(test)]
pub fn open_in_memory() -> anyhow::Result<Connection> {
    let conn = Connection::open_in_memory()?;
    init_schema(&conn)?;
    Ok(conn)
}

fn init_schema(conn: &Connection) -> anyhow::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS training_records(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            year INTEGER NOT NULL,
            semester INTEGER NOT NULL,
            agency_name TEXT,
            affiliation TEXT,
            agency_number INTEGER,
            school_type TEXT,
            teacher_name TEXT,
            nice_number TEXT,
            birthday TEXT,
            area TEXT,
            start_date INTEGER,
            end_date INTEGER,
            registration_date TEXT,
            remarks TEXT
        )",
        [],
    )?;

    // Databases from before school_type carried two flag columns instead.
    migrate_school_flags(conn)?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_training_records_period
         ON training_records(year, semester, teacher_name)",
        [],
    )?;

    for table in ["upload_logs", "backup_logs", "restore_logs"] {
        conn.execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS {}(
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    logged_at TEXT NOT NULL,
                    file_name TEXT NOT NULL,
                    status INTEGER NOT NULL DEFAULT 0,
                    detail TEXT
                )",
                table
            ),
            [],
        )?;
    }

    Ok(())
}

fn migrate_school_flags(conn: &Connection) -> anyhow::Result<()> {
    let has_ele = table_has_column(conn, "training_records", "ele_school")?;
    let has_mid = table_has_column(conn, "training_records", "mid_school")?;
    if !has_ele && !has_mid {
        return Ok(());
    }

    let tx = conn.unchecked_transaction()?;
    if !table_has_column(&tx, "training_records", "school_type")? {
        tx.execute("ALTER TABLE training_records ADD COLUMN school_type TEXT", [])?;
    }
    if has_ele {
        tx.execute(
            "UPDATE training_records SET school_type = '초'
             WHERE school_type IS NULL AND TRIM(COALESCE(ele_school, '')) <> ''",
            [],
        )?;
        tx.execute("ALTER TABLE training_records DROP COLUMN ele_school", [])?;
    }
    if has_mid {
        tx.execute(
            "UPDATE training_records SET school_type = '중'
             WHERE school_type IS NULL AND TRIM(COALESCE(mid_school, '')) <> ''",
            [],
        )?;
        tx.execute("ALTER TABLE training_records DROP COLUMN mid_school", [])?;
    }
    tx.commit()?;
    log::info!("migrated ele_school/mid_school flags to school_type");
    Ok(())
}

pub fn table_has_column(conn: &Connection, table: &str, column: &str) -> anyhow::Result<bool> {
    let sql = format!("PRAGMA table_info({})", table);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_school_flags_are_folded_into_school_type() {
        let conn = Connection::open_in_memory().expect("open");
        conn.execute_batch(
            "CREATE TABLE training_records(
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                year INTEGER NOT NULL,
                semester INTEGER NOT NULL,
                agency_name TEXT,
                affiliation TEXT,
                agency_number INTEGER,
                ele_school TEXT,
                mid_school TEXT,
                teacher_name TEXT,
                nice_number TEXT,
                birthday TEXT,
                area TEXT,
                start_date INTEGER,
                end_date INTEGER,
                registration_date TEXT,
                remarks TEXT
            );
            INSERT INTO training_records(year, semester, ele_school, teacher_name)
                VALUES (2023, 2, '초', '가');
            INSERT INTO training_records(year, semester, mid_school, teacher_name)
                VALUES (2023, 2, '중', '나');
            INSERT INTO training_records(year, semester, teacher_name)
                VALUES (2023, 2, '다');",
        )
        .expect("legacy schema");

        init_schema(&conn).expect("migrate");

        assert!(!table_has_column(&conn, "training_records", "ele_school").expect("pragma"));
        assert!(!table_has_column(&conn, "training_records", "mid_school").expect("pragma"));
        let mut stmt = conn
            .prepare("SELECT teacher_name, school_type FROM training_records ORDER BY id")
            .expect("prepare");
        let rows: Vec<(String, Option<String>)> = stmt
            .query_map([], |r| Ok((r.get(0)?, r.get(1)?)))
            .expect("query")
            .collect::<Result<_, _>>()
            .expect("rows");
        assert_eq!(
            rows,
            vec![
                ("가".to_string(), Some("초".to_string())),
                ("나".to_string(), Some("중".to_string())),
                ("다".to_string(), None),
            ]
        );
    }

    #[test]
    fn schema_init_is_idempotent() {
        let conn = open_in_memory().expect("open");
        init_schema(&conn).expect("second init");
        assert!(table_has_column(&conn, "restore_logs", "detail").expect("pragma"));
    }
}
