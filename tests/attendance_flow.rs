//! Drives the attendance core end to end against an in-memory table:
//! validate the date, append the date column, stage the cell batch, apply
//! it the way the spreadsheet would, and read the result back.

use chrono::NaiveDate;
use serde_json::Value;

use roster_backend::attendance::{
    append_column_requests, build_attendance_updates, column_name_for, project_attendance,
    validate_for_create, validate_for_read,
};
use roster_backend::error::Error;
use roster_backend::sheet::{AttendanceEntry, IdentityColumns, Snapshot, resolve_column};

const SHEET_ID: i64 = 913;

const IDS: IdentityColumns = IdentityColumns {
    name: 0,
    surname: 1,
    group: 2,
};

fn table(raw: &[&[&str]]) -> Vec<Vec<String>> {
    raw.iter()
        .map(|r| r.iter().map(|c| c.to_string()).collect())
        .collect()
}

fn entry(name: &str, surname: &str, group: &str, attendance: bool) -> AttendanceEntry {
    AttendanceEntry {
        name: name.to_string(),
        surname: surname.to_string(),
        group: group.to_string(),
        attendance,
    }
}

fn set_cell(rows: &mut [Vec<String>], row: usize, col: usize, value: String) {
    let cells = &mut rows[row];
    while cells.len() <= col {
        cells.push(String::new());
    }
    cells[col] = value;
}

/// Applies staged batchUpdate requests to the raw table the way the
/// spreadsheet backend would: header cell writes land as strings, boolean
/// cell writes land as the TRUE/FALSE literals a later read returns.
fn apply_requests(rows: &mut [Vec<String>], requests: &[Value]) {
    for request in requests {
        if let Some(update) = request.get("updateCells") {
            let row = update["range"]["startRowIndex"].as_u64().unwrap() as usize;
            let col = update["range"]["startColumnIndex"].as_u64().unwrap() as usize;
            let value = update["rows"][0]["values"][0]["userEnteredValue"]["stringValue"]
                .as_str()
                .unwrap();
            set_cell(rows, row, col, value.to_string());
        }
        if let Some(repeat) = request.get("repeatCell") {
            let row = repeat["range"]["startRowIndex"].as_u64().unwrap() as usize;
            let col = repeat["range"]["startColumnIndex"].as_u64().unwrap() as usize;
            let present = repeat["cell"]["userEnteredValue"]["boolValue"].as_bool().unwrap();
            set_cell(rows, row, col, if present { "TRUE" } else { "FALSE" }.to_string());
        }
    }
}

#[test]
fn first_submission_appends_the_date_column() {
    let mut rows = table(&[
        &["Imię", "Nazwisko", "Grupa"],
        &["Jan", "Kowalski", "1"],
    ]);
    let snapshot = Snapshot::new(rows.clone()).unwrap();

    let requests = append_column_requests(SHEET_ID, snapshot.width(), "01-06-2024");
    apply_requests(&mut rows, &requests);

    let snapshot = Snapshot::new(rows).unwrap();
    assert_eq!(snapshot.header().len(), 4);
    assert_eq!(snapshot.header()[3], "01-06-2024");
}

#[test]
fn writing_attendance_then_reading_it_back() {
    let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
    let date = validate_for_create("01-06-2024", today).unwrap();
    let column_name = column_name_for(date);

    let mut rows = table(&[
        &["Imię", "Nazwisko", "Grupa"],
        &["Jan", "Kowalski", "1"],
        &["Anna", "Nowak", "2"],
    ]);

    // First submission of the day: the date column does not exist yet.
    let snapshot = Snapshot::new(rows.clone()).unwrap();
    assert!(resolve_column(&snapshot.header(), &column_name).is_err());
    let date_column = snapshot.width();
    apply_requests(
        &mut rows,
        &append_column_requests(SHEET_ID, date_column, &column_name),
    );

    let snapshot = Snapshot::new(rows.clone()).unwrap();
    let staged = build_attendance_updates(
        &snapshot,
        SHEET_ID,
        date_column,
        IDS,
        &[entry("Jan", "Kowalski", "1", true)],
    )
    .unwrap();
    assert_eq!(staged.updated, 1);
    apply_requests(&mut rows, &staged.requests);

    // Read path: the date now validates for reading and projects per student.
    let snapshot = Snapshot::new(rows).unwrap();
    let header = snapshot.header();
    let read_date = validate_for_read("01-06-2024", today, &header).unwrap();
    let read_column = resolve_column(&header, &column_name_for(read_date)).unwrap();
    let records = project_attendance(&snapshot, IDS, read_column, None);

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].surname, "Kowalski");
    assert!(records[0].attendance);
    // Untouched student reads back as absent, never as an error.
    assert_eq!(records[1].surname, "Nowak");
    assert!(!records[1].attendance);
}

#[test]
fn resubmission_overwrites_idempotently() {
    let mut rows = table(&[
        &["Imię", "Nazwisko", "Grupa", "01-06-2024"],
        &["Jan", "Kowalski", "1", "TRUE"],
    ]);
    let snapshot = Snapshot::new(rows.clone()).unwrap();

    let staged = build_attendance_updates(
        &snapshot,
        SHEET_ID,
        3,
        IDS,
        &[entry("Jan", "Kowalski", "1", false)],
    )
    .unwrap();
    apply_requests(&mut rows, &staged.requests);

    let snapshot = Snapshot::new(rows).unwrap();
    let records = project_attendance(&snapshot, IDS, 3, None);
    assert!(!records[0].attendance);
}

#[test]
fn a_fully_unmatched_batch_is_rejected() {
    let snapshot = Snapshot::new(table(&[
        &["Imię", "Nazwisko", "Grupa", "01-06-2024"],
        &["Jan", "Kowalski", "1"],
    ]))
    .unwrap();

    let result = build_attendance_updates(
        &snapshot,
        SHEET_ID,
        3,
        IDS,
        &[entry("Adam", "Mickiewicz", "3", true)],
    );
    match result {
        Err(Error::EmptyBatch) => {}
        other => panic!("expected EmptyBatch, got {other:?}"),
    }
}

#[test]
fn the_date_gate_runs_before_any_column_work() {
    let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
    assert!(matches!(
        validate_for_create("02-06-2024", today),
        Err(Error::FutureDate)
    ));
    assert!(matches!(
        validate_for_create("31-05-2024", today),
        Err(Error::PastDate)
    ));
    // The read policy rejects the future even when such a column exists.
    let columns = vec!["31-12-2099".to_string()];
    assert!(matches!(
        validate_for_read("31-12-2099", today, &columns),
        Err(Error::FutureDate)
    ));
}
