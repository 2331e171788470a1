use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::Error;
use crate::sheet::{AttendanceEntry, CellFlag, IdentityColumns, Snapshot, cell, locate_student};

/// Attendance date columns are named after the calendar date in this format.
pub const DATE_FORMAT: &str = "%d-%m-%Y";

/// Last Sunday of a 31-day month, used by the EU daylight saving rule.
fn last_sunday(year: i32, month: u32) -> NaiveDate {
    let last = NaiveDate::from_ymd_opt(year, month, 31).unwrap();
    last - Duration::days(last.weekday().num_days_from_sunday() as i64)
}

/// Civil "today" in Europe/Warsaw (CET/CEST). The pack carries no timezone
/// database, so the EU rule is applied directly: UTC+2 from the last Sunday
/// of March 01:00 UTC until the last Sunday of October 01:00 UTC, UTC+1
/// otherwise. Takes the instant as a parameter so the policies stay
/// deterministic under test.
pub fn warsaw_today(utc_now: DateTime<Utc>) -> NaiveDate {
    let year = utc_now.year();
    let dst_start = last_sunday(year, 3).and_hms_opt(1, 0, 0).unwrap().and_utc();
    let dst_end = last_sunday(year, 10).and_hms_opt(1, 0, 0).unwrap().and_utc();
    let offset = if utc_now >= dst_start && utc_now < dst_end {
        Duration::hours(2)
    } else {
        Duration::hours(1)
    };
    (utc_now + offset).date_naive()
}

/// Parses a client-supplied `DD-MM-YYYY` string. An absent or blank date is
/// reported separately from a malformed one.
pub fn parse_client_date(raw: &str) -> Result<NaiveDate, Error> {
    if raw.trim().is_empty() {
        return Err(Error::MissingDate);
    }
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).map_err(|_| Error::InvalidFormat)
}

/// The header cell name for a given attendance date.
pub fn column_name_for(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Read policy: any recorded past date (or today) may be read back, but the
/// date column must already exist and future dates are never readable.
pub fn validate_for_read(
    raw: &str,
    today: NaiveDate,
    existing_columns: &[String],
) -> Result<NaiveDate, Error> {
    let date = parse_client_date(raw)?;
    if date > today {
        return Err(Error::FutureDate);
    }
    let column = column_name_for(date);
    if !existing_columns.iter().any(|c| *c == column) {
        return Err(Error::ColumnNotFound(column));
    }
    Ok(date)
}

/// Create policy: attendance can only be newly initiated for the current
/// day. Past and future dates are rejected with distinct errors.
pub fn validate_for_create(raw: &str, today: NaiveDate) -> Result<NaiveDate, Error> {
    let date = parse_client_date(raw)?;
    if date > today {
        Err(Error::FutureDate)
    } else if date < today {
        Err(Error::PastDate)
    } else {
        Ok(date)
    }
}

/// One student's attendance as reported by the read endpoint. `Unset` cells
/// collapse to `false` here and nowhere earlier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub name: String,
    pub surname: String,
    pub group: String,
    pub attendance: bool,
}

/// Projects the snapshot into per-student records for one date column,
/// optionally filtered to a single group. Rows with no identity cells at
/// all are skipped; a row that merely misses trailing date cells still
/// projects, with `attendance = false`.
pub fn project_attendance(
    snapshot: &Snapshot,
    columns: IdentityColumns,
    date_column: usize,
    group_filter: Option<&str>,
) -> Vec<AttendanceRecord> {
    let mut records = Vec::new();
    for row in snapshot.data_rows() {
        let name = cell(row, columns.name).trim();
        let surname = cell(row, columns.surname).trim();
        let group = cell(row, columns.group).trim();
        if name.is_empty() && surname.is_empty() && group.is_empty() {
            continue;
        }
        if let Some(filter) = group_filter {
            if group != filter {
                continue;
            }
        }
        records.push(AttendanceRecord {
            name: name.to_string(),
            surname: surname.to_string(),
            group: group.to_string(),
            attendance: CellFlag::from_cell(cell(row, date_column)).as_bool(),
        });
    }
    records
}

/// The two batchUpdate requests that grow the table by one column and write
/// its header cell. Sent together so the append is atomic from the caller's
/// point of view.
pub fn append_column_requests(sheet_id: i64, column_index: usize, column_name: &str) -> Vec<Value> {
    vec![
        json!({
            "appendDimension": {
                "sheetId": sheet_id,
                "dimension": "COLUMNS",
                "length": 1,
            }
        }),
        json!({
            "updateCells": {
                "range": {
                    "sheetId": sheet_id,
                    "startRowIndex": 0,
                    "endRowIndex": 1,
                    "startColumnIndex": column_index,
                    "endColumnIndex": column_index + 1,
                },
                "rows": [
                    {
                        "values": [
                            {
                                "userEnteredValue": {
                                    "stringValue": column_name,
                                }
                            }
                        ]
                    }
                ],
                "fields": "userEnteredValue",
            }
        }),
    ]
}

/// A single boolean cell write with a BOOLEAN data-validation rule attached,
/// so spreadsheet UIs render the cell as a checkbox.
pub fn attendance_cell_request(
    sheet_id: i64,
    row_index: usize,
    column_index: usize,
    present: bool,
) -> Value {
    json!({
        "repeatCell": {
            "range": {
                "sheetId": sheet_id,
                "startRowIndex": row_index,
                "endRowIndex": row_index + 1,
                "startColumnIndex": column_index,
                "endColumnIndex": column_index + 1,
            },
            "cell": {
                "dataValidation": {
                    "condition": {
                        "type": "BOOLEAN",
                    },
                    "showCustomUi": true,
                },
                "userEnteredValue": {
                    "boolValue": present,
                },
            },
            "fields": "dataValidation,userEnteredValue.boolValue",
        }
    })
}

/// Cell writes staged for one atomic batchUpdate call.
#[derive(Debug)]
pub struct StagedUpdates {
    pub requests: Vec<Value>,
    pub updated: usize,
    pub skipped: Vec<String>,
}

/// Resolves each entry to a physical row and stages its cell write. Entries
/// whose student cannot be located are skipped and logged, not fatal; a
/// batch in which nothing matched at all is rejected as a whole.
pub fn build_attendance_updates(
    snapshot: &Snapshot,
    sheet_id: i64,
    date_column: usize,
    columns: IdentityColumns,
    entries: &[AttendanceEntry],
) -> Result<StagedUpdates, Error> {
    let mut requests = Vec::new();
    let mut skipped = Vec::new();

    for entry in entries {
        match locate_student(snapshot.data_rows(), entry, columns) {
            Some(row_index) => {
                requests.push(attendance_cell_request(
                    sheet_id,
                    row_index,
                    date_column,
                    entry.attendance,
                ));
                log::info!("Staged attendance update for {}", entry.describe());
            }
            None => {
                log::warn!(
                    "{}",
                    Error::StudentNotFound(entry.describe())
                );
                skipped.push(entry.describe());
            }
        }
    }

    if requests.is_empty() {
        return Err(Error::EmptyBatch);
    }

    let updated = requests.len();
    Ok(StagedUpdates {
        requests,
        updated,
        skipped,
    })
}
