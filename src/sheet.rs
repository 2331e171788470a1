use serde::{Deserialize, Serialize};

use crate::error::Error;

/// A full rectangular read of one sheet. Row 0 is the header row; rows
/// 1..N are data rows. Data rows may be shorter than the header (the
/// remote API drops trailing empty cells) and missing cells always read
/// as the empty string.
#[derive(Debug, Clone)]
pub struct Snapshot {
    rows: Vec<Vec<String>>,
}

impl Snapshot {
    /// A sheet with no rows at all has no header to resolve against, so it
    /// is rejected here rather than at every call site.
    pub fn new(rows: Vec<Vec<String>>) -> Result<Self, Error> {
        if rows.is_empty() {
            return Err(Error::EmptyTable);
        }
        Ok(Snapshot { rows })
    }

    /// Header cells, trimmed. The source does not enforce uniqueness.
    pub fn header(&self) -> Vec<String> {
        self.rows[0].iter().map(|c| c.trim().to_string()).collect()
    }

    pub fn width(&self) -> usize {
        self.rows[0].len()
    }

    /// Rows 1..N, in sheet order.
    pub fn data_rows(&self) -> &[Vec<String>] {
        &self.rows[1..]
    }
}

/// Padded cell access: positions past the end of a short row are empty.
pub fn cell(row: &[String], index: usize) -> &str {
    row.get(index).map(String::as_str).unwrap_or("")
}

/// Linear scan for an exact header match. A missing column is a hard,
/// distinguishable failure; defaulting to any index would silently write
/// attendance into the wrong column.
pub fn resolve_column(header: &[String], name: &str) -> Result<usize, Error> {
    header
        .iter()
        .position(|col| col == name)
        .ok_or_else(|| Error::ColumnNotFound(name.to_string()))
}

/// Positions of the three identity columns within a header row.
#[derive(Debug, Clone, Copy)]
pub struct IdentityColumns {
    pub name: usize,
    pub surname: usize,
    pub group: usize,
}

impl IdentityColumns {
    pub fn resolve(
        header: &[String],
        name_column: &str,
        surname_column: &str,
        group_column: &str,
    ) -> Result<Self, Error> {
        Ok(IdentityColumns {
            name: resolve_column(header, name_column)?,
            surname: resolve_column(header, surname_column)?,
            group: resolve_column(header, group_column)?,
        })
    }
}

/// What an attendance cell actually holds. The sheet stores booleans as the
/// literal strings `TRUE`/`FALSE`; a cell that was never written is empty.
/// `Unset` only collapses to `false` at the public read API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellFlag {
    Present,
    Absent,
    Unset,
}

impl CellFlag {
    pub fn from_cell(raw: &str) -> Self {
        match raw.trim() {
            "TRUE" => CellFlag::Present,
            "FALSE" => CellFlag::Absent,
            _ => CellFlag::Unset,
        }
    }

    pub fn as_bool(self) -> bool {
        matches!(self, CellFlag::Present)
    }
}

/// One entry of an attendance submission, matched to a physical row by the
/// (name, surname, group) triple.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceEntry {
    pub name: String,
    pub surname: String,
    pub group: String,
    #[serde(default)]
    pub attendance: bool,
}

impl AttendanceEntry {
    pub fn describe(&self) -> String {
        format!("{} {} (group {})", self.name, self.surname, self.group)
    }
}

/// Scans data rows in order for the first row whose trimmed identity triple
/// equals the entry's. Returns the row index within the full snapshot
/// (1-based, accounting for the header row).
///
/// The triple is not guaranteed unique by the data source; duplicates always
/// resolve to the first matching row, in sheet order.
pub fn locate_student(
    data_rows: &[Vec<String>],
    entry: &AttendanceEntry,
    columns: IdentityColumns,
) -> Option<usize> {
    let wanted = (
        entry.name.trim(),
        entry.surname.trim(),
        entry.group.trim(),
    );
    for (i, row) in data_rows.iter().enumerate() {
        let found = (
            cell(row, columns.name).trim(),
            cell(row, columns.surname).trim(),
            cell(row, columns.group).trim(),
        );
        if found == wanted {
            return Some(i + 1);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(raw: &[&[&str]]) -> Vec<Vec<String>> {
        raw.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    fn entry(name: &str, surname: &str, group: &str) -> AttendanceEntry {
        AttendanceEntry {
            name: name.to_string(),
            surname: surname.to_string(),
            group: group.to_string(),
            attendance: true,
        }
    }

    const IDS: IdentityColumns = IdentityColumns {
        name: 0,
        surname: 1,
        group: 2,
    };

    #[test]
    fn empty_table_is_not_a_snapshot() {
        assert!(matches!(Snapshot::new(vec![]), Err(Error::EmptyTable)));
    }

    #[test]
    fn header_cells_are_trimmed() {
        let snap = Snapshot::new(rows(&[&[" Imię ", "Nazwisko"]])).unwrap();
        assert_eq!(snap.header(), vec!["Imię", "Nazwisko"]);
    }

    #[test]
    fn resolve_finds_each_present_column() {
        let header = vec!["Imię".to_string(), "Nazwisko".to_string(), "Grupa".to_string()];
        assert_eq!(resolve_column(&header, "Imię").unwrap(), 0);
        assert_eq!(resolve_column(&header, "Grupa").unwrap(), 2);
    }

    #[test]
    fn resolve_fails_distinguishably_for_absent_columns() {
        let header = vec!["Imię".to_string()];
        match resolve_column(&header, "01-06-2024") {
            Err(Error::ColumnNotFound(name)) => assert_eq!(name, "01-06-2024"),
            other => panic!("expected ColumnNotFound, got {other:?}"),
        }
    }

    #[test]
    fn resolve_fails_on_empty_header() {
        assert!(resolve_column(&[], "Imię").is_err());
    }

    #[test]
    fn short_rows_read_as_empty_cells() {
        let row = vec!["Jan".to_string()];
        assert_eq!(cell(&row, 0), "Jan");
        assert_eq!(cell(&row, 5), "");
    }

    #[test]
    fn cell_flag_decodes_the_three_states() {
        assert_eq!(CellFlag::from_cell("TRUE"), CellFlag::Present);
        assert_eq!(CellFlag::from_cell("FALSE"), CellFlag::Absent);
        assert_eq!(CellFlag::from_cell(""), CellFlag::Unset);
        assert_eq!(CellFlag::from_cell("yes"), CellFlag::Unset);
        assert!(CellFlag::from_cell("TRUE").as_bool());
        assert!(!CellFlag::from_cell("FALSE").as_bool());
        assert!(!CellFlag::from_cell("").as_bool());
    }

    #[test]
    fn locate_returns_one_based_row_index() {
        let data = rows(&[
            &["Anna", "Nowak", "2"],
            &["Jan", "Kowalski", "1"],
        ]);
        assert_eq!(locate_student(&data, &entry("Jan", "Kowalski", "1"), IDS), Some(2));
    }

    #[test]
    fn locate_trims_incidental_whitespace() {
        let data = rows(&[&[" Jan ", "Kowalski ", " 1"]]);
        assert_eq!(locate_student(&data, &entry("Jan", "Kowalski", "1"), IDS), Some(1));
    }

    #[test]
    fn locate_prefers_the_first_duplicate() {
        let data = rows(&[
            &["Jan", "Kowalski", "1"],
            &["Jan", "Kowalski", "1"],
        ]);
        assert_eq!(locate_student(&data, &entry("Jan", "Kowalski", "1"), IDS), Some(1));
    }

    #[test]
    fn locate_treats_short_rows_as_empty_strings() {
        let data = rows(&[&["Jan"]]);
        assert_eq!(locate_student(&data, &entry("Jan", "Kowalski", "1"), IDS), None);
        assert_eq!(locate_student(&data, &entry("Jan", "", ""), IDS), Some(1));
    }

    #[test]
    fn locate_reports_not_found_after_a_full_scan() {
        let data = rows(&[&["Anna", "Nowak", "2"]]);
        assert_eq!(locate_student(&data, &entry("Jan", "Kowalski", "1"), IDS), None);
    }
}
