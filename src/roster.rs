use std::collections::BTreeSet;

use serde_json::{Map, Value, json};

use crate::error::Error;
use crate::sheet::{Snapshot, cell, resolve_column};

/// Distinct values of one column across all data rows, sorted. Cells the
/// remote API dropped from short rows do not contribute an empty value.
pub fn unique_column_values(snapshot: &Snapshot, column: &str) -> Result<Vec<String>, Error> {
    let header = snapshot.header();
    let index = resolve_column(&header, column)?;

    let mut values = BTreeSet::new();
    for row in snapshot.data_rows() {
        if row.len() > index {
            values.insert(row[index].clone());
        }
    }
    Ok(values.into_iter().collect())
}

/// Data rows whose group cell equals the filter exactly.
pub fn rows_in_group(snapshot: &Snapshot, group_column: &str, group: &str) -> Result<Vec<Vec<String>>, Error> {
    let header = snapshot.header();
    let index = resolve_column(&header, group_column)?;
    Ok(snapshot
        .data_rows()
        .iter()
        .filter(|row| cell(row, index) == group)
        .cloned()
        .collect())
}

/// A new student row must carry exactly the spreadsheet's columns as keys.
/// Both directions of the mismatch are reported so the form can be fixed.
pub fn check_row_compatibility(header: &[String], data: &Map<String, Value>) -> Result<(), Error> {
    let missing: Vec<String> = header
        .iter()
        .filter(|col| !data.contains_key(*col))
        .cloned()
        .collect();
    let extra: Vec<String> = data
        .keys()
        .filter(|key| !header.contains(key))
        .cloned()
        .collect();

    if missing.is_empty() && extra.is_empty() {
        Ok(())
    } else {
        Err(Error::IncompatibleRow { missing, extra })
    }
}

/// Lays the JSON fields out positionally under the header. Unknown keys
/// were already rejected by the compatibility check.
pub fn assemble_row(header: &[String], data: &Map<String, Value>) -> Vec<String> {
    let mut row = vec![String::new(); header.len()];
    for (key, value) in data {
        if let Some(index) = header.iter().position(|col| col == key) {
            row[index] = field_to_string(value);
        }
    }
    row
}

fn field_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Polish header names mapped to the semantic names the frontend renders.
/// Hardcoded for now; the customer will eventually pick column types so
/// training forms can be generated from them.
pub fn column_translations() -> Value {
    json!({
        "Imię": "Name",
        "Nazwisko": "Surname",
        "Telefon": "Phone",
        "Mail": "Mail",
        "Rocznik": "Year",
        "Adres": "Adress",
        "Kod pocztowy": "PostalCode",
        "Grupa": "Group",
        "Rozmiar koszulki": "Size",
        "Uwagi": "Comments",
        "Zgoda na regulamin": "Agree",
        "Jednorazowy trening": "OneTimer",
    })
}
