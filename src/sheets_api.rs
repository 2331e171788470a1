use reqwest::StatusCode;
use serde_json::{Value, json};

use crate::error::Error;

const SHEETS_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// Thin client for the Google Sheets v4 REST API. Every call takes the
/// bearer token explicitly; nothing here retries, and the read and write
/// calls of one request are not transactionally linked.
pub struct SheetsClient {
    http: reqwest::Client,
    spreadsheet_id: String,
}

impl SheetsClient {
    pub fn new(spreadsheet_id: String) -> Self {
        SheetsClient {
            http: reqwest::Client::new(),
            spreadsheet_id,
        }
    }

    fn values_url(&self, sheet_name: &str, suffix: &str) -> String {
        // Sheet names may contain spaces ("Lista obecności").
        let range = urlencoding::encode(&format!("{sheet_name}!A1:Z")).into_owned();
        format!("{SHEETS_BASE}/{}/values/{range}{suffix}", self.spreadsheet_id)
    }

    /// Full rectangular read of one sheet. An absent `values` key means the
    /// sheet has no rows at all, which is a valid empty table, not an error.
    pub async fn read_table(&self, token: &str, sheet_name: &str) -> Result<Vec<Vec<String>>, Error> {
        log::info!(
            "Fetching data from spreadsheet {} from sheet {}",
            self.spreadsheet_id,
            sheet_name
        );
        let response = self
            .http
            .get(self.values_url(sheet_name, ""))
            .bearer_auth(token)
            .send()
            .await?;
        let body = into_json(response).await?;
        Ok(rows_from_values(&body["values"]))
    }

    /// Appends one row of user-entered values below the existing data.
    pub async fn append_row(
        &self,
        token: &str,
        sheet_name: &str,
        row: Vec<String>,
    ) -> Result<(), Error> {
        log::info!(
            "Appending row to sheet {} in spreadsheet {}",
            sheet_name,
            self.spreadsheet_id
        );
        let response = self
            .http
            .post(self.values_url(sheet_name, ":append"))
            .query(&[
                ("valueInputOption", "USER_ENTERED"),
                ("insertDataOption", "INSERT_ROWS"),
            ])
            .bearer_auth(token)
            .json(&json!({ "values": [row] }))
            .send()
            .await?;
        into_json(response).await?;
        Ok(())
    }

    /// Executes a set of structural requests as one atomic batch. The
    /// store's own atomicity is relied upon: a transport failure here means
    /// no partial effect.
    pub async fn batch_update(&self, token: &str, requests: Vec<Value>) -> Result<(), Error> {
        let response = self
            .http
            .post(format!("{SHEETS_BASE}/{}:batchUpdate", self.spreadsheet_id))
            .bearer_auth(token)
            .json(&json!({ "requests": requests }))
            .send()
            .await?;
        into_json(response).await?;
        Ok(())
    }

    /// Resolves a sheet title to its numeric id from the spreadsheet
    /// metadata. batchUpdate ranges address sheets by id, not title.
    pub async fn find_sheet_id(&self, token: &str, sheet_name: &str) -> Result<i64, Error> {
        log::info!(
            "Attempting to find sheet ID for {} in spreadsheet {}",
            sheet_name,
            self.spreadsheet_id
        );
        let response = self
            .http
            .get(format!("{SHEETS_BASE}/{}", self.spreadsheet_id))
            .bearer_auth(token)
            .send()
            .await?;
        let body = into_json(response).await?;
        sheet_id_from_metadata(&body, sheet_name)
    }
}

async fn into_json(response: reqwest::Response) -> Result<Value, Error> {
    let status = response.status();
    if status.is_success() {
        Ok(response.json().await?)
    } else {
        let body: Value = response.json().await.unwrap_or(Value::Null);
        log::error!("Google API request failed: {status}");
        Err(Error::Transport(remote_error_message(&body, status)))
    }
}

fn remote_error_message(body: &Value, status: StatusCode) -> String {
    body["error"]["message"]
        .as_str()
        .map(str::to_string)
        .unwrap_or_else(|| format!("Google API request failed with status {status}"))
}

fn rows_from_values(values: &Value) -> Vec<Vec<String>> {
    let Some(rows) = values.as_array() else {
        return Vec::new();
    };
    rows.iter()
        .map(|row| {
            row.as_array()
                .map(|cells| cells.iter().map(cell_to_string).collect())
                .unwrap_or_default()
        })
        .collect()
}

fn cell_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn sheet_id_from_metadata(body: &Value, sheet_name: &str) -> Result<i64, Error> {
    body["sheets"]
        .as_array()
        .into_iter()
        .flatten()
        .find(|sheet| sheet["properties"]["title"] == sheet_name)
        .and_then(|sheet| sheet["properties"]["sheetId"].as_i64())
        .ok_or(Error::SheetNotFound)
}
