use axum::{
    Json, Router,
    extract::{Query, State},
    routing::{get, post},
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::attendance::{
    AttendanceRecord, StagedUpdates, append_column_requests, build_attendance_updates,
    column_name_for, project_attendance, validate_for_create, validate_for_read, warsaw_today,
};
use crate::auth::Authenticator;
use crate::config::Config;
use crate::error::Error;
use crate::mailer;
use crate::roster;
use crate::sheet::{AttendanceEntry, IdentityColumns, Snapshot, resolve_column};
use crate::sheets_api::SheetsClient;

const MAIL_SUBJECT: &str = "Automatyczny mail po dostaniu formularza";
const MAIL_PREAMBLE: &str = "Ten mail został wysłany automatycznie, nie odpisuj na niego.\n\
    Otrzymaliśmy nowy wypełniony formularz, zarejestrował się nowy uczestnik!";

pub struct AppState {
    config: Config,
    sheets: SheetsClient,
    auth: Authenticator,
    http: reqwest::Client,
}

#[derive(Deserialize)]
struct AttendanceQuery {
    date: Option<String>,
    group: Option<String>,
}

#[derive(Deserialize)]
struct StudentsQuery {
    group: Option<String>,
}

#[derive(Deserialize)]
struct ColumnQuery {
    name: String,
}

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;
    let bind_addr = config.bind_addr.clone();

    let state = Arc::new(AppState {
        sheets: SheetsClient::new(config.spreadsheet_id.clone()),
        auth: Authenticator::new(&config),
        http: reqwest::Client::new(),
        config,
    });

    let app = router(state);

    let listener = TcpListener::bind(&bind_addr).await?;
    println!("Listening on http://{bind_addr}");
    axum::serve(listener, app).await?;

    Ok(())
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/attendance", get(read_attendance).post(record_attendance))
        .route("/attendance/column", post(append_attendance_column))
        .route("/students", get(list_students).post(add_student))
        .route("/groups", get(list_groups))
        .route("/columns", get(column_names))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

impl AppState {
    async fn snapshot(&self, token: &str, sheet_name: &str) -> Result<Snapshot, Error> {
        Snapshot::new(self.sheets.read_table(token, sheet_name).await?)
    }

    fn identity_columns(&self, header: &[String]) -> Result<IdentityColumns, Error> {
        IdentityColumns::resolve(
            header,
            &self.config.name_column,
            &self.config.surname_column,
            &self.config.group_column,
        )
    }

    /// Standalone column append: the sheet must exist and the column must
    /// not. One batched request grows the table and writes the header cell.
    async fn append_column(
        &self,
        token: &str,
        sheet_name: &str,
        column_name: &str,
    ) -> Result<usize, Error> {
        let sheet_id = self.sheets.find_sheet_id(token, sheet_name).await?;
        let snapshot = self.snapshot(token, sheet_name).await?;
        if snapshot.header().iter().any(|col| col == column_name) {
            return Err(Error::ColumnExists);
        }
        let index = snapshot.width();
        self.sheets
            .batch_update(token, append_column_requests(sheet_id, index, column_name))
            .await?;
        Ok(index)
    }

    /// Returns the index of the date column, appending it first if the
    /// snapshot does not have it yet. A column already present counts as
    /// success regardless of who appended it, which serializes the race
    /// between two concurrent submissions for the same date.
    async fn ensure_date_column(
        &self,
        token: &str,
        sheet_id: i64,
        snapshot: &Snapshot,
        column_name: &str,
    ) -> Result<usize, Error> {
        if let Ok(index) = resolve_column(&snapshot.header(), column_name) {
            return Ok(index);
        }
        let index = snapshot.width();
        self.sheets
            .batch_update(token, append_column_requests(sheet_id, index, column_name))
            .await?;
        log::info!("Appended attendance column {column_name}");
        Ok(index)
    }
}

async fn home() -> Json<Value> {
    Json(json!({
        "endpoints": [
            "GET /",
            "GET /attendance?date=DD-MM-YYYY&group=",
            "POST /attendance?date=DD-MM-YYYY",
            "POST /attendance/column?name=",
            "GET /students?group=",
            "POST /students",
            "GET /groups",
            "GET /columns",
        ]
    }))
}

/// Per-student attendance for one already-recorded date, optionally
/// filtered to a group.
async fn read_attendance(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AttendanceQuery>,
) -> Result<Json<Vec<AttendanceRecord>>, Error> {
    let token = state.auth.valid_access_token().await?;
    let snapshot = state
        .snapshot(&token, &state.config.attendance_sheet)
        .await?;
    let header = snapshot.header();

    let today = warsaw_today(Utc::now());
    let date = validate_for_read(query.date.as_deref().unwrap_or(""), today, &header)?;

    let date_column = resolve_column(&header, &column_name_for(date))?;
    let columns = state.identity_columns(&header)?;

    Ok(Json(project_attendance(
        &snapshot,
        columns,
        date_column,
        query.group.as_deref(),
    )))
}

/// Records attendance for today: validates the date, appends the date
/// column if this is the first submission of the day, then writes every
/// matched student's cell in one atomic batch.
async fn record_attendance(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AttendanceQuery>,
    Json(entries): Json<Vec<AttendanceEntry>>,
) -> Result<Json<Value>, Error> {
    if entries.is_empty() {
        return Err(Error::NoData);
    }

    let today = warsaw_today(Utc::now());
    let date = validate_for_create(query.date.as_deref().unwrap_or(""), today)?;

    let token = state.auth.valid_access_token().await?;
    let sheet_name = &state.config.attendance_sheet;
    let sheet_id = state.sheets.find_sheet_id(&token, sheet_name).await?;
    let snapshot = state.snapshot(&token, sheet_name).await?;

    let column_name = column_name_for(date);
    let date_column = state
        .ensure_date_column(&token, sheet_id, &snapshot, &column_name)
        .await?;

    let columns = state.identity_columns(&snapshot.header())?;
    let StagedUpdates {
        requests,
        updated,
        skipped,
    } = build_attendance_updates(&snapshot, sheet_id, date_column, columns, &entries)?;

    state.sheets.batch_update(&token, requests).await?;

    Ok(Json(json!({
        "success": true,
        "message": format!("Attendance updated successfully. Students updated: {updated}"),
        "updated_count": updated,
        "skipped": skipped,
    })))
}

async fn append_attendance_column(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ColumnQuery>,
) -> Result<Json<Value>, Error> {
    let token = state.auth.valid_access_token().await?;
    state
        .append_column(&token, &state.config.attendance_sheet, &query.name)
        .await?;
    Ok(Json(json!({
        "success": true,
        "message": format!("Successfuly appended a column with name {}", query.name),
    })))
}

/// The full roster as raw rows, or only the rows of one group.
async fn list_students(
    State(state): State<Arc<AppState>>,
    Query(query): Query<StudentsQuery>,
) -> Result<Json<Vec<Vec<String>>>, Error> {
    let token = state.auth.valid_access_token().await?;
    let rows = state
        .sheets
        .read_table(&token, &state.config.students_sheet)
        .await?;

    match query.group {
        Some(group) => {
            let snapshot = Snapshot::new(rows)?;
            Ok(Json(roster::rows_in_group(
                &snapshot,
                &state.config.group_column,
                &group,
            )?))
        }
        None => Ok(Json(rows)),
    }
}

async fn list_groups(State(state): State<Arc<AppState>>) -> Result<Json<Vec<String>>, Error> {
    let token = state.auth.valid_access_token().await?;
    let snapshot = state.snapshot(&token, &state.config.students_sheet).await?;
    Ok(Json(roster::unique_column_values(
        &snapshot,
        &state.config.group_column,
    )?))
}

/// Appends a new student row and, when configured, sends the notification
/// mail. Mail failure is logged but does not undo the already-appended row.
async fn add_student(
    State(state): State<Arc<AppState>>,
    Json(data): Json<Map<String, Value>>,
) -> Result<Json<Value>, Error> {
    if data.is_empty() {
        return Err(Error::NoData);
    }

    let token = state.auth.valid_access_token().await?;
    let snapshot = state.snapshot(&token, &state.config.students_sheet).await?;
    let header = snapshot.header();

    roster::check_row_compatibility(&header, &data)?;
    let row = roster::assemble_row(&header, &data);
    state
        .sheets
        .append_row(&token, &state.config.students_sheet, row)
        .await?;

    if !state.config.mail_sender.is_empty() && !state.config.mail_recipients.is_empty() {
        let body = format!(
            "{MAIL_PREAMBLE}\n\n{}",
            serde_json::to_string_pretty(&data).unwrap_or_default()
        );
        if let Err(e) = mailer::send_email(
            &state.http,
            &token,
            &state.config.mail_sender,
            &state.config.mail_recipients,
            MAIL_SUBJECT,
            &body,
        )
        .await
        {
            log::error!("Notification mail failed after the row was appended: {e}");
        }
    }

    Ok(Json(json!({
        "success": true,
        "message": "Successfuly appended values to your Google spreadsheet",
    })))
}

async fn column_names() -> Json<Value> {
    Json(roster::column_translations())
}
