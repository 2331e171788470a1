use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

/// Everything that can go wrong between an inbound request and the
/// spreadsheet. Validation failures are detected before any mutating call;
/// transport failures carry the remote error message through unchanged.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Date has not been provided")]
    MissingDate,

    #[error("Invalid date format. Use DD-MM-YYYY")]
    InvalidFormat,

    #[error("Future dates not allowed")]
    FutureDate,

    #[error("Earlier dates than today are not allowed for creating an attendance check")]
    PastDate,

    #[error("Column {0} not found in spreadsheet headers")]
    ColumnNotFound(String),

    #[error("Column with that name already exists")]
    ColumnExists,

    #[error("Sheet name not found")]
    SheetNotFound,

    #[error("Student {0} was not found in the spreadsheet")]
    StudentNotFound(String),

    #[error("No students were added for attendance update")]
    EmptyBatch,

    #[error("Spreadsheet has no values. Please make sure it has at least a header row")]
    EmptyTable,

    #[error("No data was sent")]
    NoData,

    #[error("Could not obtain a valid access token")]
    Unauthorized,

    #[error(
        "JSON data is not compatible with the spreadsheet due to column mismatch. \
         Missing keys: {missing:?}, extra keys: {extra:?}"
    )]
    IncompatibleRow {
        missing: Vec<String>,
        extra: Vec<String>,
    },

    #[error("Missing environment variable {0}")]
    MissingEnv(String),

    #[error("{0}")]
    Transport(String),
}

impl Error {
    pub fn status(&self) -> StatusCode {
        match self {
            Error::Unauthorized => StatusCode::UNAUTHORIZED,
            Error::Transport(_) => StatusCode::BAD_GATEWAY,
            Error::MissingEnv(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "success": false,
            "message": self.to_string(),
        }));
        (self.status(), body).into_response()
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Transport(e.to_string())
    }
}
