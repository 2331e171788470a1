use std::env;

use crate::error::Error;

/// Runtime configuration, read once at startup from the environment
/// (optionally seeded from a `.env` file next to the binary).
///
/// The column names default to the Polish headers used by the roster
/// spreadsheet; they can be overridden per deployment.
#[derive(Debug, Clone)]
pub struct Config {
    /// Google spreadsheet id shared by the roster and attendance sheets.
    pub spreadsheet_id: String,

    /// Sheet (tab) holding one row per student.
    pub students_sheet: String,

    /// Sheet (tab) holding the attendance ledger with date columns.
    pub attendance_sheet: String,

    pub name_column: String,
    pub surname_column: String,
    pub group_column: String,

    /// OAuth client credentials used to refresh the access token.
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,

    /// Sender and recipients for the new-student notification mail.
    pub mail_sender: String,
    pub mail_recipients: Vec<String>,

    pub bind_addr: String,
}

fn required(key: &str) -> Result<String, Error> {
    env::var(key).map_err(|_| Error::MissingEnv(key.to_string()))
}

fn optional(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

impl Config {
    pub fn from_env() -> Result<Self, Error> {
        // Ignore a missing .env file; plain environment variables are fine.
        let _ = dotenvy::dotenv();

        let mail_recipients = optional("MAIL_RECIPIENTS", "")
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();

        Ok(Config {
            spreadsheet_id: required("SPREADSHEET_ID")?,
            students_sheet: optional("STUDENTS_SHEET", "Arkusz1"),
            attendance_sheet: optional("ATTENDANCE_SHEET", "Lista obecności"),
            name_column: optional("NAME_COLUMN", "Imię"),
            surname_column: optional("SURNAME_COLUMN", "Nazwisko"),
            group_column: optional("GROUP_COLUMN", "Grupa"),
            client_id: required("GOOGLE_CLIENT_ID")?,
            client_secret: required("GOOGLE_CLIENT_SECRET")?,
            refresh_token: required("REFRESH_TOKEN")?,
            mail_sender: optional("MAIL_SENDER", ""),
            mail_recipients,
            bind_addr: optional("BIND_ADDR", "127.0.0.1:3000"),
        })
    }
}
