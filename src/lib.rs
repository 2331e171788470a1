/*!
# Roster Backend

HTTP backend for a sports-club student roster kept in a Google spreadsheet.

## Overview

The service proxies two Google APIs behind a small JSON interface: the
Sheets API for the roster and the attendance ledger, and the Gmail API for
the new-registration notification mail. It adds OAuth access-token
management, column-name mapping, and request validation on top.

The attendance ledger is a semi-structured table: rows are students,
identified by the (name, surname, group) triple, and one column is
appended per calendar day the first time attendance is recorded for that
day. Attendance cells are checkbox booleans (`TRUE`/`FALSE` literals with
a BOOLEAN data-validation rule).

## Modules

- **app**: routing, shared state, and the HTTP handlers
- **attendance**: date policies, attendance projection, batch request builders
- **auth**: access-token cache and OAuth refresh
- **config**: environment-driven configuration
- **error**: the error taxonomy and its HTTP status mapping
- **mailer**: notification mail through the Gmail API
- **roster**: student listing, group values, row append helpers
- **sheet**: sheet snapshot model, column resolution, student row lookup
- **sheets_api**: Google Sheets v4 REST client

## REST API Endpoints

- `GET  /attendance?date=DD-MM-YYYY&group=` - attendance records for a recorded date
- `POST /attendance?date=DD-MM-YYYY` - record today's attendance
- `POST /attendance/column?name=` - append a column to the ledger
- `GET  /students?group=` - roster rows, optionally filtered by group
- `POST /students` - append a student row (sends the notification mail)
- `GET  /groups` - distinct group values
- `GET  /columns` - column-name translation map
*/

pub mod app;
pub mod attendance;
pub mod auth;
pub mod config;
pub mod error;
pub mod mailer;
pub mod roster;
pub mod sheet;
pub mod sheets_api;

/// Re-export the core types to make them easier to use
pub use attendance::*;
pub use auth::*;
pub use config::*;
pub use error::*;
pub use sheet::*;
pub use sheets_api::*;
