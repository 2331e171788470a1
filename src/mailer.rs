use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE;
use serde_json::{Value, json};

use crate::error::Error;

const GMAIL_SEND_URL: &str = "https://gmail.googleapis.com/gmail/v1/users/me/messages/send";

/// Builds the Gmail API payload: a minimal RFC 2822 text message,
/// base64url-encoded into the `raw` field.
pub fn create_message(sender: &str, to: &[String], subject: &str, body: &str) -> Value {
    let message = format!(
        "To: {}\r\nFrom: {}\r\nSubject: {}\r\nContent-Type: text/plain; charset=\"utf-8\"\r\n\r\n{}",
        to.join(", "),
        sender,
        subject,
        body
    );
    json!({ "raw": URL_SAFE.encode(message) })
}

/// Sends a plain-text mail through the Gmail API using the same bearer
/// token as the spreadsheet calls.
pub async fn send_email(
    http: &reqwest::Client,
    token: &str,
    sender: &str,
    to: &[String],
    subject: &str,
    body: &str,
) -> Result<(), Error> {
    log::info!("Sending email to {to:?} from {sender} with subject {subject}");
    let response = http
        .post(GMAIL_SEND_URL)
        .bearer_auth(token)
        .json(&create_message(sender, to, subject, body))
        .send()
        .await?;

    if response.status().is_success() {
        Ok(())
    } else {
        let status = response.status();
        log::error!("Email sending failed: {status}");
        Err(Error::Transport(format!(
            "An error occurred while sending mail: {status}"
        )))
    }
}
