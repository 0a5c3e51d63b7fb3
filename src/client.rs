//! Form controller for the waitlist landing page.
//!
//! [`WaitlistForm`] owns what the page shows (the typed address, whether a
//! submission is in flight, the last status message) and submits through
//! [`WaitlistClient`].

use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};
use serde::Deserialize;

pub const JOINED_MESSAGE: &str = "Thank you. You have successfully joined the waitlist!";
pub const TRANSPORT_FAILURE_MESSAGE: &str = "Sorry for inconvenience. Technical Errors";
pub const GENERIC_FAILURE_MESSAGE: &str = "Something went wrong. Please try again.";

#[derive(Debug, Clone)]
pub struct WaitlistClient {
    http_client: Client,
    base_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    Joined,
    Rejected { status: StatusCode, message: String },
}

#[derive(Deserialize)]
struct ServerMessage {
    message: Option<String>,
}

impl WaitlistClient {
    pub fn new(base_url: String, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http_client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    #[tracing::instrument(name = "Submitting an email to the waitlist", skip(self))]
    pub async fn submit(&self, email: &str) -> Result<SubmissionOutcome, reqwest::Error> {
        let response = self
            .http_client
            .post(format!("{}/api/emails", self.base_url))
            .json(&serde_json::json!({ "email": email }))
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(SubmissionOutcome::Joined);
        }

        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.contains("application/json"))
            .unwrap_or(false);

        let server_message = match is_json {
            true => response
                .json::<ServerMessage>()
                .await
                .ok()
                .and_then(|body| body.message)
                .filter(|message| !message.is_empty()),
            false => None,
        };

        Ok(SubmissionOutcome::Rejected {
            status,
            message: server_message.unwrap_or_else(|| status_message(status)),
        })
    }
}

fn status_message(status: StatusCode) -> String {
    format!(
        "Error: {} {}",
        status.as_u16(),
        status.canonical_reason().unwrap_or_default()
    )
    .trim_end()
    .to_string()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormMessage {
    Success(String),
    Failure(String),
}

impl FormMessage {
    pub fn text(&self) -> &str {
        match self {
            FormMessage::Success(text) | FormMessage::Failure(text) => text,
        }
    }
}

pub struct WaitlistForm {
    client: WaitlistClient,
    email: String,
    loading: bool,
    message: Option<FormMessage>,
}

/// Holds `loading` high for as long as it lives, including when the
/// submission future is dropped before completing.
struct InFlight<'a>(&'a mut bool);

impl<'a> InFlight<'a> {
    fn start(loading: &'a mut bool) -> Self {
        *loading = true;
        Self(loading)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        *self.0 = false;
    }
}

impl WaitlistForm {
    pub fn new(client: WaitlistClient) -> Self {
        Self {
            client,
            email: String::new(),
            loading: false,
            message: None,
        }
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn loading(&self) -> bool {
        self.loading
    }

    pub fn message(&self) -> Option<&FormMessage> {
        self.message.as_ref()
    }

    /// Stale status does not survive an edit.
    pub fn on_input(&mut self, text: impl Into<String>) {
        self.email = text.into();
        self.message = None;
    }

    pub fn clear(&mut self) {
        self.email.clear();
    }

    pub fn can_submit(&self) -> bool {
        !self.loading && !self.email.is_empty()
    }

    /// Returns `false` when the submission was ignored.
    pub async fn on_submit(&mut self) -> bool {
        if !self.can_submit() {
            return false;
        }

        let _in_flight = InFlight::start(&mut self.loading);
        self.message = None;

        let message = match self.client.submit(&self.email).await {
            Ok(SubmissionOutcome::Joined) => {
                self.email.clear();
                FormMessage::Success(JOINED_MESSAGE.to_string())
            }
            Ok(SubmissionOutcome::Rejected { message, .. }) => FormMessage::Failure(message),
            Err(error) => {
                tracing::warn!(error.cause_chain = ?error, "Waitlist submission failed");
                if error.is_connect() || error.is_timeout() || error.is_request() {
                    FormMessage::Failure(TRANSPORT_FAILURE_MESSAGE.to_string())
                } else {
                    FormMessage::Failure(GENERIC_FAILURE_MESSAGE.to_string())
                }
            }
        };
        self.message = Some(message);

        true
    }
}
