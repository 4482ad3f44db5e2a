use crate::config::TwilioConfig;
use reqwest::blocking::Client;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

const API: &str = "https://api.twilio.com/2010-04-01";

#[derive(Error, Debug)]
pub enum TwilioError {
    #[error("twilio request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("twilio rejected message ({status}): {message}")]
    Rejected { status: u16, message: String },
}

/// Text message channel towards the household.
pub trait Messenger: Send {
    fn sender(&self) -> &str;
    fn recipient(&self) -> &str;

    /// Sends `body` and returns the provider's message id.
    fn send(&self, from: &str, to: &str, body: &str) -> Result<String, TwilioError>;

    fn compose(&self, expiring: usize, expired: usize, url: &str) -> String {
        compose_message(expiring, expired, url)
    }
}

/// Builds the notification text. Empty when there is nothing to report.
pub fn compose_message(expiring: usize, expired: usize, url: &str) -> String {
    let summary = match (expiring, expired) {
        (0, 0) => return String::new(),
        (0, 1) => "1 item expired!".to_string(),
        (0, e) => format!("{e} items expired!"),
        (1, e) => format!("1 item expiring soon and {e} already expired!"),
        (n, e) => format!("{n} items expiring soon and {e} already expired!"),
    };
    format!("{summary} View shopping list: {url}")
}

#[derive(Deserialize)]
struct Sent {
    sid: String,
}

#[derive(Deserialize, Default)]
struct Failure {
    #[serde(default)]
    message: String,
}

pub struct TwilioMessenger {
    client: Client,
    account_sid: String,
    auth_token: String,
    phone_from: String,
    phone_to: String,
}

impl TwilioMessenger {
    pub fn new(config: TwilioConfig, timeout: Duration) -> Result<Self, TwilioError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            account_sid: config.account_sid,
            auth_token: config.auth_token,
            phone_from: config.phone_from,
            phone_to: config.phone_to,
        })
    }
}

impl Messenger for TwilioMessenger {
    fn sender(&self) -> &str {
        &self.phone_from
    }

    fn recipient(&self) -> &str {
        &self.phone_to
    }

    fn send(&self, from: &str, to: &str, body: &str) -> Result<String, TwilioError> {
        let response = self
            .client
            .post(format!("{API}/Accounts/{}/Messages.json", self.account_sid))
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[
                ("From", from),
                ("To", to),
                ("Body", body),
            ])
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let failure: Failure = response.json().unwrap_or_default();
            return Err(TwilioError::Rejected {
                status: status.as_u16(),
                message: failure.message,
            });
        }
        let sent: Sent = response.json()?;
        Ok(sent.sid)
    }
}
