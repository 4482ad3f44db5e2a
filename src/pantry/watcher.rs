//! Periodic expiration check feeding the shopping list and a text message.

use crate::config::SettingsHandle;
use crate::infra::mongo::Ingredient;
use crate::infra::store::{DocumentStore, INGREDIENTS};
use crate::infra::trello::TaskBoard;
use crate::infra::twilio::Messenger;
use crate::pantry::stock;
use chrono::{DateTime, Local, TimeZone};
use mongodb::bson::Document;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info};

#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// A stock query failed; nothing was sent.
    Aborted,
    NothingToDo,
    Notified {
        expired: usize,
        expiring: usize,
        url: String,
        message_id: Option<String>,
    },
}

pub struct ExpirationWatcher<B, M> {
    store: Arc<dyn DocumentStore>,
    settings: Arc<SettingsHandle>,
    board: B,
    messenger: M,
}

pub struct WatcherHandle {
    stop: Sender<()>,
    thread: JoinHandle<()>,
}

impl WatcherHandle {
    /// Signals the loop and waits for the current run to finish.
    pub fn stop(self) {
        let _ = self.stop.send(());
        if self.thread.join().is_err() {
            error!("Expiration watcher panicked");
        }
    }
}

impl<B, M> ExpirationWatcher<B, M>
where
    B: TaskBoard + 'static,
    M: Messenger + 'static,
{
    pub fn new(
        store: Arc<dyn DocumentStore>,
        settings: Arc<SettingsHandle>,
        board: B,
        messenger: M,
    ) -> Self {
        Self {
            store,
            settings,
            board,
            messenger,
        }
    }

    /// Runs once right away, then once per `interval`. The interval is
    /// re-read from the settings before every wait.
    pub fn spawn(self) -> std::io::Result<WatcherHandle> {
        let (stop, stop_rx) = mpsc::channel();
        let thread = thread::Builder::new()
            .name("expiration-watcher".into())
            .spawn(move || {
                loop {
                    let outcome = self.run_once();
                    debug!(?outcome, "Expiration check finished");
                    let interval = self.settings.snapshot().interval;
                    match stop_rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => continue,
                        _ => break,
                    }
                }
                info!("Expiration watcher stopped");
            })?;
        Ok(WatcherHandle { stop, thread })
    }

    pub fn run_once(&self) -> RunOutcome {
        let settings = self.settings.snapshot();
        let now = Local::now();
        let now_ms = now.timestamp_millis();
        let later = now_ms.saturating_add(stock::millis(settings.lookahead));

        let expired = match self
            .store
            .find_many(INGREDIENTS, stock::expired(now_ms), None)
        {
            Ok(documents) => documents,
            Err(e) => {
                error!(error = %e, "Failed to identify expired items");
                return RunOutcome::Aborted;
            }
        };
        let expiring = match self.store.find_many(
            INGREDIENTS,
            stock::expiring(Some(now_ms), Some(later)),
            None,
        ) {
            Ok(documents) => documents,
            Err(e) => {
                error!(error = %e, "Failed to identify expiring items");
                return RunOutcome::Aborted;
            }
        };

        if expired.is_empty() && expiring.is_empty() {
            info!(expiring = 0, expired = 0, "Restocking not required");
            return RunOutcome::NothingToDo;
        }
        info!(expiring = expiring.len(), expired = expired.len(), "Restocking required");

        let groceries: Vec<String> = expired
            .iter()
            .map(|d| describe(d, "expired"))
            .chain(expiring.iter().map(|d| describe(d, "expiring")))
            .collect();
        debug!(quantity = groceries.len(), ?groceries, "Groceries");

        let due = due_date(now, settings.lookahead);
        let url = self.update_card(&due, &groceries);

        let message = self.messenger.compose(expiring.len(), expired.len(), &url);
        let message_id = if settings.silence {
            info!(silence = true, "Skipped message");
            None
        } else {
            self.notify(&message)
        };

        RunOutcome::Notified {
            expired: expired.len(),
            expiring: expiring.len(),
            url,
            message_id,
        }
    }

    /// Appends to the existing card or creates one. Empty URL on failure.
    fn update_card(&self, due: &DateTime<Local>, groceries: &[String]) -> String {
        match self.board.find_card() {
            Err(e) => {
                error!(error = %e, "Failed to get card");
                String::new()
            }
            Ok(Some(_)) => match self.board.append_to_card(groceries) {
                Ok(url) => {
                    info!(%url, "Added to card");
                    url
                }
                Err(e) => {
                    error!(error = %e, "Failed to add to card");
                    String::new()
                }
            },
            Ok(None) => match self.board.create_card(due, self.board.labels(), groceries) {
                Ok(url) => {
                    info!(%url, "Created card");
                    url
                }
                Err(e) => {
                    error!(error = %e, "Failed to create card");
                    String::new()
                }
            },
        }
    }

    fn notify(&self, message: &str) -> Option<String> {
        let from = self.messenger.sender();
        let to = self.messenger.recipient();
        match self.messenger.send(from, to, message) {
            Ok(id) => {
                info!(from, to, "Sent message");
                Some(id)
            }
            Err(e) => {
                error!(from, to, error = %e, "Failed to send message");
                None
            }
        }
    }
}

/// `name (tag)`, or `name (brand, flavor, tag)` with absent attributes left out.
fn describe(document: &Document, tag: &str) -> String {
    let (name, details) = match Ingredient::from_document(document.clone()) {
        Ok(ingredient) => {
            let details: Vec<String> = ["brand", "flavor"]
                .iter()
                .filter_map(|key| ingredient.attribute(key).map(String::from))
                .collect();
            (ingredient.name, details)
        }
        Err(_) => (
            document.get_str("name").unwrap_or_default().to_string(),
            Vec::new(),
        ),
    };
    let mut parts = details;
    parts.push(tag.to_string());
    format!("{name} ({})", parts.join(", "))
}

/// Start of the current day, plus the lookahead, plus one day.
pub fn due_date<Tz: TimeZone>(now: DateTime<Tz>, lookahead: Duration) -> DateTime<Tz> {
    let midnight = now
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .and_then(|naive| now.timezone().from_local_datetime(&naive).earliest())
        .unwrap_or_else(|| now.clone());
    let lookahead = chrono::Duration::from_std(lookahead).unwrap_or_else(|_| chrono::Duration::zero());
    midnight + lookahead + chrono::Duration::hours(24)
}
