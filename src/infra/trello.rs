use crate::config::TrelloConfig;
use chrono::{DateTime, Local};
use reqwest::blocking::Client;
use serde::{de::DeserializeOwned, Deserialize};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

const API: &str = "https://api.trello.com/1";
pub const CARD_NAME: &str = "Shopping List";
const CARD_DESCRIPTION: &str = "A list of items that must be bought in the near future.";
const CHECKLIST_NAME: &str = "Groceries";

#[derive(Error, Debug)]
pub enum TrelloError {
    #[error("trello request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("board {0} not found")]
    BoardNotFound(String),
    #[error("list {0} not found")]
    ListNotFound(String),
    #[error("card {CARD_NAME} not found")]
    CardNotFound,
    #[error("no checklists attached to card")]
    NoChecklist,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Card {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(rename = "idChecklists", default)]
    pub checklists: Vec<String>,
}

/// The board holding the shopping list card.
pub trait TaskBoard: Send {
    /// Label names applied to newly created cards.
    fn labels(&self) -> &[String];

    fn find_card(&self) -> Result<Option<Card>, TrelloError>;

    /// Creates the card and returns its URL.
    fn create_card(
        &self,
        due: &DateTime<Local>,
        labels: &[String],
        items: &[String],
    ) -> Result<String, TrelloError>;

    /// Adds items missing from the existing card and returns its URL.
    fn append_to_card(&self, items: &[String]) -> Result<String, TrelloError>;
}

#[derive(Debug, Deserialize)]
struct Named {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct Checklist {
    id: String,
    #[serde(rename = "checkItems", default)]
    items: Vec<Named>,
}

pub struct TrelloBoard {
    client: Client,
    api_key: String,
    api_token: String,
    member: String,
    board: String,
    list: String,
    labels: Vec<String>,
}

impl TrelloBoard {
    pub fn new(config: TrelloConfig, timeout: Duration) -> Result<Self, TrelloError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_key: config.api_key,
            api_token: config.api_token,
            member: config.member,
            board: config.board,
            list: config.list,
            labels: config.labels,
        })
    }

    fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, TrelloError> {
        let response = self
            .client
            .get(format!("{API}{path}"))
            .query(&[("key", &self.api_key), ("token", &self.api_token)])
            .send()?
            .error_for_status()?;
        Ok(response.json()?)
    }

    fn post<T: DeserializeOwned>(&self, path: &str, params: &[(&str, &str)]) -> Result<T, TrelloError> {
        let response = self
            .client
            .post(format!("{API}{path}"))
            .query(&[("key", &self.api_key), ("token", &self.api_token)])
            .query(params)
            .send()?
            .error_for_status()?;
        Ok(response.json()?)
    }

    fn find_board(&self) -> Result<Named, TrelloError> {
        let boards: Vec<Named> = self.get(&format!("/members/{}/boards", self.member))?;
        boards
            .into_iter()
            .find(|b| b.name == self.board)
            .ok_or_else(|| TrelloError::BoardNotFound(self.board.clone()))
    }

    fn find_list(&self, board: &Named) -> Result<Named, TrelloError> {
        let lists: Vec<Named> = self.get(&format!("/boards/{}/lists", board.id))?;
        lists
            .into_iter()
            .find(|l| l.name == self.list)
            .ok_or_else(|| TrelloError::ListNotFound(self.list.clone()))
    }

    fn add_check_item(&self, checklist: &str, name: &str) -> Result<(), TrelloError> {
        let _: serde_json::Value =
            self.post(&format!("/checklists/{checklist}/checkItems"), &[("name", name)])?;
        Ok(())
    }
}

impl TaskBoard for TrelloBoard {
    fn labels(&self) -> &[String] {
        &self.labels
    }

    fn find_card(&self) -> Result<Option<Card>, TrelloError> {
        let board = self.find_board()?;
        let list = self.find_list(&board)?;
        let cards: Vec<Card> = self.get(&format!("/lists/{}/cards", list.id))?;
        Ok(cards.into_iter().find(|c| c.name == CARD_NAME))
    }

    fn create_card(
        &self,
        due: &DateTime<Local>,
        labels: &[String],
        items: &[String],
    ) -> Result<String, TrelloError> {
        let board = self.find_board()?;
        let list = self.find_list(&board)?;

        let board_labels: Vec<Named> = self.get(&format!("/boards/{}/labels", board.id))?;
        let label_ids = board_labels
            .into_iter()
            .filter(|l| labels.contains(&l.name))
            .map(|l| l.id)
            .collect::<Vec<_>>()
            .join(",");

        let due = due.to_rfc3339();
        let card: Card = self.post(
            "/cards",
            &[
                ("idList", list.id.as_str()),
                ("name", CARD_NAME),
                ("desc", CARD_DESCRIPTION),
                ("due", due.as_str()),
                ("pos", "top"),
                ("idLabels", label_ids.as_str()),
            ],
        )?;
        debug!(card = %card.id, "Created card");

        let checklist: Checklist = self.post(
            &format!("/cards/{}/checklists", card.id),
            &[("name", CHECKLIST_NAME)],
        )?;
        for item in items {
            self.add_check_item(&checklist.id, item)?;
        }
        Ok(card.url)
    }

    fn append_to_card(&self, items: &[String]) -> Result<String, TrelloError> {
        let card = self.find_card()?.ok_or(TrelloError::CardNotFound)?;
        let checklist_id = card.checklists.first().ok_or(TrelloError::NoChecklist)?;
        let checklist: Checklist = self.get(&format!("/checklists/{checklist_id}"))?;

        for item in missing_items(&checklist, items) {
            self.add_check_item(&checklist.id, item)?;
        }
        Ok(card.url)
    }
}

/// Items with no existing check item starting with the same text.
fn missing_items<'a>(checklist: &Checklist, items: &'a [String]) -> Vec<&'a String> {
    items
        .iter()
        .filter(|item| {
            !checklist
                .items
                .iter()
                .any(|existing| existing.name.starts_with(item.as_str()))
        })
        .collect()
}
