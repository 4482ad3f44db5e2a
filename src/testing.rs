//! In-memory collaborators for unit tests.

use crate::infra::store::{DocumentStore, StoreError, UpdateCounts, INGREDIENTS, RECIPES};
use crate::infra::trello::{Card, TaskBoard, TrelloError};
use crate::infra::twilio::{Messenger, TwilioError};
use chrono::{DateTime, Local};
use mongodb::bson::{doc, oid::ObjectId, Document};
use std::sync::{Arc, Mutex};

pub type CallLog<T> = Arc<Mutex<Vec<T>>>;

type FindOne = Box<dyn Fn(&str, &Document) -> Result<Document, StoreError> + Send + Sync>;
type FindMany =
    Box<dyn Fn(&str, &Document, &Option<Document>) -> Result<Vec<Document>, StoreError> + Send + Sync>;
type Collections = Box<dyn Fn() -> Result<Vec<String>, StoreError> + Send + Sync>;
type Insert = Box<dyn Fn(&str, &[Document]) -> Result<(), StoreError> + Send + Sync>;
type Update =
    Box<dyn Fn(&str, &Document, &Document) -> Result<UpdateCounts, StoreError> + Send + Sync>;
type Delete = Box<dyn Fn(&str, &Document) -> Result<u64, StoreError> + Send + Sync>;

/// Store whose operations succeed with empty results unless overridden.
/// Every call is recorded before the override runs.
pub struct MockStore {
    collections: Collections,
    find_one: FindOne,
    find_many: FindMany,
    insert: Insert,
    update: Update,
    delete_one: Delete,
    delete_many: Delete,
    finds: Mutex<Vec<(String, Document)>>,
    find_ones: Mutex<Vec<(String, Document)>>,
    updates: Mutex<Vec<(String, Document, Document)>>,
    inserts: Mutex<Vec<(String, Vec<Document>)>>,
    deletes: Mutex<Vec<(String, Document)>>,
}

impl MockStore {
    pub fn new() -> Self {
        Self {
            collections: Box::new(|| Ok(vec![INGREDIENTS.to_string(), RECIPES.to_string()])),
            find_one: Box::new(|_, _| Err(StoreError::NotFound)),
            find_many: Box::new(|_, _, _| Ok(Vec::new())),
            insert: Box::new(|_, _| Ok(())),
            update: Box::new(|_, _, _| {
                Ok(UpdateCounts {
                    matched: 1,
                    modified: 1,
                })
            }),
            delete_one: Box::new(|_, _| Ok(1)),
            delete_many: Box::new(|_, _| Ok(1)),
            finds: Mutex::default(),
            find_ones: Mutex::default(),
            updates: Mutex::default(),
            inserts: Mutex::default(),
            deletes: Mutex::default(),
        }
    }

    pub fn with_collections(
        mut self,
        f: impl Fn() -> Result<Vec<String>, StoreError> + Send + Sync + 'static,
    ) -> Self {
        self.collections = Box::new(f);
        self
    }

    pub fn with_find_one(
        mut self,
        f: impl Fn(&str, &Document) -> Result<Document, StoreError> + Send + Sync + 'static,
    ) -> Self {
        self.find_one = Box::new(f);
        self
    }

    pub fn with_find_many(
        mut self,
        f: impl Fn(&str, &Document, &Option<Document>) -> Result<Vec<Document>, StoreError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        self.find_many = Box::new(f);
        self
    }

    pub fn with_insert(
        mut self,
        f: impl Fn(&str, &[Document]) -> Result<(), StoreError> + Send + Sync + 'static,
    ) -> Self {
        self.insert = Box::new(f);
        self
    }

    pub fn with_update(
        mut self,
        f: impl Fn(&str, &Document, &Document) -> Result<UpdateCounts, StoreError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        self.update = Box::new(f);
        self
    }

    pub fn with_delete_one(
        mut self,
        f: impl Fn(&str, &Document) -> Result<u64, StoreError> + Send + Sync + 'static,
    ) -> Self {
        self.delete_one = Box::new(f);
        self
    }

    pub fn with_delete_many(
        mut self,
        f: impl Fn(&str, &Document) -> Result<u64, StoreError> + Send + Sync + 'static,
    ) -> Self {
        self.delete_many = Box::new(f);
        self
    }

    /// `find_many` calls as (collection, filter).
    pub fn finds(&self) -> Vec<(String, Document)> {
        self.finds.lock().unwrap().clone()
    }

    /// `find_one` calls as (collection, filter).
    pub fn find_ones(&self) -> Vec<(String, Document)> {
        self.find_ones.lock().unwrap().clone()
    }

    pub fn updates(&self) -> Vec<(String, Document, Document)> {
        self.updates.lock().unwrap().clone()
    }

    pub fn inserts(&self) -> Vec<(String, Vec<Document>)> {
        self.inserts.lock().unwrap().clone()
    }

    /// `delete_one` and `delete_many` calls as (collection, filter).
    pub fn deletes(&self) -> Vec<(String, Document)> {
        self.deletes.lock().unwrap().clone()
    }
}

impl DocumentStore for MockStore {
    fn collections(&self) -> Result<Vec<String>, StoreError> {
        (self.collections)()
    }

    fn find_one(&self, collection: &str, filter: Document) -> Result<Document, StoreError> {
        self.find_ones
            .lock()
            .unwrap()
            .push((collection.to_string(), filter.clone()));
        (self.find_one)(collection, &filter)
    }

    fn find_many(
        &self,
        collection: &str,
        filter: Document,
        sort: Option<Document>,
    ) -> Result<Vec<Document>, StoreError> {
        self.finds
            .lock()
            .unwrap()
            .push((collection.to_string(), filter.clone()));
        (self.find_many)(collection, &filter, &sort)
    }

    fn insert_many(&self, collection: &str, documents: Vec<Document>) -> Result<(), StoreError> {
        self.inserts
            .lock()
            .unwrap()
            .push((collection.to_string(), documents.clone()));
        (self.insert)(collection, &documents)
    }

    fn update_one(
        &self,
        collection: &str,
        filter: Document,
        fields: Document,
    ) -> Result<UpdateCounts, StoreError> {
        self.updates
            .lock()
            .unwrap()
            .push((collection.to_string(), filter.clone(), fields.clone()));
        (self.update)(collection, &filter, &fields)
    }

    fn delete_one(&self, collection: &str, filter: Document) -> Result<u64, StoreError> {
        self.deletes
            .lock()
            .unwrap()
            .push((collection.to_string(), filter.clone()));
        (self.delete_one)(collection, &filter)
    }

    fn delete_many(&self, collection: &str, filter: Document) -> Result<u64, StoreError> {
        self.deletes
            .lock()
            .unwrap()
            .push((collection.to_string(), filter.clone()));
        (self.delete_many)(collection, &filter)
    }
}

/// `n` stocked ingredient documents.
pub fn ingredient_docs(n: usize) -> Vec<Document> {
    (0..n)
        .map(|i| {
            doc! {
                "_id": ObjectId::new(),
                "name": format!("ingredient-{i}"),
                "expirationDate": 0_i64,
                "haveStocked": true,
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub enum BoardCall {
    Find,
    Create {
        due: DateTime<Local>,
        labels: Vec<String>,
        items: Vec<String>,
    },
    Append {
        items: Vec<String>,
    },
}

#[derive(Default)]
pub struct MockBoard {
    pub card: Option<Card>,
    pub labels: Vec<String>,
    pub fail: bool,
    pub calls: CallLog<BoardCall>,
}

impl MockBoard {
    pub fn log(&self) -> CallLog<BoardCall> {
        Arc::clone(&self.calls)
    }

    fn result(&self, url: &str) -> Result<String, TrelloError> {
        if self.fail {
            return Err(TrelloError::BoardNotFound("Pantry".into()));
        }
        Ok(url.to_string())
    }
}

impl TaskBoard for MockBoard {
    fn labels(&self) -> &[String] {
        &self.labels
    }

    fn find_card(&self) -> Result<Option<Card>, TrelloError> {
        self.calls.lock().unwrap().push(BoardCall::Find);
        if self.fail {
            return Err(TrelloError::BoardNotFound("Pantry".into()));
        }
        Ok(self.card.clone())
    }

    fn create_card(
        &self,
        due: &DateTime<Local>,
        labels: &[String],
        items: &[String],
    ) -> Result<String, TrelloError> {
        self.calls.lock().unwrap().push(BoardCall::Create {
            due: *due,
            labels: labels.to_vec(),
            items: items.to_vec(),
        });
        self.result("https://trello.com/c/new")
    }

    fn append_to_card(&self, items: &[String]) -> Result<String, TrelloError> {
        self.calls.lock().unwrap().push(BoardCall::Append {
            items: items.to_vec(),
        });
        let url = self.card.as_ref().map(|c| c.url.clone()).unwrap_or_default();
        self.result(&url)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SentMessage {
    pub from: String,
    pub to: String,
    pub body: String,
}

#[derive(Default)]
pub struct MockMessenger {
    pub fail: bool,
    pub sent: CallLog<SentMessage>,
}

impl MockMessenger {
    pub fn log(&self) -> CallLog<SentMessage> {
        Arc::clone(&self.sent)
    }
}

impl Messenger for MockMessenger {
    fn sender(&self) -> &str {
        "+15550000001"
    }

    fn recipient(&self) -> &str {
        "+15550000002"
    }

    fn send(&self, from: &str, to: &str, body: &str) -> Result<String, TwilioError> {
        self.sent.lock().unwrap().push(SentMessage {
            from: from.to_string(),
            to: to.to_string(),
            body: body.to_string(),
        });
        if self.fail {
            return Err(TwilioError::Rejected {
                status: 400,
                message: "invalid phone number".into(),
            });
        }
        Ok("SM0001".to_string())
    }
}
