//! Stock predicates over the ingredients collection.
//!
//! The boundaries differ on purpose: an ingredient counts towards a recipe
//! only while `expirationDate` is strictly in the future, whereas the
//! expired and expiring views both include the current instant.

use chrono::Utc;
use mongodb::bson::{doc, Array, Document};
use std::time::Duration;

pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

pub fn millis(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}

/// Stocked ingredients named in `names` that have not expired yet.
pub fn fresh_named(names: &Array, now: i64) -> Document {
    doc! {"$and": [
        {"expirationDate": {"$gt": now}},
        {"haveStocked": {"$eq": true}},
        {"name": {"$in": names.clone()}},
    ]}
}

/// Stocked ingredients whose `expirationDate <= now`.
pub fn expired(now: i64) -> Document {
    doc! {"$and": [
        {"expirationDate": {"$lte": now}},
        {"haveStocked": {"$eq": true}},
    ]}
}

/// Stocked ingredients within `[from, to]`, either bound optional.
pub fn expiring(from: Option<i64>, to: Option<i64>) -> Document {
    let mut clauses: Vec<Document> = window(from, to).into_iter().collect();
    clauses.push(doc! {"haveStocked": {"$eq": true}});
    doc! {"$and": clauses}
}

/// `expirationDate` bounded by whichever of `from`/`to` is given.
pub fn window(from: Option<i64>, to: Option<i64>) -> Option<Document> {
    let mut bounds = Document::new();
    if let Some(from) = from {
        bounds.insert("$gte", from);
    }
    if let Some(to) = to {
        bounds.insert("$lte", to);
    }
    (!bounds.is_empty()).then(|| doc! {"expirationDate": bounds})
}

pub fn by_expiration() -> Document {
    doc! {"expirationDate": 1}
}
