use mongodb::{bson::Document, error::Error as mongoError};
use thiserror::Error;

pub const INGREDIENTS: &str = "ingredients";
pub const RECIPES: &str = "recipes";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("error querying value: {0}")]
    Query(#[from] mongoError),
    #[error("no documents in result")]
    NotFound,
    #[error("no document matching filter")]
    NoMatch,
    #[error("{0}")]
    Backend(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UpdateCounts {
    pub matched: u64,
    pub modified: u64,
}

/// Document database operations the service relies on.
///
/// Every call is a blocking round-trip. Filters and field sets are plain
/// BSON documents so callers can express any predicate the backend accepts.
pub trait DocumentStore: Send + Sync {
    fn collections(&self) -> Result<Vec<String>, StoreError>;

    /// Fails with [`StoreError::NotFound`] when nothing matches.
    fn find_one(&self, collection: &str, filter: Document) -> Result<Document, StoreError>;

    fn find_many(
        &self,
        collection: &str,
        filter: Document,
        sort: Option<Document>,
    ) -> Result<Vec<Document>, StoreError>;

    fn insert_many(&self, collection: &str, documents: Vec<Document>) -> Result<(), StoreError>;

    /// Applies `fields` with `$set` to the first document matching `filter`.
    /// Fails with [`StoreError::NoMatch`] when the filter matches nothing.
    fn update_one(
        &self,
        collection: &str,
        filter: Document,
        fields: Document,
    ) -> Result<UpdateCounts, StoreError>;

    fn delete_one(&self, collection: &str, filter: Document) -> Result<u64, StoreError>;

    fn delete_many(&self, collection: &str, filter: Document) -> Result<u64, StoreError>;
}
