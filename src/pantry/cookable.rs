//! Cookability of recipes and the read/correct/persist protocol around it.
//!
//! A recipe's `isCookable` field is a cache of [`CookabilityService::evaluate`].
//! It is only brought up to date when recipes pass through this service:
//! single reads and bulk reads rewrite a stale flag, inserts always stamp a
//! freshly computed one. There is no background sweep.
//!
//! The evaluation compares counts, not identities: a recipe listing `n`
//! ingredient names is cookable when at least `n` stocked, unexpired
//! ingredient documents carry one of those names. Duplicate names in the
//! recipe raise `n` without being matched individually.

use crate::error::ApiError;
use crate::infra::store::{DocumentStore, StoreError, INGREDIENTS, RECIPES};
use crate::pantry::stock;
use mongodb::bson::{doc, Bson, Document};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info};

pub const COOKABLE_FIELD: &str = "isCookable";
pub const INGREDIENTS_FIELD: &str = "ingredients";

#[derive(Error, Debug)]
pub enum CookableError {
    #[error("no ingredients specified")]
    MissingIngredients,
    #[error("ingredients must be a list of names")]
    MalformedIngredients,
    #[error(transparent)]
    StoreQuery(#[from] StoreError),
}

/// How a freshly computed flag is written back.
enum Reconcile {
    /// Compare with the stored flag and, when stale, issue a correction
    /// write matching `filter`.
    Correct { filter: Document },
    /// Overwrite the flag in memory; the caller persists the document.
    Stamp,
}

pub struct CookabilityService {
    store: Arc<dyn DocumentStore>,
}

impl CookabilityService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub fn evaluate(&self, recipe: &Document) -> Result<bool, CookableError> {
        let names = match recipe.get(INGREDIENTS_FIELD) {
            None | Some(Bson::Null) => return Err(CookableError::MissingIngredients),
            Some(Bson::Array(names)) => names,
            Some(_) => return Err(CookableError::MalformedIngredients),
        };
        let required = names.len();
        let filter = stock::fresh_named(names, stock::now_millis());
        let matched = self
            .store
            .find_many(INGREDIENTS, filter, None)
            .map_err(|e| {
                error!(recipe = ?recipe.get("_id"), error = %e, "Failed to query stock");
                CookableError::StoreQuery(e)
            })?
            .len();
        let cookable = matched >= required;
        debug!(recipe = ?recipe.get("_id"), expect = required, have = matched, cookable, "Determined");
        Ok(cookable)
    }

    /// Fetches one document; a stale recipe flag is corrected with the same
    /// filter used for the fetch. A failed correction fails the request.
    pub fn get_one(&self, collection: &str, filter: Document) -> Result<Document, ApiError> {
        let mut document = self.store.find_one(collection, filter.clone())?;
        if collection == RECIPES {
            self.reconcile(collection, &mut document, Reconcile::Correct { filter })?;
        }
        Ok(document)
    }

    /// Fetches every matching document, correcting recipes one at a time in
    /// store order. The first failed correction aborts the whole read;
    /// corrections already written stay written.
    pub fn get_many(
        &self,
        collection: &str,
        filter: Document,
        sort: Option<Document>,
    ) -> Result<Vec<Document>, ApiError> {
        let mut documents = self.store.find_many(collection, filter, sort)?;
        if collection == RECIPES {
            for document in documents.iter_mut() {
                let id = document.get("_id").cloned().unwrap_or(Bson::Null);
                self.reconcile(
                    collection,
                    document,
                    Reconcile::Correct {
                        filter: doc! {"_id": id},
                    },
                )?;
            }
        }
        Ok(documents)
    }

    /// Stamps every recipe with a fresh flag, then inserts the whole batch.
    pub fn insert_many(
        &self,
        collection: &str,
        mut documents: Vec<Document>,
    ) -> Result<usize, ApiError> {
        if collection == RECIPES {
            for document in documents.iter_mut() {
                self.reconcile(collection, document, Reconcile::Stamp)?;
            }
        }
        let quantity = documents.len();
        self.store.insert_many(collection, documents)?;
        Ok(quantity)
    }

    /// Returns whether a correction write was issued.
    fn reconcile(
        &self,
        collection: &str,
        document: &mut Document,
        mode: Reconcile,
    ) -> Result<bool, ApiError> {
        let cookable = self.evaluate(document)?;
        match mode {
            Reconcile::Stamp => {
                document.insert(COOKABLE_FIELD, cookable);
                Ok(false)
            }
            Reconcile::Correct { filter } => {
                if document.get_bool(COOKABLE_FIELD).ok() == Some(cookable) {
                    return Ok(false);
                }
                self.store
                    .update_one(collection, filter.clone(), doc! {COOKABLE_FIELD: cookable})
                    .map_err(|e| {
                        error!(collection, %filter, error = %e, "Failed to correct cookable flag");
                        ApiError::Correction(e)
                    })?;
                info!(collection, %filter, cookable, "Corrected cookable flag");
                document.insert(COOKABLE_FIELD, cookable);
                Ok(true)
            }
        }
    }
}
