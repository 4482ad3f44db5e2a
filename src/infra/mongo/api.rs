use crate::infra::store::{DocumentStore, StoreError, UpdateCounts};
use mongodb::{
    bson::{doc, Document},
    error::Error as mongoError,
    options::FindOptions,
    sync::{Client, Collection, Database},
};
use tracing::{debug, error, warn};

pub struct MongoRep {
    database: Database,
}

impl MongoRep {
    pub fn init(uri: &str, database: &str) -> Result<Self, StoreError> {
        if database.is_empty() {
            return Err(StoreError::Backend("database name must not be empty".into()));
        }
        let client = Client::with_uri_str(uri)?;
        let rep = MongoRep {
            database: client.database(database),
        };
        return Ok(rep);
    }

    fn collection(&self, name: &str) -> Collection<Document> {
        self.database.collection(name)
    }
}

impl DocumentStore for MongoRep {
    fn collections(&self) -> Result<Vec<String>, StoreError> {
        self.database.list_collection_names(None).map_err(|e| {
            error!(error = %e, "Failed to list collections");
            StoreError::from(e)
        })
    }

    fn find_one(&self, collection: &str, filter: Document) -> Result<Document, StoreError> {
        match self.collection(collection).find_one(filter.clone(), None) {
            Ok(Some(document)) => {
                debug!(collection, %filter, "Found document");
                Ok(document)
            }
            Ok(None) => {
                warn!(collection, %filter, "Failed to find document");
                Err(StoreError::NotFound)
            }
            Err(e) => {
                error!(collection, %filter, error = %e, "Failed to find document");
                Err(StoreError::from(e))
            }
        }
    }

    fn find_many(
        &self,
        collection: &str,
        filter: Document,
        sort: Option<Document>,
    ) -> Result<Vec<Document>, StoreError> {
        let options = FindOptions::builder().sort(sort).build();
        let cursor = self
            .collection(collection)
            .find(filter.clone(), options)
            .map_err(|e| {
                error!(collection, %filter, error = %e, "Failed to find documents");
                StoreError::from(e)
            })?;
        match cursor.collect::<Result<Vec<Document>, mongoError>>() {
            Ok(documents) => {
                debug!(collection, %filter, quantity = documents.len(), "Found documents");
                Ok(documents)
            }
            Err(e) => {
                error!(collection, %filter, error = %e, "Failed to decode documents");
                Err(StoreError::from(e))
            }
        }
    }

    fn insert_many(&self, collection: &str, documents: Vec<Document>) -> Result<(), StoreError> {
        let quantity = documents.len();
        match self.collection(collection).insert_many(documents, None) {
            Ok(_) => {
                debug!(collection, quantity, "Inserted documents");
                Ok(())
            }
            Err(e) => {
                error!(collection, quantity, error = %e, "Failed to insert documents");
                Err(StoreError::from(e))
            }
        }
    }

    fn update_one(
        &self,
        collection: &str,
        filter: Document,
        fields: Document,
    ) -> Result<UpdateCounts, StoreError> {
        let result = self
            .collection(collection)
            .update_one(filter.clone(), doc! { "$set": fields }, None)
            .map_err(|e| {
                error!(collection, %filter, error = %e, "Failed to update document");
                StoreError::from(e)
            })?;
        if result.matched_count == 0 {
            warn!(collection, %filter, "Failed to update document");
            return Err(StoreError::NoMatch);
        }
        debug!(collection, %filter, modified = result.modified_count, "Updated document");
        Ok(UpdateCounts {
            matched: result.matched_count,
            modified: result.modified_count,
        })
    }

    fn delete_one(&self, collection: &str, filter: Document) -> Result<u64, StoreError> {
        match self.collection(collection).delete_one(filter.clone(), None) {
            Ok(result) => {
                debug!(collection, %filter, quantity = result.deleted_count, "Deleted document");
                Ok(result.deleted_count)
            }
            Err(e) => {
                error!(collection, %filter, error = %e, "Failed to delete document");
                Err(StoreError::from(e))
            }
        }
    }

    fn delete_many(&self, collection: &str, filter: Document) -> Result<u64, StoreError> {
        match self.collection(collection).delete_many(filter.clone(), None) {
            Ok(result) => {
                debug!(collection, %filter, quantity = result.deleted_count, "Deleted documents");
                Ok(result.deleted_count)
            }
            Err(e) => {
                error!(collection, %filter, error = %e, "Failed to delete documents");
                Err(StoreError::from(e))
            }
        }
    }
}
