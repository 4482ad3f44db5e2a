use super::filters::{document_filter, id_set, parse_millis, parse_object_id, DocumentQuery};
use super::store::{DocumentStore, INGREDIENTS, RECIPES};
use crate::config::{Settings, SettingsHandle, SettingsUpdate};
use crate::error::{ApiError, ErrorResponse};
use crate::pantry::cookable::{CookabilityService, COOKABLE_FIELD};
use crate::pantry::stock;
use mongodb::bson::{doc, Bson, Document};
use rocket::serde::json::Json;
use rocket::{catch, delete, get, http::Status, post, put, Request, State};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Shared request state.
pub struct Pantry {
    pub store: Arc<dyn DocumentStore>,
    pub cookability: CookabilityService,
    pub settings: Arc<SettingsHandle>,
}

impl Pantry {
    pub fn new(store: Arc<dyn DocumentStore>, settings: Arc<SettingsHandle>) -> Self {
        Self {
            cookability: CookabilityService::new(Arc::clone(&store)),
            store,
            settings,
        }
    }

    fn ensure_collection(&self, name: &str) -> Result<(), ApiError> {
        let names = self.store.collections()?;
        if names.iter().any(|n| n == name) {
            return Ok(());
        }
        warn!(collection = name, status = 404, "Unknown collection");
        Err(ApiError::NotFound(format!("collection not found: {name}")))
    }
}

fn to_json(document: Document) -> Value {
    Bson::Document(document).into_relaxed_extjson()
}

/// Parses an extended JSON object into a document.
fn from_json(object: Map<String, Value>) -> Result<Document, ApiError> {
    match Bson::try_from(Value::Object(object)) {
        Ok(Bson::Document(document)) => Ok(document),
        Ok(other) => Err(ApiError::Validation(format!(
            "expected a document, found {other}"
        ))),
        Err(e) => Err(ApiError::Validation(format!("invalid document: {e}"))),
    }
}

fn encode_settings(settings: &Settings) -> Result<Json<Value>, ApiError> {
    serde_json::to_value(settings)
        .map(Json)
        .map_err(|e| ApiError::Encode(e.to_string()))
}

#[get("/configure")]
pub fn get_configuration(pantry: &State<Pantry>) -> Result<Json<Value>, ApiError> {
    encode_settings(&pantry.settings.snapshot())
}

#[put("/configure", data = "<update>")]
pub fn put_configuration(
    pantry: &State<Pantry>,
    update: Json<SettingsUpdate>,
) -> Result<Json<Value>, ApiError> {
    let update = update.into_inner();
    if update.interval == Some(Duration::ZERO) {
        return Err(ApiError::Validation(
            "interval must be greater than zero".into(),
        ));
    }
    let settings = pantry.settings.apply(update);
    info!(
        version = settings.version,
        lookahead = ?settings.lookahead,
        interval = ?settings.interval,
        silence = settings.silence,
        "Updated configuration"
    );
    encode_settings(&settings)
}

#[get("/documents/<collection>/<id>")]
pub fn get_document(
    pantry: &State<Pantry>,
    collection: &str,
    id: &str,
) -> Result<Json<Value>, ApiError> {
    pantry.ensure_collection(collection)?;
    let filter = doc! {"_id": parse_object_id(id)?};
    let document = pantry.cookability.get_one(collection, filter)?;
    debug!(collection, id, status = 200, "Read document");
    Ok(Json(to_json(document)))
}

#[put("/documents/<collection>/<id>", data = "<fields>")]
pub fn put_document(
    pantry: &State<Pantry>,
    collection: &str,
    id: &str,
    fields: Json<Map<String, Value>>,
) -> Result<Status, ApiError> {
    pantry.ensure_collection(collection)?;
    let filter = doc! {"_id": parse_object_id(id)?};
    let mut fields = fields.into_inner();
    // immutable
    fields.remove("_id");
    if fields.is_empty() {
        return Err(ApiError::Validation("no fields to update".into()));
    }
    let counts = pantry
        .store
        .update_one(collection, filter, from_json(fields)?)?;
    debug!(
        collection,
        id,
        matched = counts.matched,
        modified = counts.modified,
        status = 200,
        "Updated document"
    );
    Ok(Status::Ok)
}

#[delete("/documents/<collection>/<id>")]
pub fn delete_document(
    pantry: &State<Pantry>,
    collection: &str,
    id: &str,
) -> Result<Status, ApiError> {
    pantry.ensure_collection(collection)?;
    let filter = doc! {"_id": parse_object_id(id)?};
    if pantry.store.delete_one(collection, filter)? == 0 {
        warn!(collection, id, status = 404, "Nothing to delete");
        return Err(ApiError::NotFound("no documents found".into()));
    }
    debug!(collection, id, status = 200, "Deleted document");
    Ok(Status::Ok)
}

#[get("/documents/<collection>?<query..>")]
pub fn get_documents(
    pantry: &State<Pantry>,
    collection: &str,
    query: DocumentQuery,
) -> Result<Json<Vec<Value>>, ApiError> {
    pantry.ensure_collection(collection)?;
    let filter = document_filter(collection, &query)?;
    debug!(collection, %filter, "Filter data");
    let documents = pantry.cookability.get_many(collection, filter, None)?;
    debug!(collection, quantity = documents.len(), status = 200, "Read documents");
    Ok(Json(documents.into_iter().map(to_json).collect()))
}

#[post("/documents/<collection>", data = "<documents>")]
pub fn post_documents(
    pantry: &State<Pantry>,
    collection: &str,
    documents: Json<Vec<Map<String, Value>>>,
) -> Result<Status, ApiError> {
    pantry.ensure_collection(collection)?;
    let documents = documents
        .into_inner()
        .into_iter()
        .map(from_json)
        .collect::<Result<Vec<_>, _>>()?;
    if documents.is_empty() {
        return Err(ApiError::Validation("no documents provided".into()));
    }
    let quantity = pantry.cookability.insert_many(collection, documents)?;
    debug!(collection, quantity, status = 201, "Inserted documents");
    Ok(Status::Created)
}

#[delete("/documents/<collection>", data = "<ids>")]
pub fn delete_documents(
    pantry: &State<Pantry>,
    collection: &str,
    ids: Json<Vec<String>>,
) -> Result<Status, ApiError> {
    pantry.ensure_collection(collection)?;
    let filter = id_set(&ids)?;
    let deleted = pantry.store.delete_many(collection, filter)?;
    if deleted == 0 {
        warn!(collection, status = 404, "Nothing to delete");
        return Err(ApiError::NotFound("no documents found".into()));
    }
    debug!(collection, quantity = deleted, status = 200, "Deleted documents");
    Ok(Status::Ok)
}

#[get("/expired")]
pub fn get_expired(pantry: &State<Pantry>) -> Result<Json<Vec<Value>>, ApiError> {
    let filter = stock::expired(stock::now_millis());
    let documents = pantry
        .store
        .find_many(INGREDIENTS, filter, Some(stock::by_expiration()))?;
    debug!(quantity = documents.len(), status = 200, "Read expired items");
    Ok(Json(documents.into_iter().map(to_json).collect()))
}

/// Defaults to `[now, now + lookahead]` when neither bound is given.
#[get("/expiring?<from>&<to>")]
pub fn get_expiring(
    pantry: &State<Pantry>,
    from: Option<&str>,
    to: Option<&str>,
) -> Result<Json<Vec<Value>>, ApiError> {
    let (from, to) = match (from, to) {
        (None, None) => {
            let now = stock::now_millis();
            let lookahead = stock::millis(pantry.settings.snapshot().lookahead);
            (Some(now), Some(now.saturating_add(lookahead)))
        }
        (from, to) => (
            from.map(|v| parse_millis("from", v)).transpose()?,
            to.map(|v| parse_millis("to", v)).transpose()?,
        ),
    };
    let documents = pantry.store.find_many(
        INGREDIENTS,
        stock::expiring(from, to),
        Some(stock::by_expiration()),
    )?;
    debug!(quantity = documents.len(), status = 200, "Read expiring items");
    Ok(Json(documents.into_iter().map(to_json).collect()))
}

/// Reads the stored flag as is.
#[get("/cookable")]
pub fn get_cookable(pantry: &State<Pantry>) -> Result<Json<Vec<Value>>, ApiError> {
    let documents = pantry
        .store
        .find_many(RECIPES, doc! {COOKABLE_FIELD: true}, None)?;
    debug!(quantity = documents.len(), status = 200, "Read cookable recipes");
    Ok(Json(documents.into_iter().map(to_json).collect()))
}

#[catch(default)]
pub fn default_catcher(status: Status, _request: &Request) -> (Status, Json<ErrorResponse>) {
    let body = ErrorResponse {
        status: status.code,
        message: status.reason().unwrap_or("Unknown Error").to_string(),
    };
    (status, Json(body))
}
