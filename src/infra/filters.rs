use crate::error::ApiError;
use crate::infra::store::INGREDIENTS;
use crate::pantry::stock;
use mongodb::bson::{doc, oid::ObjectId, Document};
use rocket::FromForm;

/// Query string of a bulk document read.
#[derive(Debug, Default, FromForm)]
pub struct DocumentQuery {
    pub from: Option<String>,
    pub to: Option<String>,
    pub name: Option<String>,
    #[field(name = "type")]
    pub kind: Option<String>,
    #[field(name = "haveStocked")]
    pub have_stocked: Option<String>,
}

/// Epoch milliseconds in base 10.
pub fn parse_millis(key: &str, value: &str) -> Result<i64, ApiError> {
    value
        .parse()
        .map_err(|e| ApiError::Validation(format!("invalid {key} value {value:?}: {e}")))
}

pub fn parse_bool(key: &str, value: &str) -> Result<bool, ApiError> {
    match value {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Ok(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Ok(false),
        _ => Err(ApiError::Validation(format!(
            "invalid {key} value {value:?}: expected a boolean"
        ))),
    }
}

pub fn parse_object_id(id: &str) -> Result<ObjectId, ApiError> {
    ObjectId::parse_str(id).map_err(|e| ApiError::Validation(format!("invalid id {id:?}: {e}")))
}

/// `{"_id": {"$in": [...]}}` for a set of hex ids; the first bad id fails.
pub fn id_set(ids: &[String]) -> Result<Document, ApiError> {
    let ids = ids
        .iter()
        .map(|id| parse_object_id(id))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(doc! {"_id": {"$in": ids}})
}

/// Builds the filter of a bulk read. Ingredients default to stocked items.
pub fn document_filter(collection: &str, query: &DocumentQuery) -> Result<Document, ApiError> {
    let from = query
        .from
        .as_deref()
        .map(|v| parse_millis("from", v))
        .transpose()?;
    let to = query
        .to
        .as_deref()
        .map(|v| parse_millis("to", v))
        .transpose()?;
    let have_stocked = match query.have_stocked.as_deref() {
        Some(value) => Some(parse_bool("haveStocked", value)?),
        None if collection == INGREDIENTS => Some(true),
        None => None,
    };

    let mut clauses = Vec::new();
    if let Some(have_stocked) = have_stocked {
        clauses.push(doc! {"haveStocked": {"$eq": have_stocked}});
    }
    if let Some(name) = &query.name {
        clauses.push(doc! {"name": name.as_str()});
    }
    if let Some(kind) = &query.kind {
        clauses.push(doc! {"type": kind.as_str()});
    }
    if let Some(window) = stock::window(from, to) {
        clauses.push(window);
    }

    if clauses.is_empty() {
        return Ok(Document::new());
    }
    Ok(doc! {"$and": clauses})
}
