use mongodb::bson::{self, oid::ObjectId, Document};
use serde::{Deserialize, Serialize};

/// Read view of an ingredient for descriptors. Only the fields it needs are
/// typed, so a stored number or an extra attribute never fails the decode.
#[derive(Debug, Deserialize, Serialize)]
pub struct Ingredient {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    #[serde(default)]
    pub name: String,
    // free-form, e.g. brand and flavor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Document>,
}

impl Ingredient {
    pub fn from_document(document: Document) -> Result<Self, bson::de::Error> {
        bson::from_document(document)
    }

    /// A non-empty string attribute; other value types count as absent.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .as_ref()
            .and_then(|a| a.get_str(key).ok())
            .filter(|v| !v.is_empty())
    }
}
