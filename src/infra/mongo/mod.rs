mod api;
mod types;

pub use api::MongoRep;
pub use types::Ingredient;
