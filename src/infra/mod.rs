pub mod filters;
pub mod mongo;
pub mod routes;
pub mod store;
pub mod trello;
pub mod twilio;

pub use mongo::MongoRep;
pub use routes::*;
