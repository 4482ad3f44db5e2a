mod config;
mod error;
mod infra;
mod pantry;
#[cfg(test)]
mod testing;

use config::{Config, SettingsHandle};
use infra::store::DocumentStore;
use infra::trello::TrelloBoard;
use infra::twilio::TwilioMessenger;
use infra::*;
use pantry::watcher::ExpirationWatcher;
use rocket::fairing::{Fairing, Info, Kind};
use rocket::http::Header;
use rocket::{Build, Request, Response, Rocket};
use std::process;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[macro_use]
extern crate rocket;
pub struct CORS;

#[rocket::async_trait]
impl Fairing for CORS {
    fn info(&self) -> Info {
        Info {
            name: "Attaching CORS headers to responses",
            kind: Kind::Response,
        }
    }

    async fn on_response<'r>(&self, _request: &'r Request<'_>, response: &mut Response<'r>) {
        response.set_header(Header::new("Access-Control-Allow-Origin", "*"));
        response.set_header(Header::new(
            "Access-Control-Allow-Methods",
            "POST, GET, PUT, DELETE, OPTIONS",
        ));
        response.set_header(Header::new("Access-Control-Allow-Headers", "*"));
        response.set_header(Header::new("Access-Control-Allow-Credentials", "true"));
    }
}

pub fn build_rocket(pantry: Pantry) -> Rocket<Build> {
    rocket::build()
        .manage(pantry)
        .mount(
            "/",
            routes![
                get_configuration,
                put_configuration,
                get_document,
                put_document,
                delete_document,
                get_documents,
                post_documents,
                delete_documents,
                get_expired,
                get_expiring,
                get_cookable
            ],
        )
        .register("/", catchers![default_catcher])
        .attach(CORS)
}

fn main() {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pantry_back=info,rocket=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Failed to load configuration");
            process::exit(1);
        }
    };

    let store: Arc<dyn DocumentStore> = match MongoRep::init(&config.mongo_uri, &config.mongo_database) {
        Ok(rep) => Arc::new(rep),
        Err(e) => {
            error!(uri = %config.mongo_uri, error = %e, "Failed to initialize store");
            process::exit(1);
        }
    };

    let board = match TrelloBoard::new(config.trello, config.timeout) {
        Ok(board) => board,
        Err(e) => {
            error!(error = %e, "Failed to initialize task board client");
            process::exit(1);
        }
    };
    let messenger = match TwilioMessenger::new(config.twilio, config.timeout) {
        Ok(messenger) => messenger,
        Err(e) => {
            error!(error = %e, "Failed to initialize messaging client");
            process::exit(1);
        }
    };

    let settings = Arc::new(SettingsHandle::new(config.settings));
    let watcher = ExpirationWatcher::new(Arc::clone(&store), Arc::clone(&settings), board, messenger);
    let watcher = match watcher.spawn() {
        Ok(handle) => handle,
        Err(e) => {
            error!(error = %e, "Failed to start expiration watcher");
            process::exit(1);
        }
    };
    info!("Expiration watcher started");

    let pantry = Pantry::new(store, settings);
    let launched = rocket::execute(build_rocket(pantry).launch());
    watcher.stop();
    if let Err(e) = launched {
        error!(kind = %e.kind(), "Server failed");
        process::exit(1);
    }
}
