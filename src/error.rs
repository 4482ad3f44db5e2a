use crate::infra::store::StoreError;
use crate::pantry::cookable::CookableError;
use rocket::http::Status;
use rocket::response::{self, Responder, Response};
use rocket::serde::json::Json;
use rocket::Request;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    /// The read succeeded but persisting a corrected `isCookable` failed.
    #[error("failed to correct cookable flag: {0}")]
    Correction(StoreError),
    #[error(transparent)]
    Cookability(#[from] CookableError),
    #[error("failed to encode document: {0}")]
    Encode(String),
}

impl ApiError {
    pub fn status(&self) -> Status {
        match self {
            ApiError::NotFound(_) => Status::NotFound,
            ApiError::Validation(_) => Status::BadRequest,
            ApiError::Store(StoreError::NotFound | StoreError::NoMatch) => Status::NotFound,
            ApiError::Store(_) => Status::InternalServerError,
            ApiError::Correction(_) => Status::InternalServerError,
            ApiError::Cookability(CookableError::StoreQuery(_)) => Status::InternalServerError,
            ApiError::Cookability(_) => Status::BadRequest,
            ApiError::Encode(_) => Status::InternalServerError,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub status: u16,
    pub message: String,
}

impl<'r> Responder<'r, 'static> for ApiError {
    fn respond_to(self, request: &'r Request<'_>) -> response::Result<'static> {
        let status = self.status();
        let body = Json(ErrorResponse {
            status: status.code,
            message: self.to_string(),
        });
        Response::build_from(body.respond_to(request)?)
            .status(status)
            .ok()
    }
}
