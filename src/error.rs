use std::io::Cursor;

use rocket::{
    http::{ContentType, Status},
    response::{self, Responder},
    Request, Response,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("An error occured whilst trying to access the database: {0}")]
    Database(#[from] sea_orm::DbErr),
    #[error("An error occured whilst rendering")]
    TemplateRendering(#[from] tera::Error),
    #[error("An error occured whilst loading templates: {0}")]
    TemplateLoading(#[from] crate::templates::TemplateError),
    #[error("An error occured whilst handling a credential: {0}")]
    CredentialHash(#[from] argon2::password_hash::Error),
    #[error("Could not store the uploaded picture: {0}")]
    PictureStore(std::io::Error),
    #[error("No such contact could be found.")]
    ContactNotFound,
    #[error("You need to be logged in to do that.")]
    NotLoggedIn,
    #[error("The template engine is not available.")]
    TemplateNotFound,
    #[error("The database is not available.")]
    DatabaseNotFound,
}

pub trait ErrorResponder {
    fn response(&self) -> (Status, String);
}

impl ErrorResponder for Error {
    fn response(&self) -> (Status, String) {
        (
            match self {
                Error::Database(_)
                | Error::TemplateRendering(_)
                | Error::TemplateLoading(_)
                | Error::CredentialHash(_)
                | Error::PictureStore(_)
                | Error::TemplateNotFound
                | Error::DatabaseNotFound => Status::InternalServerError,
                Error::ContactNotFound => Status::NotFound,
                Error::NotLoggedIn => Status::Unauthorized,
            },
            self.to_string(),
        )
    }
}

impl<'r> Responder<'r, 'static> for Error {
    fn respond_to(self, _: &'r Request<'_>) -> response::Result<'static> {
        let (status, body) = self.response();
        Response::build()
            .status(status)
            .header(ContentType::Plain)
            .sized_body(body.len(), Cursor::new(body))
            .ok()
    }
}
