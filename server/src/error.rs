use std::borrow::Cow;

use hyper::StatusCode;
use thiserror::Error;

use shared::types::ErrorResponse;

use crate::auth::AuthError;
use crate::database::DirectoryError;

const INTERNAL_TITLE: &str = "Internal Server Error";
const INTERNAL_DETAIL: &str = "An unknown error has occurred";

/// Everything a handler or the gate can fail with. Each variant knows its
/// status, title and detail; [`ApiError::to_problem`] is the only place the
/// envelope is built.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("validation failed: {title}")]
    Validation { title: String, detail: String },

    #[error("endpoint not found: {0}")]
    NoRoute(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Directory(#[from] DirectoryError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn validation(title: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Validation {
            title: title.into(),
            detail: detail.into(),
        }
    }

    /// Body could not be parsed as the expected shape. `detail` names what
    /// was expected.
    pub fn wrong_body_format(detail: impl Into<String>) -> Self {
        Self::validation("Wrong body format", detail)
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::NoRoute(_) => StatusCode::NOT_FOUND,
            Self::Auth(e) => e.status(),
            Self::Directory(e) => match e {
                DirectoryError::AlreadyExists => StatusCode::CONFLICT,
                DirectoryError::NotFound(_) => StatusCode::NOT_FOUND,
                DirectoryError::BadCredentials => StatusCode::UNAUTHORIZED,
                DirectoryError::Hash(_) | DirectoryError::Storage(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn title(&self) -> Cow<'_, str> {
        match self {
            Self::Validation { title, .. } => Cow::Borrowed(title),
            Self::NoRoute(_) => Cow::Borrowed("Not Found"),
            Self::Auth(e) => Cow::Borrowed(e.title()),
            Self::Directory(e) => Cow::Borrowed(match e {
                DirectoryError::AlreadyExists => "Username or email already in use",
                DirectoryError::NotFound(_) => "User not found",
                DirectoryError::BadCredentials => "Credentials don't match",
                DirectoryError::Hash(_) | DirectoryError::Storage(_) => INTERNAL_TITLE,
            }),
            Self::Internal(_) => Cow::Borrowed(INTERNAL_TITLE),
        }
    }

    pub fn detail(&self) -> Cow<'_, str> {
        match self {
            Self::Validation { detail, .. } => Cow::Borrowed(detail),
            Self::NoRoute(path) => Cow::Owned(format!("No endpoint matches {}", path)),
            Self::Auth(e) => Cow::Borrowed(e.detail()),
            Self::Directory(e) => match e {
                DirectoryError::AlreadyExists => Cow::Borrowed(
                    "The provided username or email are already in use, try something else",
                ),
                DirectoryError::NotFound(username) => Cow::Owned(format!(
                    "The user with the username {} was not found",
                    username
                )),
                DirectoryError::BadCredentials => {
                    Cow::Borrowed("User identification or password are wrong, please try again")
                }
                DirectoryError::Hash(_) | DirectoryError::Storage(_) => {
                    Cow::Borrowed(INTERNAL_DETAIL)
                }
            },
            Self::Internal(_) => Cow::Borrowed(INTERNAL_DETAIL),
        }
    }

    pub fn to_problem(&self, instance: &str) -> ErrorResponse {
        ErrorResponse::new(self.status().as_u16(), &self.title(), &self.detail(), instance)
    }
}
