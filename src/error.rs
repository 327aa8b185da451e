//! Error handling for the Oh My Fitness client

use std::fmt;
use std::sync::Arc;
use thiserror::Error;

pub use oh_my_fitness_auth::AuthError;

use crate::survey::SurveyStep;

/// A survey step that cannot be advanced past yet
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("step {step}: {message}")]
pub struct ValidationError {
    pub step: SurveyStep,
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new<T: fmt::Display>(step: SurveyStep, field: &'static str, message: T) -> Self {
        Self {
            step,
            field,
            message: message.to_string(),
        }
    }
}

/// Unified error type for the client
#[derive(Error, Debug)]
pub enum Error {
    /// Network or HTTP related errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization or deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing errors
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// Authentication errors
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    /// Incomplete survey data
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A numeric survey field that does not parse
    #[error("Malformed input for {field}: {value:?}")]
    MalformedInput { field: &'static str, value: String },

    /// The API answered with a non-success status
    #[error("Request failed with status {status}: {message}")]
    Api { status: u16, message: String },

    /// One failure delivered to every caller waiting on the same request
    #[error(transparent)]
    Shared(Arc<Error>),

    /// General errors
    #[error("{0}")]
    General(String),
}

impl Error {
    /// Create a new API error
    pub fn api<T: fmt::Display>(status: u16, msg: T) -> Self {
        Error::Api {
            status,
            message: msg.to_string(),
        }
    }

    /// Create a new general error
    pub fn general<T: fmt::Display>(msg: T) -> Self {
        Error::General(msg.to_string())
    }

    pub fn malformed(field: &'static str, value: &str) -> Self {
        Error::MalformedInput {
            field,
            value: value.to_string(),
        }
    }

    /// The error behind any number of [`Error::Shared`] wrappers
    pub fn root(&self) -> &Error {
        match self {
            Error::Shared(inner) => inner.root(),
            other => other,
        }
    }

    /// Whether the failure happened on the way to or from the API
    pub fn is_network(&self) -> bool {
        matches!(self.root(), Error::Http(_) | Error::Api { .. })
    }
}
