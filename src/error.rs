//! Errors surfaced by the ledger.
//!
//! Ledger corruption is never an error here: the aggregator reports it through
//! [`BalanceReport::invariant_valid`] instead. The variants below cover the
//! cases where a computation cannot start at all, plus write-path validation
//! and collaborator failures.
//!
//! [`BalanceReport::invariant_valid`]: crate::balance::BalanceReport::invariant_valid
use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SplitError>;

#[derive(Error, Debug)]
pub enum SplitError {
    #[error("No group given")]
    MissingGroup,
    #[error("Couldn't find the group \"{0}\"")]
    GroupNotFound(String),
    #[error("Group \"{0}\" already exists")]
    GroupExists(String),
    #[error("Invalid group: {0}")]
    InvalidGroup(String),
    #[error("Invalid expense: {0}")]
    InvalidExpense(String),
    #[error("Invalid month: {0}")]
    InvalidMonth(String),
    #[error(transparent)]
    Database(#[from] mongodb::error::Error),
    #[error(transparent)]
    Serialization(#[from] bson::ser::Error),
    #[error(transparent)]
    Config(#[from] config::ConfigError),
}

impl PartialEq for SplitError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::MissingGroup, Self::MissingGroup) => true,
            (Self::GroupNotFound(a), Self::GroupNotFound(b)) => a == b,
            (Self::GroupExists(a), Self::GroupExists(b)) => a == b,
            (Self::InvalidGroup(a), Self::InvalidGroup(b)) => a == b,
            (Self::InvalidExpense(a), Self::InvalidExpense(b)) => a == b,
            (Self::InvalidMonth(a), Self::InvalidMonth(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            (Self::Serialization(a), Self::Serialization(b)) => a.to_string() == b.to_string(),
            (Self::Config(a), Self::Config(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}

impl ResponseError for SplitError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingGroup
            | Self::InvalidGroup(_)
            | Self::InvalidExpense(_)
            | Self::InvalidMonth(_) => StatusCode::BAD_REQUEST,
            Self::GroupNotFound(_) => StatusCode::NOT_FOUND,
            Self::GroupExists(_) => StatusCode::CONFLICT,
            Self::Database(_) | Self::Serialization(_) | Self::Config(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).body(self.to_string())
    }
}
