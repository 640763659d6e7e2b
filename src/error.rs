use sled::transaction::TransactionError;

use crate::types::{LedgerKind, PetroleumType};

pub type Result<T> = std::result::Result<T, BackofficeError>;

#[derive(thiserror::Error, Debug)]
pub enum BackofficeError {
    #[error("{0}")]
    Validation(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error(
        "Insufficient {product} balance in {location}. Available: {available:.2} gallons, Required: {required:.2} gallons"
    )]
    InsufficientBalance {
        product: PetroleumType,
        location: LedgerKind,
        available: f64,
        required: f64,
    },
    #[error("{0}")]
    InvalidState(String),
    #[error("Invalid credentials")]
    Unauthorized,
    #[error("storage failure: {0}")]
    Storage(#[from] sled::Error),
    #[error("failed to encode record: {0}")]
    Encode(String),
    #[error("failed to decode record: {0}")]
    Decode(#[from] minicbor::decode::Error),
    #[error("failed to generate identifier: {0}")]
    Identifier(#[from] bech32::EncodeError),
}

impl BackofficeError {
    /// True for failures caused by the caller rather than by the service.
    pub fn is_client_error(&self) -> bool {
        !matches!(
            self,
            BackofficeError::Storage(_)
                | BackofficeError::Encode(_)
                | BackofficeError::Decode(_)
                | BackofficeError::Identifier(_)
        )
    }
}

impl From<TransactionError<BackofficeError>> for BackofficeError {
    fn from(value: TransactionError<BackofficeError>) -> Self {
        match value {
            TransactionError::Abort(err) => err,
            TransactionError::Storage(err) => BackofficeError::Storage(err),
        }
    }
}
