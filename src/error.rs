// src/error.rs
//! Error types for the cold chain ledger.
//!
//! Every ledger operation returns [`Result<T>`]. Failures are synchronous and
//! abort the whole operation before any write, so an `Err` always means the
//! ledger state is unchanged.

use crate::models::status::Status;
use ethers::types::Address;
use thiserror::Error;

/// Coarse classification of a [`ColdChainError`].
///
/// The HTTP layer maps these onto status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A referenced entity, batch or certificate does not exist
    NotFound,
    /// The operation collides with existing state
    Conflict,
    /// The arguments are malformed or break a ledger rule
    Invalid,
    /// Reading or writing persisted state failed
    Storage,
}

/// Domain error for all ledger operations.
#[derive(Error, Debug)]
pub enum ColdChainError {
    #[error("entity {0:?} is not registered")]
    EntityNotFound(Address),

    #[error("vaccine batch #{0} does not exist")]
    BatchNotFound(u64),

    #[error("certificate #{0} does not exist")]
    CertificateNotFound(u64),

    #[error("entity {0:?} is already registered")]
    DuplicateEntity(Address),

    #[error("unknown entity mode '{0}' (expected ISSUER, PROVER or VERIFIER)")]
    InvalidMode(String),

    #[error("unknown status '{0}'")]
    UnknownStatus(String),

    /// The requested status is not the next step of the batch's custody history.
    /// `expected` is `None` once the batch has reached `DELIVERED`.
    #[error("vaccine batch #{batch_id} cannot move to {found}: expected {}", describe_expected(.expected))]
    InvalidStatusTransition {
        batch_id: u64,
        expected: Option<Status>,
        found: Status,
    },

    /// An HTTP body, path segment or query string could not be parsed.
    #[error("malformed request: {0}")]
    MalformedRequest(String),

    #[error("signing failed: {0}")]
    Signing(#[from] k256::ecdsa::Error),

    #[error("snapshot rejected: {0}")]
    Snapshot(String),

    #[error("serialization: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

impl ColdChainError {
    /// Classifies the error into the ledger's error taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::EntityNotFound(_) | Self::BatchNotFound(_) | Self::CertificateNotFound(_) => {
                ErrorKind::NotFound
            }
            Self::DuplicateEntity(_) => ErrorKind::Conflict,
            Self::InvalidMode(_)
            | Self::UnknownStatus(_)
            | Self::InvalidStatusTransition { .. }
            | Self::MalformedRequest(_)
            | Self::Signing(_)
            | Self::Snapshot(_)
            | Self::Serialization(_) => ErrorKind::Invalid,
            Self::Io(_) => ErrorKind::Storage,
        }
    }
}

fn describe_expected(expected: &Option<Status>) -> String {
    match expected {
        Some(status) => status.to_string(),
        None => "no further status".to_string(),
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ColdChainError>;
