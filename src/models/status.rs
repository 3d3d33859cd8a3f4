// src/models/status.rs
//! Custody status state machine.
//!
//! A vaccine batch moves through five custody states in a fixed order:
//!
//! ```text
//! MANUFACTURED -> DELIVERING_INTERNATIONAL -> STORED -> DELIVERING_LOCAL -> DELIVERED
//! ```
//!
//! Each certificate issued for a batch must carry exactly the next state.
//! There is no skipping, repeating or going back, and `DELIVERED` is terminal.
//! This module holds no state; the ledger feeds it a batch's history.

use crate::error::{ColdChainError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Legacy spelling still produced by older clients for `MANUFACTURED`.
const MANUFACTURED_ALIAS: &str = "MANUFACTORED";

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Manufactured,
    DeliveringInternational,
    Stored,
    DeliveringLocal,
    Delivered,
}

impl Status {
    /// All states in custody order.
    pub const SEQUENCE: [Status; 5] = [
        Status::Manufactured,
        Status::DeliveringInternational,
        Status::Stored,
        Status::DeliveringLocal,
        Status::Delivered,
    ];

    pub fn ordinal(self) -> u8 {
        self as u8
    }

    pub fn from_ordinal(ordinal: u8) -> Result<Self> {
        Status::SEQUENCE
            .get(usize::from(ordinal))
            .copied()
            .ok_or_else(|| ColdChainError::UnknownStatus(ordinal.to_string()))
    }

    /// The state that follows this one, or `None` for `DELIVERED`.
    pub fn next(self) -> Option<Status> {
        Status::SEQUENCE.get(usize::from(self.ordinal()) + 1).copied()
    }

    pub fn is_terminal(self) -> bool {
        self.next().is_none()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Manufactured => "MANUFACTURED",
            Status::DeliveringInternational => "DELIVERING_INTERNATIONAL",
            Status::Stored => "STORED",
            Status::DeliveringLocal => "DELIVERING_LOCAL",
            Status::Delivered => "DELIVERED",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = ColdChainError;

    fn from_str(label: &str) -> Result<Self> {
        if label == MANUFACTURED_ALIAS {
            return Ok(Status::Manufactured);
        }
        Status::SEQUENCE
            .into_iter()
            .find(|status| status.as_str() == label)
            .ok_or_else(|| ColdChainError::UnknownStatus(label.to_string()))
    }
}

/// Maps a status label to its position in the custody sequence.
pub fn ordinal(label: &str) -> Result<u8> {
    label.parse::<Status>().map(Status::ordinal)
}

/// The only status a new certificate may carry given a batch's history
/// (statuses of its certificates, oldest first).
///
/// Returns `None` when the batch has already been delivered.
pub fn expected_next(history: &[Status]) -> Option<Status> {
    match history.last() {
        None => Some(Status::Manufactured),
        Some(last) => last.next(),
    }
}

/// Whether `candidate` may be appended to `history`.
pub fn is_valid_next(history: &[Status], candidate: Status) -> bool {
    expected_next(history) == Some(candidate)
}
