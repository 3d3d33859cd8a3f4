// src/models/entity.rs
//! Supply-chain participant data model.
//!
//! An entity is an Ethereum-style account registered with one fixed role.
//! Roles form a closed set, so they are modelled as a plain enum.

use crate::error::ColdChainError;
use ethers::types::Address;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Role an entity plays in the custody chain.
///
/// The ordinal of each variant matches the position exposed by the ledger
/// (`ISSUER` = 0, `PROVER` = 1, `VERIFIER` = 2).
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Mode {
    /// Certifies custody events (inspectors, immunizers)
    Issuer,
    /// Subject whose custody is attested (manufacturers, travellers)
    Prover,
    /// Checks certificates (distributors, border agents)
    Verifier,
}

impl Mode {
    pub const ALL: [Mode; 3] = [Mode::Issuer, Mode::Prover, Mode::Verifier];

    pub fn ordinal(self) -> u8 {
        self as u8
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Issuer => "ISSUER",
            Mode::Prover => "PROVER",
            Mode::Verifier => "VERIFIER",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = ColdChainError;

    /// Parses a role label. Labels are matched exactly, as the ledger stores them.
    fn from_str(label: &str) -> Result<Self, Self::Err> {
        Mode::ALL
            .into_iter()
            .find(|mode| mode.as_str() == label)
            .ok_or_else(|| ColdChainError::InvalidMode(label.to_string()))
    }
}

/// A registered participant.
///
/// Created once by the registry and never mutated afterwards.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    /// Account address identifying the participant
    pub id: Address,

    /// Role fixed at registration
    pub mode: Mode,
}
