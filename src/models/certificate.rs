// src/models/certificate.rs
//! Custody certificate data model.

use crate::models::status::Status;
use ethers::types::{Address, Bytes};
use serde::{Deserialize, Serialize};

/// A signed assertion that a batch reached a custody status.
///
/// Every field is fixed once the ledger stores the certificate. The
/// signature is kept exactly as the issuer submitted it; checking it is a
/// separate ledger operation.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Certificate {
    /// Global sequential id, starting at 0
    pub id: u64,

    /// Entity asserting the custody event
    pub issuer: Address,

    /// Entity whose custody is attested
    pub prover: Address,

    /// Custody status the certificate asserts
    pub status: Status,

    /// Batch the certificate concerns
    pub vaccine_batch_id: u64,

    /// 65-byte `r || s || v` secp256k1 signature produced off-ledger
    pub signature: Bytes,
}
