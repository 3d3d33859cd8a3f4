// src/lib.rs

//! # Cold Chain - vaccine custody certificate ledger
//!
//! Tracks vaccine batches from manufacturer to immunizer by recording signed
//! custody certificates, and lets anyone check later that a certificate was
//! really signed by the issuer it names.
//!
//! ## Architecture Overview
//! 1. **Models**: entities, vaccine batches, certificates and the custody
//!    status sequence
//! 2. **Contracts**: the entity and batch registries, the certificate ledger
//!    (`ColdChain`) and its audit event log
//! 3. **Services**: signature verification and the HTTP API
//! 4. **Wallet**: the off-ledger signing client issuers use
//! 5. **Utils**: Keccak/EIP-191 helpers and snapshot persistence

pub mod config;
pub mod contracts; // Registries, certificate ledger, events
pub mod error;
pub mod models; // Data structures
pub mod services; // Verification and API
pub mod utils; // Helper functions
pub mod wallet; // Issuer-side signing

pub use contracts::ledger::{ColdChain, Snapshot};
pub use error::{ColdChainError, ErrorKind, Result};
