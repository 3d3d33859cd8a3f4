// src/contracts/mod.rs
//! On-ledger state: the registries, the certificate ledger that drives them,
//! and the audit event log.

pub mod entity_registry;
pub mod events;
pub mod ledger;
pub mod vaccine_batch_registry;
