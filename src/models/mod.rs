// src/models/mod.rs
//! Ledger records: entities, vaccine batches, certificates and the custody
//! status sequence.

pub mod certificate;
pub mod entity;
pub mod status;
pub mod vaccine_batch;
