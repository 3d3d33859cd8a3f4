// src/contracts/events.rs
//! Append-only audit log of ledger mutations.
//!
//! Every successful mutation appends exactly one record after its writes are
//! in place. Failed operations record nothing. Records carry a sequence
//! number equal to their position in the log, so observers can poll with
//! [`EventLog::since`].

use crate::models::entity::Mode;
use chrono::{DateTime, Utc};
use ethers::types::Address;
use log::info;
use serde::{Deserialize, Serialize};

/// Observable ledger mutation.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum LedgerEvent {
    AddEntity {
        entity_id: Address,
        entity_mode: Mode,
    },
    AddVaccineBatch {
        vaccine_batch_id: u64,
        manufacturer: Address,
    },
    IssueCertificate {
        issuer: Address,
        prover: Address,
        certificate_id: u64,
    },
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    pub sequence: u64,
    pub recorded_at: DateTime<Utc>,
    pub event: LedgerEvent,
}

#[derive(Debug, Default, Clone)]
pub struct EventLog {
    records: Vec<EventRecord>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an event and returns its sequence number.
    pub(crate) fn emit(&mut self, event: LedgerEvent) -> u64 {
        let sequence = self.records.len() as u64;
        info!("event #{}: {:?}", sequence, event);
        self.records.push(EventRecord {
            sequence,
            recorded_at: Utc::now(),
            event,
        });
        sequence
    }

    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    /// Records with a sequence number of at least `sequence`.
    pub fn since(&self, sequence: u64) -> &[EventRecord] {
        let start = usize::try_from(sequence)
            .unwrap_or(usize::MAX)
            .min(self.records.len());
        &self.records[start..]
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Rebuilds a log from persisted records, which must be numbered
    /// `0..n` in order.
    pub(crate) fn from_records(records: Vec<EventRecord>) -> Option<Self> {
        let sequential = records
            .iter()
            .enumerate()
            .all(|(position, record)| record.sequence == position as u64);
        sequential.then_some(EventLog { records })
    }
}
