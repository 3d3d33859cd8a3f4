// src/contracts/ledger.rs
//! Cold chain certificate ledger.
//!
//! `ColdChain` owns the entity and batch registries, the certificate store
//! and the event log, and is the only way to mutate any of them. Every
//! operation validates all of its preconditions before its first write, so a
//! failed call leaves the ledger exactly as it was and records no event.
//!
//! Issuance and verification are deliberately separate: issuing stores the
//! submitted signature as-is, and anyone can check it later with
//! [`ColdChain::is_matching_signature`].

use crate::contracts::entity_registry::EntityRegistry;
use crate::contracts::events::{EventLog, EventRecord, LedgerEvent};
use crate::contracts::vaccine_batch_registry::VaccineBatchRegistry;
use crate::error::{ColdChainError, Result};
use crate::models::certificate::Certificate;
use crate::models::entity::{Entity, Mode};
use crate::models::status::{self, Status};
use crate::models::vaccine_batch::VaccineBatch;
use crate::services::verifier;
use ethers::types::{Address, Bytes, H256};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Default, Clone)]
pub struct ColdChain {
    entities: EntityRegistry,
    vaccine_batches: VaccineBatchRegistry,
    /// Certificates indexed by id
    certificates: Vec<Certificate>,
    events: EventLog,
}

/// Complete ledger state, as persisted between runs.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub entities: Vec<Entity>,
    pub vaccine_batches: Vec<VaccineBatch>,
    pub certificates: Vec<Certificate>,
    pub events: Vec<EventRecord>,
}

impl ColdChain {
    pub fn new() -> Self {
        Self::default()
    }

    // =====================
    // Entities
    // =====================

    /// Registers a participant with a fixed role and emits `AddEntity`.
    ///
    /// # Errors
    /// `DuplicateEntity` if `id` is already registered
    pub fn add_entity(&mut self, id: Address, mode: Mode) -> Result<()> {
        self.entities.register(id, mode).map_err(|e| {
            warn!("add_entity rejected: {}", e);
            e
        })?;
        self.events.emit(LedgerEvent::AddEntity {
            entity_id: id,
            entity_mode: mode,
        });
        Ok(())
    }

    pub fn get_entity(&self, id: Address) -> Result<&Entity> {
        self.entities.get(id)
    }

    pub fn entities(&self) -> &EntityRegistry {
        &self.entities
    }

    // =====================
    // Vaccine batches
    // =====================

    /// Creates a vaccine batch and emits `AddVaccineBatch`.
    ///
    /// # Returns
    /// The new batch id (sequential from 0)
    ///
    /// # Errors
    /// `EntityNotFound` if the manufacturer is not registered
    pub fn add_vaccine_batch(
        &mut self,
        brand: impl Into<String>,
        manufacturer: Address,
    ) -> Result<u64> {
        let brand = brand.into();
        let id = self
            .vaccine_batches
            .add(&self.entities, brand.clone(), manufacturer)
            .map_err(|e| {
                warn!("add_vaccine_batch rejected: {}", e);
                e
            })?;
        info!("vaccine batch #{} ({}) created for {:?}", id, brand, manufacturer);
        self.events.emit(LedgerEvent::AddVaccineBatch {
            vaccine_batch_id: id,
            manufacturer,
        });
        Ok(id)
    }

    pub fn get_vaccine_batch(&self, id: u64) -> Result<&VaccineBatch> {
        self.vaccine_batches.get(id)
    }

    pub fn vaccine_batches(&self) -> &VaccineBatchRegistry {
        &self.vaccine_batches
    }

    // =====================
    // Certificates
    // =====================

    /// Records a custody certificate for a batch.
    ///
    /// # Arguments
    /// * `issuer` - Entity asserting the custody event
    /// * `prover` - Entity whose custody is attested
    /// * `status` - Must be the batch's next custody status
    /// * `vaccine_batch_id` - Batch the certificate concerns
    /// * `signature` - Off-ledger signature, stored verbatim and not checked here
    ///
    /// # Returns
    /// The new certificate id (global, sequential from 0)
    ///
    /// # Errors
    /// - `EntityNotFound` if the issuer or prover is not registered
    /// - `BatchNotFound` if the batch does not exist
    /// - `InvalidStatusTransition` if `status` skips, repeats or regresses
    ///   the batch's history, or the batch is already delivered
    pub fn issue_certificate(
        &mut self,
        issuer: Address,
        prover: Address,
        status: Status,
        vaccine_batch_id: u64,
        signature: Bytes,
    ) -> Result<u64> {
        self.check_issuance(issuer, prover, status, vaccine_batch_id)
            .map_err(|e| {
                warn!("issue_certificate rejected: {}", e);
                e
            })?;

        let id = self.certificates.len() as u64;
        self.certificates.push(Certificate {
            id,
            issuer,
            prover,
            status,
            vaccine_batch_id,
            signature,
        });
        self.vaccine_batches.append_certificate(vaccine_batch_id, id)?;

        info!(
            "certificate #{} issued: batch #{} is {} ({:?} -> {:?})",
            id, vaccine_batch_id, status, issuer, prover
        );
        self.events.emit(LedgerEvent::IssueCertificate {
            issuer,
            prover,
            certificate_id: id,
        });
        Ok(id)
    }

    fn check_issuance(
        &self,
        issuer: Address,
        prover: Address,
        status: Status,
        vaccine_batch_id: u64,
    ) -> Result<()> {
        self.entities.get(issuer)?;
        self.entities.get(prover)?;
        let batch = self.vaccine_batches.get(vaccine_batch_id)?;

        let history = self.statuses_of(batch);
        if !status::is_valid_next(&history, status) {
            return Err(ColdChainError::InvalidStatusTransition {
                batch_id: vaccine_batch_id,
                expected: status::expected_next(&history),
                found: status,
            });
        }
        Ok(())
    }

    pub fn get_certificate(&self, id: u64) -> Result<&Certificate> {
        usize::try_from(id)
            .ok()
            .and_then(|index| self.certificates.get(index))
            .ok_or(ColdChainError::CertificateNotFound(id))
    }

    /// Certificates of a batch in issuance order.
    pub fn batch_history(&self, vaccine_batch_id: u64) -> Result<Vec<&Certificate>> {
        let batch = self.vaccine_batches.get(vaccine_batch_id)?;
        batch
            .certificate_ids
            .iter()
            .map(|id| self.get_certificate(*id))
            .collect()
    }

    /// Latest custody status of a batch, `None` before its first certificate.
    pub fn current_status(&self, vaccine_batch_id: u64) -> Result<Option<Status>> {
        let batch = self.vaccine_batches.get(vaccine_batch_id)?;
        Ok(self.statuses_of(batch).last().copied())
    }

    fn statuses_of(&self, batch: &VaccineBatch) -> Vec<Status> {
        batch
            .certificate_ids
            .iter()
            .filter_map(|id| self.get_certificate(*id).ok())
            .map(|certificate| certificate.status)
            .collect()
    }

    pub fn certificate_count(&self) -> usize {
        self.certificates.len()
    }

    // =====================
    // Verification
    // =====================

    /// Checks that a certificate's stored signature was produced by
    /// `claimed_issuer` over `message_digest`, and that the same account is
    /// the issuer recorded on the certificate.
    ///
    /// The caller recomputes `message_digest` from the canonical message (see
    /// [`crate::utils::crypto::certification_digest`]); a wrong digest simply
    /// yields `false`.
    ///
    /// # Errors
    /// `CertificateNotFound` if no certificate has this id
    pub fn is_matching_signature(
        &self,
        message_digest: H256,
        certificate_id: u64,
        claimed_issuer: Address,
    ) -> Result<bool> {
        let certificate = self.get_certificate(certificate_id)?;
        Ok(verifier::is_matching_signature(
            certificate,
            message_digest,
            claimed_issuer,
        ))
    }

    // =====================
    // Events & persistence
    // =====================

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            entities: self.entities.iter().cloned().collect(),
            vaccine_batches: self.vaccine_batches.iter().cloned().collect(),
            certificates: self.certificates.clone(),
            events: self.events.records().to_vec(),
        }
    }

    /// Rebuilds a ledger from a snapshot, checking every ledger invariant.
    ///
    /// # Errors
    /// `Snapshot` describing the first inconsistency found
    pub fn restore(snapshot: Snapshot) -> Result<Self> {
        let Snapshot {
            entities: entity_list,
            vaccine_batches,
            certificates,
            events,
        } = snapshot;

        let mut entities = EntityRegistry::new();
        for entity in entity_list {
            entities
                .register(entity.id, entity.mode)
                .map_err(|e| ColdChainError::Snapshot(e.to_string()))?;
        }

        for (position, batch) in vaccine_batches.iter().enumerate() {
            if batch.id != position as u64 {
                return Err(ColdChainError::Snapshot(format!(
                    "vaccine batch at position {} has id {}",
                    position, batch.id
                )));
            }
            if !entities.contains(batch.manufacturer) {
                return Err(ColdChainError::Snapshot(format!(
                    "vaccine batch #{} names unregistered manufacturer {:?}",
                    batch.id, batch.manufacturer
                )));
            }
        }

        for (position, certificate) in certificates.iter().enumerate() {
            if certificate.id != position as u64 {
                return Err(ColdChainError::Snapshot(format!(
                    "certificate at position {} has id {}",
                    position, certificate.id
                )));
            }
            for party in [certificate.issuer, certificate.prover] {
                if !entities.contains(party) {
                    return Err(ColdChainError::Snapshot(format!(
                        "certificate #{} names unregistered entity {:?}",
                        certificate.id, party
                    )));
                }
            }
        }

        let mut listed = 0usize;
        for batch in &vaccine_batches {
            let mut history = Vec::with_capacity(batch.certificate_ids.len());
            let mut previous: Option<u64> = None;
            for id in &batch.certificate_ids {
                let certificate = usize::try_from(*id)
                    .ok()
                    .and_then(|index| certificates.get(index))
                    .filter(|certificate| certificate.vaccine_batch_id == batch.id)
                    .ok_or_else(|| {
                        ColdChainError::Snapshot(format!(
                            "vaccine batch #{} lists certificate #{} which does not belong to it",
                            batch.id, id
                        ))
                    })?;
                if previous.is_some_and(|previous| previous >= *id) {
                    return Err(ColdChainError::Snapshot(format!(
                        "vaccine batch #{} lists certificates out of issuance order",
                        batch.id
                    )));
                }
                if !status::is_valid_next(&history, certificate.status) {
                    return Err(ColdChainError::Snapshot(format!(
                        "vaccine batch #{} has an invalid custody sequence at certificate #{}",
                        batch.id, id
                    )));
                }
                history.push(certificate.status);
                previous = Some(*id);
            }
            listed += batch.certificate_ids.len();
        }
        if listed != certificates.len() {
            return Err(ColdChainError::Snapshot(format!(
                "{} certificates stored but {} listed by batches",
                certificates.len(),
                listed
            )));
        }

        check_event_log(&entities, &vaccine_batches, &certificates, &events)?;
        let events = EventLog::from_records(events).ok_or_else(|| {
            ColdChainError::Snapshot("event sequence numbers are not contiguous".to_string())
        })?;

        info!(
            "ledger restored: {} entities, {} batches, {} certificates",
            entities.len(),
            vaccine_batches.len(),
            certificates.len()
        );
        Ok(ColdChain {
            entities,
            vaccine_batches: VaccineBatchRegistry::from_batches(vaccine_batches),
            certificates,
            events,
        })
    }
}

/// Replays a persisted event log against the persisted state.
///
/// Every entity, batch and certificate must be announced by exactly one
/// event matching the stored record. Batches and certificates are announced
/// in id order, and nothing is referenced before it was announced.
fn check_event_log(
    entities: &EntityRegistry,
    vaccine_batches: &[VaccineBatch],
    certificates: &[Certificate],
    events: &[EventRecord],
) -> Result<()> {
    let stored = entities.len() + vaccine_batches.len() + certificates.len();
    if events.len() != stored {
        return Err(ColdChainError::Snapshot(format!(
            "{} events recorded for {} stored records",
            events.len(),
            stored
        )));
    }

    let mismatch = |record: &EventRecord| {
        ColdChainError::Snapshot(format!(
            "event #{} does not match the stored state",
            record.sequence
        ))
    };

    let mut announced = BTreeSet::new();
    let mut next_batch = 0u64;
    let mut next_certificate = 0u64;
    for record in events {
        let consistent = match &record.event {
            LedgerEvent::AddEntity {
                entity_id,
                entity_mode,
            } => {
                entities
                    .get(*entity_id)
                    .is_ok_and(|entity| entity.mode == *entity_mode)
                    && announced.insert(*entity_id)
            }
            LedgerEvent::AddVaccineBatch {
                vaccine_batch_id,
                manufacturer,
            } => {
                let ok = *vaccine_batch_id == next_batch
                    && vaccine_batches
                        .get(next_batch as usize)
                        .is_some_and(|batch| batch.manufacturer == *manufacturer)
                    && announced.contains(manufacturer);
                next_batch += 1;
                ok
            }
            LedgerEvent::IssueCertificate {
                issuer,
                prover,
                certificate_id,
            } => {
                let ok = *certificate_id == next_certificate
                    && certificates
                        .get(next_certificate as usize)
                        .is_some_and(|certificate| {
                            certificate.issuer == *issuer
                                && certificate.prover == *prover
                                && certificate.vaccine_batch_id < next_batch
                        })
                    && announced.contains(issuer)
                    && announced.contains(prover);
                next_certificate += 1;
                ok
            }
        };
        if !consistent {
            return Err(mismatch(record));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::crypto::certification_digest;
    use crate::wallet::key_management::KeyManager;

    struct Fixture {
        ledger: ColdChain,
        inspector: KeyManager,
        manufacturer: Address,
        verifier: Address,
    }

    fn fixture() -> Fixture {
        let mut ledger = ColdChain::new();
        let inspector = KeyManager::new();
        let manufacturer = Address::repeat_byte(0x01);
        let verifier = Address::repeat_byte(0x04);
        ledger.add_entity(inspector.address(), Mode::Issuer).unwrap();
        ledger.add_entity(manufacturer, Mode::Prover).unwrap();
        ledger.add_entity(verifier, Mode::Verifier).unwrap();
        ledger.add_vaccine_batch("Pfizer-BioNTech", manufacturer).unwrap();
        Fixture {
            ledger,
            inspector,
            manufacturer,
            verifier,
        }
    }

    fn issue(f: &mut Fixture, status: Status, batch: u64) -> Result<u64> {
        let (_, signature) = f.inspector.certify(batch, f.manufacturer).unwrap();
        f.ledger
            .issue_certificate(f.inspector.address(), f.manufacturer, status, batch, signature)
    }

    #[test]
    fn test_add_entity_emits_event() {
        let f = fixture();
        let entity = f.ledger.get_entity(f.verifier).unwrap();
        assert_eq!(entity.mode, Mode::Verifier);
        assert_eq!(
            f.ledger.events().records()[2].event,
            LedgerEvent::AddEntity {
                entity_id: f.verifier,
                entity_mode: Mode::Verifier
            }
        );
    }

    #[test]
    fn test_duplicate_entity_records_no_event() {
        let mut f = fixture();
        let before = f.ledger.events().len();
        let err = f.ledger.add_entity(f.manufacturer, Mode::Issuer).unwrap_err();
        assert!(matches!(err, ColdChainError::DuplicateEntity(_)));
        assert_eq!(f.ledger.events().len(), before);
    }

    #[test]
    fn test_issue_links_certificate_to_batch() {
        let mut f = fixture();
        let id = issue(&mut f, Status::Manufactured, 0).unwrap();
        assert_eq!(id, 0);

        let certificate = f.ledger.get_certificate(0).unwrap();
        assert_eq!(certificate.issuer, f.inspector.address());
        assert_eq!(certificate.prover, f.manufacturer);
        assert_eq!(certificate.status, Status::Manufactured);
        assert_eq!(f.ledger.get_vaccine_batch(0).unwrap().certificate_ids, vec![0]);
        assert_eq!(f.ledger.current_status(0).unwrap(), Some(Status::Manufactured));
    }

    #[test]
    fn test_issue_requires_registered_parties_and_batch() {
        let mut f = fixture();
        let stranger = Address::repeat_byte(0x77);
        let signature = Bytes::from(vec![0u8; 65]);

        let err = f
            .ledger
            .issue_certificate(stranger, f.manufacturer, Status::Manufactured, 0, signature.clone())
            .unwrap_err();
        assert!(matches!(err, ColdChainError::EntityNotFound(id) if id == stranger));

        let err = f
            .ledger
            .issue_certificate(f.inspector.address(), stranger, Status::Manufactured, 0, signature.clone())
            .unwrap_err();
        assert!(matches!(err, ColdChainError::EntityNotFound(id) if id == stranger));

        let err = f
            .ledger
            .issue_certificate(f.inspector.address(), f.manufacturer, Status::Manufactured, 5, signature)
            .unwrap_err();
        assert!(matches!(err, ColdChainError::BatchNotFound(5)));
        assert_eq!(f.ledger.certificate_count(), 0);
    }

    #[test]
    fn test_skipped_status_rejected_without_side_effects() {
        let mut f = fixture();
        issue(&mut f, Status::Manufactured, 0).unwrap();
        let events = f.ledger.events().len();

        let err = issue(&mut f, Status::Stored, 0).unwrap_err();
        assert!(matches!(
            err,
            ColdChainError::InvalidStatusTransition {
                batch_id: 0,
                expected: Some(Status::DeliveringInternational),
                found: Status::Stored,
            }
        ));
        assert_eq!(f.ledger.certificate_count(), 1);
        assert_eq!(f.ledger.get_vaccine_batch(0).unwrap().certificate_ids, vec![0]);
        assert_eq!(f.ledger.events().len(), events);

        // The failed attempt did not consume an id.
        assert_eq!(issue(&mut f, Status::DeliveringInternational, 0).unwrap(), 1);
    }

    #[test]
    fn test_full_custody_chain_then_terminal() {
        let mut f = fixture();
        for (expected_id, status) in Status::SEQUENCE.into_iter().enumerate() {
            assert_eq!(issue(&mut f, status, 0).unwrap(), expected_id as u64);
        }
        let err = issue(&mut f, Status::Delivered, 0).unwrap_err();
        assert!(matches!(
            err,
            ColdChainError::InvalidStatusTransition { expected: None, .. }
        ));

        let history: Vec<Status> = f
            .ledger
            .batch_history(0)
            .unwrap()
            .into_iter()
            .map(|c| c.status)
            .collect();
        assert_eq!(history, Status::SEQUENCE.to_vec());
    }

    #[test]
    fn test_batches_have_independent_histories() {
        let mut f = fixture();
        let second = f.ledger.add_vaccine_batch("Moderna", f.manufacturer).unwrap();
        assert_eq!(second, 1);

        issue(&mut f, Status::Manufactured, 0).unwrap();
        issue(&mut f, Status::DeliveringInternational, 0).unwrap();
        assert_eq!(issue(&mut f, Status::Manufactured, second).unwrap(), 2);

        assert_eq!(f.ledger.get_vaccine_batch(second).unwrap().certificate_ids, vec![2]);
        assert_eq!(f.ledger.current_status(second).unwrap(), Some(Status::Manufactured));
    }

    #[test]
    fn test_unsigned_garbage_is_recorded_but_never_matches() {
        let mut f = fixture();
        let id = f
            .ledger
            .issue_certificate(
                f.inspector.address(),
                f.manufacturer,
                Status::Manufactured,
                0,
                Bytes::from(vec![1, 2, 3]),
            )
            .unwrap();
        let digest = certification_digest(f.inspector.address(), 0, f.manufacturer);
        assert!(!f.ledger.is_matching_signature(digest, id, f.inspector.address()).unwrap());
    }

    #[test]
    fn test_is_matching_signature() {
        let mut f = fixture();
        let id = issue(&mut f, Status::Manufactured, 0).unwrap();
        let digest = certification_digest(f.inspector.address(), 0, f.manufacturer);

        assert!(f.ledger.is_matching_signature(digest, id, f.inspector.address()).unwrap());
        assert!(!f.ledger.is_matching_signature(digest, id, f.verifier).unwrap());

        let wrong_batch = certification_digest(f.inspector.address(), 1, f.manufacturer);
        assert!(!f.ledger.is_matching_signature(wrong_batch, id, f.inspector.address()).unwrap());

        assert!(matches!(
            f.ledger.is_matching_signature(digest, 42, f.inspector.address()),
            Err(ColdChainError::CertificateNotFound(42))
        ));
    }

    #[test]
    fn test_snapshot_restore_continues_ids() {
        let mut f = fixture();
        issue(&mut f, Status::Manufactured, 0).unwrap();

        let mut restored = ColdChain::restore(f.ledger.snapshot()).unwrap();
        assert_eq!(restored.snapshot(), f.ledger.snapshot());

        let batch = restored.add_vaccine_batch("Sputnik V", f.manufacturer).unwrap();
        assert_eq!(batch, 1);
        let (_, signature) = f.inspector.certify(0, f.manufacturer).unwrap();
        let id = restored
            .issue_certificate(
                f.inspector.address(),
                f.manufacturer,
                Status::DeliveringInternational,
                0,
                signature,
            )
            .unwrap();
        assert_eq!(id, 1);
        assert_eq!(restored.events().records().last().unwrap().sequence, 6);
    }

    #[test]
    fn test_restore_rejects_foreign_certificate_reference() {
        let mut f = fixture();
        f.ledger.add_vaccine_batch("Moderna", f.manufacturer).unwrap();
        issue(&mut f, Status::Manufactured, 0).unwrap();

        let mut snapshot = f.ledger.snapshot();
        snapshot.vaccine_batches[0].certificate_ids.clear();
        snapshot.vaccine_batches[1].certificate_ids.push(0);
        assert!(matches!(
            ColdChain::restore(snapshot),
            Err(ColdChainError::Snapshot(_))
        ));
    }

    #[test]
    fn test_restore_rejects_unlisted_or_renumbered_certificates() {
        let mut f = fixture();
        issue(&mut f, Status::Manufactured, 0).unwrap();

        let mut unlisted = f.ledger.snapshot();
        unlisted.vaccine_batches[0].certificate_ids.clear();
        assert!(ColdChain::restore(unlisted).is_err());

        let mut renumbered = f.ledger.snapshot();
        renumbered.certificates[0].id = 3;
        assert!(ColdChain::restore(renumbered).is_err());

        let mut duplicated = f.ledger.snapshot();
        let entity = duplicated.entities[0].clone();
        duplicated.entities.push(entity);
        assert!(ColdChain::restore(duplicated).is_err());
    }

    #[test]
    fn test_restore_rejects_forged_event_log() {
        let mut f = fixture();
        issue(&mut f, Status::Manufactured, 0).unwrap();
        assert!(ColdChain::restore(f.ledger.snapshot()).is_ok());

        let mut erased = f.ledger.snapshot();
        erased.events.clear();
        assert!(matches!(
            ColdChain::restore(erased),
            Err(ColdChainError::Snapshot(_))
        ));

        // Same length, but the first record names an unknown entity.
        let mut foreign = f.ledger.snapshot();
        foreign.events[0].event = LedgerEvent::AddEntity {
            entity_id: Address::repeat_byte(0x77),
            entity_mode: Mode::Issuer,
        };
        assert!(ColdChain::restore(foreign).is_err());

        let mut relabelled = f.ledger.snapshot();
        relabelled.events[1].event = LedgerEvent::AddEntity {
            entity_id: f.manufacturer,
            entity_mode: Mode::Verifier,
        };
        assert!(ColdChain::restore(relabelled).is_err());

        // Certificate announced before its batch.
        let mut reordered = f.ledger.snapshot();
        let batch = reordered.events[3].event.clone();
        reordered.events[3].event = reordered.events[4].event.clone();
        reordered.events[4].event = batch;
        assert!(ColdChain::restore(reordered).is_err());
    }
}
