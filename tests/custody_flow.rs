use anyhow::Result;
use ethers::types::Address;

use cold_chain::{
    contracts::events::LedgerEvent,
    models::{entity::Mode, status::Status, vaccine_batch::VaccineBrand},
    utils::crypto::certification_digest,
    wallet::key_management::KeyManager,
    ColdChain, ColdChainError,
};

struct Participants {
    manufacturer_a: Address,
    manufacturer_b: Address,
    inspector: KeyManager,
    distributor_global: Address,
    distributor_local: Address,
    immunizer: KeyManager,
    traveller: Address,
    border_agent: Address,
}

impl Participants {
    fn new() -> Self {
        Participants {
            manufacturer_a: Address::repeat_byte(0x01),
            manufacturer_b: Address::repeat_byte(0x02),
            inspector: KeyManager::new(),
            distributor_global: Address::repeat_byte(0x04),
            distributor_local: Address::repeat_byte(0x05),
            immunizer: KeyManager::new(),
            traveller: Address::repeat_byte(0x07),
            border_agent: Address::repeat_byte(0x08),
        }
    }

    fn roster(&self) -> Vec<(Address, Mode)> {
        vec![
            (self.manufacturer_a, Mode::Prover),
            (self.manufacturer_b, Mode::Prover),
            (self.inspector.address(), Mode::Issuer),
            (self.distributor_global, Mode::Verifier),
            (self.distributor_local, Mode::Verifier),
            (self.immunizer.address(), Mode::Issuer),
            (self.traveller, Mode::Prover),
            (self.border_agent, Mode::Verifier),
        ]
    }

    fn batches(&self) -> Vec<(VaccineBrand, Address)> {
        use VaccineBrand::*;
        let (a, b) = (self.manufacturer_a, self.manufacturer_b);
        vec![
            (Pfizer, a),
            (Moderna, a),
            (Janssen, b),
            (Sputnik, b),
            (Pfizer, b),
            (Pfizer, a),
            (Moderna, a),
            (Moderna, b),
            (Sputnik, b),
            (Janssen, a),
        ]
    }
}

fn populated_ledger(p: &Participants) -> Result<ColdChain> {
    let mut ledger = ColdChain::new();
    for (id, mode) in p.roster() {
        ledger.add_entity(id, mode)?;
    }
    for (brand, manufacturer) in p.batches() {
        ledger.add_vaccine_batch(brand.label(), manufacturer)?;
    }
    Ok(ledger)
}

#[test]
fn registers_entities_and_batches() -> Result<()> {
    let p = Participants::new();
    let ledger = populated_ledger(&p)?;

    for (id, mode) in p.roster() {
        let entity = ledger.get_entity(id)?;
        assert_eq!(entity.id, id);
        assert_eq!(entity.mode, mode);
    }

    for (position, (brand, manufacturer)) in p.batches().into_iter().enumerate() {
        let batch = ledger.get_vaccine_batch(position as u64)?;
        assert_eq!(batch.id, position as u64);
        assert_eq!(batch.brand, brand.label());
        assert_eq!(batch.manufacturer, manufacturer);
        assert!(batch.certificate_ids.is_empty());
    }

    let records = ledger.events().records();
    assert_eq!(records.len(), 18);
    assert_eq!(
        records[8].event,
        LedgerEvent::AddVaccineBatch {
            vaccine_batch_id: 0,
            manufacturer: p.manufacturer_a,
        }
    );
    Ok(())
}

#[test]
fn inspector_certifies_batch_and_signature_verifies() -> Result<()> {
    let p = Participants::new();
    let mut ledger = populated_ledger(&p)?;
    let inspector = p.inspector.address();

    let (digest, signature) = p.inspector.certify(0, p.manufacturer_a)?;
    let certificate_id = ledger.issue_certificate(
        inspector,
        p.manufacturer_a,
        Status::Manufactured,
        0,
        signature.clone(),
    )?;
    assert_eq!(certificate_id, 0);
    assert_eq!(
        ledger.events().records().last().map(|r| r.event.clone()),
        Some(LedgerEvent::IssueCertificate {
            issuer: inspector,
            prover: p.manufacturer_a,
            certificate_id: 0,
        })
    );

    let certificate = ledger.get_certificate(0)?;
    assert_eq!(certificate.issuer, inspector);
    assert_eq!(certificate.prover, p.manufacturer_a);
    assert_eq!(certificate.signature, signature);
    assert_eq!(certificate.status.ordinal(), 0);
    assert_eq!(ledger.get_vaccine_batch(0)?.certificate_ids, vec![0]);

    // Verifiers rebuild the digest from the canonical message themselves.
    let rebuilt = certification_digest(inspector, 0, p.manufacturer_a);
    assert_eq!(rebuilt, digest);
    assert!(ledger.is_matching_signature(rebuilt, 0, inspector)?);
    assert!(!ledger.is_matching_signature(rebuilt, 0, p.border_agent)?);
    assert!(!ledger.is_matching_signature(rebuilt, 0, p.immunizer.address())?);

    let wrong_prover = certification_digest(inspector, 0, p.manufacturer_b);
    assert!(!ledger.is_matching_signature(wrong_prover, 0, inspector)?);
    Ok(())
}

#[test]
fn custody_statuses_must_advance_one_step_at_a_time() -> Result<()> {
    let p = Participants::new();
    let mut ledger = populated_ledger(&p)?;
    let inspector = p.inspector.address();
    let (_, signature) = p.inspector.certify(0, p.manufacturer_a)?;

    ledger.issue_certificate(inspector, p.manufacturer_a, Status::Manufactured, 0, signature.clone())?;
    let err = ledger
        .issue_certificate(inspector, p.manufacturer_a, Status::Stored, 0, signature.clone())
        .unwrap_err();
    assert!(matches!(err, ColdChainError::InvalidStatusTransition { .. }));

    let custody = [
        (Status::DeliveringInternational, p.distributor_global),
        (Status::Stored, p.distributor_global),
        (Status::DeliveringLocal, p.distributor_local),
        (Status::Delivered, p.traveller),
    ];
    for (status, prover) in custody {
        ledger.issue_certificate(p.immunizer.address(), prover, status, 0, signature.clone())?;
    }
    assert_eq!(ledger.current_status(0)?, Some(Status::Delivered));

    let sixth = ledger.issue_certificate(
        p.immunizer.address(),
        p.traveller,
        Status::Delivered,
        0,
        signature,
    );
    assert!(matches!(
        sixth,
        Err(ColdChainError::InvalidStatusTransition { expected: None, .. })
    ));

    let statuses: Vec<Status> = ledger.batch_history(0)?.iter().map(|c| c.status).collect();
    assert_eq!(statuses, Status::SEQUENCE.to_vec());
    assert_eq!(ledger.get_vaccine_batch(0)?.certificate_ids, vec![0, 1, 2, 3, 4]);
    Ok(())
}
