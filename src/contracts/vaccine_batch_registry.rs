// src/contracts/vaccine_batch_registry.rs
//! Registry of vaccine batches.
//!
//! Batches get sequential ids from 0. Their certificate lists are appended to
//! by the ledger only, after a certificate for that batch is stored.

use crate::contracts::entity_registry::EntityRegistry;
use crate::error::{ColdChainError, Result};
use crate::models::vaccine_batch::VaccineBatch;
use ethers::types::Address;

#[derive(Debug, Default, Clone)]
pub struct VaccineBatchRegistry {
    /// Batches indexed by id
    batches: Vec<VaccineBatch>,
}

impl VaccineBatchRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a batch manufactured by a registered entity.
    ///
    /// # Returns
    /// The new batch id
    ///
    /// # Errors
    /// `EntityNotFound` if `manufacturer` is not in `entities`.
    pub fn add(
        &mut self,
        entities: &EntityRegistry,
        brand: impl Into<String>,
        manufacturer: Address,
    ) -> Result<u64> {
        entities.get(manufacturer)?;

        let id = self.batches.len() as u64;
        self.batches.push(VaccineBatch {
            id,
            brand: brand.into(),
            manufacturer,
            certificate_ids: Vec::new(),
        });
        Ok(id)
    }

    /// # Errors
    /// `BatchNotFound` if no batch has this id.
    pub fn get(&self, id: u64) -> Result<&VaccineBatch> {
        usize::try_from(id)
            .ok()
            .and_then(|index| self.batches.get(index))
            .ok_or(ColdChainError::BatchNotFound(id))
    }

    /// Records `certificate_id` as the newest entry of the batch's history.
    pub(crate) fn append_certificate(&mut self, id: u64, certificate_id: u64) -> Result<()> {
        let batch = usize::try_from(id)
            .ok()
            .and_then(|index| self.batches.get_mut(index))
            .ok_or(ColdChainError::BatchNotFound(id))?;
        batch.certificate_ids.push(certificate_id);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.batches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &VaccineBatch> {
        self.batches.iter()
    }

    pub(crate) fn from_batches(batches: Vec<VaccineBatch>) -> Self {
        VaccineBatchRegistry { batches }
    }
}
