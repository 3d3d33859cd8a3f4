// src/contracts/entity_registry.rs
//! Registry of supply-chain participants.
//!
//! Maps an account address to its fixed role. Entities are only ever added;
//! there is no update or removal.

use crate::error::{ColdChainError, Result};
use crate::models::entity::{Entity, Mode};
use ethers::types::Address;
use std::collections::BTreeMap;

#[derive(Debug, Default, Clone)]
pub struct EntityRegistry {
    /// Entities keyed by address
    entities: BTreeMap<Address, Entity>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `id` with `mode`.
    ///
    /// # Errors
    /// `DuplicateEntity` if the address is already registered, whatever its mode.
    pub fn register(&mut self, id: Address, mode: Mode) -> Result<&Entity> {
        if self.entities.contains_key(&id) {
            return Err(ColdChainError::DuplicateEntity(id));
        }
        Ok(self.entities.entry(id).or_insert(Entity { id, mode }))
    }

    /// # Errors
    /// `EntityNotFound` if the address was never registered.
    pub fn get(&self, id: Address) -> Result<&Entity> {
        self.entities
            .get(&id)
            .ok_or(ColdChainError::EntityNotFound(id))
    }

    pub fn contains(&self, id: Address) -> bool {
        self.entities.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Entities in address order.
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }
}
