// src/models/vaccine_batch.rs
//! Vaccine batch data model.

use ethers::types::Address;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A tracked unit of vaccine doses and its custody trail.
///
/// `certificate_ids` starts empty and only ever grows by appending ids of
/// certificates issued against this batch, oldest first.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct VaccineBatch {
    /// Sequential id assigned at creation, starting at 0
    pub id: u64,

    /// Free-form brand label, see [`VaccineBrand`] for the recognised ones
    pub brand: String,

    /// Registered entity that manufactured the batch
    pub manufacturer: Address,

    /// Certificates issued for this batch in issuance order
    pub certificate_ids: Vec<u64>,
}

/// Brands the supply chain currently handles.
///
/// The ledger stores brands as text; this list only helps clients use the
/// canonical labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VaccineBrand {
    Pfizer,
    Moderna,
    Janssen,
    Sputnik,
}

impl VaccineBrand {
    pub const ALL: [VaccineBrand; 4] = [
        VaccineBrand::Pfizer,
        VaccineBrand::Moderna,
        VaccineBrand::Janssen,
        VaccineBrand::Sputnik,
    ];

    pub fn label(self) -> &'static str {
        match self {
            VaccineBrand::Pfizer => "Pfizer-BioNTech",
            VaccineBrand::Moderna => "Moderna",
            VaccineBrand::Janssen => "Johnson & Johnson's Janssen",
            VaccineBrand::Sputnik => "Sputnik V",
        }
    }

    /// Looks up a recognised brand by its exact label.
    pub fn from_label(label: &str) -> Option<Self> {
        VaccineBrand::ALL.into_iter().find(|brand| brand.label() == label)
    }
}

impl fmt::Display for VaccineBrand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl VaccineBatch {
    /// The recognised brand of this batch, if its label is one.
    pub fn known_brand(&self) -> Option<VaccineBrand> {
        VaccineBrand::from_label(&self.brand)
    }
}
