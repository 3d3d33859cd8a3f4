// src/wallet/mod.rs
//! Client-side signing for certificate issuers.

pub mod key_management;
