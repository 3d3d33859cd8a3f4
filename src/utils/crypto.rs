// src/utils/crypto.rs
//! Cryptographic helpers shared by the ledger and its signing clients.
//!
//! Uses Keccak-256 (Ethereum's standard hash function) for all digests, and
//! the EIP-191 personal-message envelope that `eth_sign` applies before
//! signing.

use ethers::types::{Address, H256};
use ethers::utils::{hash_message, keccak256, to_checksum};

/// Keccak-256 of raw bytes, the digest every certificate message is signed
/// over.
pub fn hash_data(data: &[u8]) -> [u8; 32] {
    keccak256(data)
}

/// Wraps a 32-byte digest in the EIP-191 envelope
/// (`"\x19Ethereum Signed Message:\n32" || digest`) and hashes it.
///
/// This is the value actually signed by `eth_sign` and recovered by
/// `ecrecover`-style verification.
pub fn personal_message_hash(message_digest: H256) -> H256 {
    hash_message(message_digest)
}

/// Builds the canonical certification message an inspector signs.
///
/// Addresses are rendered as EIP-55 checksummed hex, which is how wallets
/// present accounts.
///
/// # Example
/// ```
/// use cold_chain::utils::crypto::certification_message;
/// use ethers::types::Address;
///
/// let message = certification_message(Address::zero(), 0, Address::zero());
/// assert!(message.starts_with("Inspector (0x0000000000000000000000000000000000000000)"));
/// ```
pub fn certification_message(issuer: Address, vaccine_batch_id: u64, prover: Address) -> String {
    format!(
        "Inspector ({}) has certified vaccine batch #{} for manufacturer ({}).",
        to_checksum(&issuer, None),
        vaccine_batch_id,
        to_checksum(&prover, None),
    )
}

/// Keccak-256 digest of [`certification_message`].
///
/// Verifiers must recompute this exact digest; the ledger never rebuilds the
/// message itself.
pub fn certification_digest(issuer: Address, vaccine_batch_id: u64, prover: Address) -> H256 {
    H256::from(hash_data(
        certification_message(issuer, vaccine_batch_id, prover).as_bytes(),
    ))
}
