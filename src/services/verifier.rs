// src/services/verifier.rs
//! Signature verification for custody certificates.
//!
//! Recovers the account that produced a certificate signature, using the
//! same scheme as the host ledger's `ecrecover` primitive: secp256k1 ECDSA
//! over the EIP-191 envelope of a 32-byte message digest.

use crate::models::certificate::Certificate;
use crate::utils::crypto::personal_message_hash;
use ethers::types::{Address, Signature, H256};
use log::debug;

/// Recovers the signer of `signature` over `message_digest`.
///
/// # Arguments
/// * `message_digest` - Keccak-256 digest of the signed message (before the
///   EIP-191 envelope is applied)
/// * `signature` - 65-byte `r || s || v` signature, `v` in `{0, 1, 27, 28}`
///
/// # Returns
/// - `Some(address)` of the recovered signer
/// - `None` if the signature is malformed or no key can be recovered
///
/// A `None` is an ordinary verification outcome, not an error: any digest
/// or signature a caller supplies is either consistent or it is not.
pub fn recover_signer(message_digest: H256, signature: &[u8]) -> Option<Address> {
    let raw = match normalize(signature) {
        Some(raw) => raw,
        None => {
            debug!(
                "malformed signature ({} bytes, v = {:?})",
                signature.len(),
                signature.get(64)
            );
            return None;
        }
    };
    let signature = match Signature::try_from(&raw[..]) {
        Ok(signature) => signature,
        Err(e) => {
            debug!("malformed signature ({} bytes): {}", signature.len(), e);
            return None;
        }
    };

    match signature.recover(personal_message_hash(message_digest)) {
        Ok(signer) => Some(signer),
        Err(e) => {
            debug!("signer recovery failed: {}", e);
            None
        }
    }
}

/// Copies a 65-byte `r || s || v` signature with `v` rewritten to 27/28.
///
/// Only the `v` values `ecrecover` accepts pass. EIP-155 style values are
/// refused even though `Signature::recover` would take them.
fn normalize(signature: &[u8]) -> Option<[u8; 65]> {
    let mut raw: [u8; 65] = signature.try_into().ok()?;
    raw[64] = match raw[64] {
        0 | 27 => 27,
        1 | 28 => 28,
        _ => return None,
    };
    Some(raw)
}

/// Checks a certificate's stored signature against a digest and the issuer a
/// caller claims produced it.
///
/// True only when the recovered signer is both the claimed issuer and the
/// issuer the ledger recorded on the certificate.
pub fn is_matching_signature(
    certificate: &Certificate,
    message_digest: H256,
    claimed_issuer: Address,
) -> bool {
    match recover_signer(message_digest, &certificate.signature) {
        Some(signer) => signer == claimed_issuer && signer == certificate.issuer,
        None => false,
    }
}
