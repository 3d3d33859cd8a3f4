// src/wallet/key_management.rs
//! Off-ledger signing client.
//!
//! The ledger never sees private keys. Issuers sign the certification digest
//! here (or in any `eth_sign`-compatible wallet) and submit only the
//! resulting signature.
//!
//! Uses the following cryptographic primitives:
//! - secp256k1 curve (via `k256` crate)
//! - Keccak-256 hashing and EIP-191 envelopes (via `ethers` crate)
//! - Cryptographically secure random number generation

use crate::error::Result;
use crate::utils::crypto::{certification_digest, personal_message_hash};
use ethers::types::{Address, Bytes, H256};
use ethers::utils::secret_key_to_address;
use k256::ecdsa::SigningKey;
use log::debug;

/// Offset `eth_sign` adds to the recovery id in the `v` byte.
const ETH_SIGN_V_OFFSET: u8 = 27;

/// A secp256k1 account able to produce `eth_sign`-compatible signatures.
///
/// # Security Notes
/// - The signing key is never exposed publicly
/// - Signatures use deterministic ECDSA (RFC 6979) with low-S normalisation
#[derive(Clone)]
pub struct KeyManager {
    /// Securely stored private key (never exposed)
    signing_key: SigningKey,
    /// Account address derived from the public key
    address: Address,
}

impl KeyManager {
    /// Generates a KeyManager with a fresh random key.
    pub fn new() -> Self {
        Self::from_signing_key(SigningKey::random(&mut rand::thread_rng()))
    }

    /// Loads a KeyManager from a 32-byte private key.
    ///
    /// # Errors
    /// Fails if the bytes are not a valid non-zero secp256k1 scalar.
    pub fn from_private_key(private_key: &[u8]) -> Result<Self> {
        Ok(Self::from_signing_key(SigningKey::from_slice(private_key)?))
    }

    fn from_signing_key(signing_key: SigningKey) -> Self {
        let address = secret_key_to_address(&signing_key);
        KeyManager {
            signing_key,
            address,
        }
    }

    /// Account address this key signs for.
    pub fn address(&self) -> Address {
        self.address
    }

    /// Signs a 32-byte message digest the way `eth_sign` does.
    ///
    /// # Returns
    /// 65-byte signature `r || s || v` with `v` in `{27, 28}`
    ///
    /// # Process Flow
    /// 1. Wraps the digest in the EIP-191 personal-message envelope
    /// 2. Signs the envelope hash with recoverable ECDSA
    /// 3. Appends the recovery id shifted by 27
    pub fn sign_digest(&self, message_digest: H256) -> Result<Bytes> {
        let prehash = personal_message_hash(message_digest);
        let (signature, recovery_id) = self
            .signing_key
            .sign_prehash_recoverable(prehash.as_bytes())?;

        let mut bytes = signature.to_bytes().to_vec();
        bytes.push(recovery_id.to_byte() + ETH_SIGN_V_OFFSET);
        Ok(Bytes::from(bytes))
    }

    /// Produces the certification signature for a batch, issued by this
    /// account for `prover`.
    ///
    /// # Returns
    /// The digest that was signed (verifiers need it later) and the signature.
    pub fn certify(&self, vaccine_batch_id: u64, prover: Address) -> Result<(H256, Bytes)> {
        let digest = certification_digest(self.address, vaccine_batch_id, prover);
        let signature = self.sign_digest(digest)?;
        debug!(
            "{:?} signed certification of batch #{} for {:?}",
            self.address, vaccine_batch_id, prover
        );
        Ok((digest, signature))
    }
}

impl Default for KeyManager {
    fn default() -> Self {
        Self::new()
    }
}
