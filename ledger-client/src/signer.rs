//! Transaction signing
//!
//! The `Signer` trait keeps credential material out of callers: the
//! orchestration layer hands over a payload and gets back a broadcastable
//! signed transaction, never touching the key itself.

use crate::types::{Address, SignedTransaction, TransactionRequest};
use crate::{Error, Result};
use ed25519_dalek::{Signer as DalekSigner, SigningKey};
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};

/// Signing capability for one ledger account
pub trait Signer: Send + Sync {
    /// Address of the credential's account
    fn address(&self) -> &Address;

    /// Public key bytes (32 bytes, Ed25519)
    fn public_key(&self) -> Vec<u8>;

    /// Sign a transaction payload
    fn sign(&self, payload: &TransactionRequest) -> Result<SignedTransaction>;
}

/// Software Ed25519 signer
pub struct PrivateKeySigner {
    signing_key: SigningKey,
    address: Address,
}

impl PrivateKeySigner {
    /// Create with a random key
    pub fn generate() -> Self {
        let mut seed = [0u8; 32];
        rand::RngCore::fill_bytes(&mut OsRng, &mut seed);
        Self::from_seed(seed)
    }

    /// Create from a 32-byte seed (deterministic, for dev accounts and tests)
    pub fn from_seed(seed: [u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(&seed);
        let address = derive_address(&signing_key.verifying_key().to_bytes());
        Self {
            signing_key,
            address,
        }
    }

    /// Create from a hex-encoded 32-byte seed (configuration form)
    pub fn from_hex(seed_hex: &str) -> Result<Self> {
        let raw = hex::decode(seed_hex.trim().trim_start_matches("0x"))
            .map_err(|e| Error::Signing(format!("bad key hex: {}", e)))?;
        let seed: [u8; 32] = raw
            .try_into()
            .map_err(|_| Error::Signing("key seed must be 32 bytes".to_string()))?;
        Ok(Self::from_seed(seed))
    }
}

impl Signer for PrivateKeySigner {
    fn address(&self) -> &Address {
        &self.address
    }

    fn public_key(&self) -> Vec<u8> {
        self.signing_key.verifying_key().to_bytes().to_vec()
    }

    fn sign(&self, payload: &TransactionRequest) -> Result<SignedTransaction> {
        if payload.from != self.address {
            return Err(Error::Signing(format!(
                "payload sender {} does not match signer account {}",
                payload.from, self.address
            )));
        }
        let signature = self.signing_key.sign(&payload.canonical_bytes());
        Ok(SignedTransaction {
            payload: payload.clone(),
            sender: self.address.clone(),
            public_key: self.public_key(),
            signature: signature.to_bytes().to_vec(),
        })
    }
}

/// Derive a ledger address from an Ed25519 public key
///
/// sha-256 of the key, truncated to 20 bytes.
pub fn derive_address(public_key: &[u8; 32]) -> Address {
    let digest = Sha256::digest(public_key);
    let mut raw = [0u8; 20];
    raw.copy_from_slice(&digest[..20]);
    Address::from_bytes(&raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(signer: &PrivateKeySigner) -> TransactionRequest {
        let to = Address::from_bytes(&[7u8; 20]);
        let mut request =
            TransactionRequest::native_transfer(signer.address().clone(), to, 500);
        request.gas = Some(21_000);
        request.gas_price = Some(0);
        request.nonce = Some(0);
        request
    }

    #[test]
    fn test_sign_verify() {
        let signer = PrivateKeySigner::generate();
        let signed = signer.sign(&payload(&signer)).unwrap();
        assert!(signed.verify());

        // Tampered payload must fail verification
        let mut tampered = signed.clone();
        tampered.payload.value = 501;
        assert!(!tampered.verify());
    }

    #[test]
    fn test_determinism_from_seed() {
        let a = PrivateKeySigner::from_seed([42u8; 32]);
        let b = PrivateKeySigner::from_seed([42u8; 32]);
        assert_eq!(a.address(), b.address());

        let sig_a = a.sign(&payload(&a)).unwrap();
        let sig_b = b.sign(&payload(&b)).unwrap();
        assert_eq!(sig_a.signature, sig_b.signature);
    }

    #[test]
    fn test_from_hex() {
        let seed = [7u8; 32];
        let signer = PrivateKeySigner::from_hex(&hex::encode(seed)).unwrap();
        assert_eq!(signer.address(), PrivateKeySigner::from_seed(seed).address());

        // 0x prefix accepted
        let prefixed = PrivateKeySigner::from_hex(&format!("0x{}", hex::encode(seed))).unwrap();
        assert_eq!(prefixed.address(), signer.address());

        assert!(PrivateKeySigner::from_hex("abcd").is_err());
        assert!(PrivateKeySigner::from_hex("not hex").is_err());
    }

    #[test]
    fn test_sign_rejects_foreign_sender() {
        let signer = PrivateKeySigner::generate();
        let other = PrivateKeySigner::generate();
        let mut request = payload(&signer);
        request.from = other.address().clone();
        assert!(signer.sign(&request).is_err());
    }
}
