//! secp256k1 keypairs for signing tokens.

use std::fmt;
use std::path::Path;

use k256::ecdsa::SigningKey;
use rand::RngCore;

use crate::errors::{Error, Result};
use crate::eth::{keccak256, Address};
use crate::sign::{Sig, SigCode};

/// A secp256k1 keypair used to sign tokens.
#[derive(Clone)]
pub struct KeyPair {
    inner: SigningKey,
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}

impl KeyPair {
    /// Generate a new random keypair.
    pub fn generate() -> Result<Self> {
        let mut rng = rand::rng();
        let mut bytes = [0u8; 32];
        // A random scalar is out of range with negligible probability; retry then.
        loop {
            rng.fill_bytes(&mut bytes);
            if let Ok(inner) = SigningKey::from_slice(&bytes) {
                return Ok(Self { inner });
            }
        }
    }

    /// Create a keypair from an existing signing key.
    pub fn from_signing_key(inner: SigningKey) -> Self {
        Self { inner }
    }

    /// Load a keypair from private key bytes.
    pub fn from_private_key_bytes(bytes: &[u8]) -> Result<Self> {
        let inner = SigningKey::from_slice(bytes)
            .map_err(|e| Error::invalid("keys.from_bytes", "invalid private key").cause(e))?;
        Ok(Self { inner })
    }

    /// Load a keypair from a hex-encoded private key string (optionally `0x` prefixed).
    pub fn from_private_key_hex(s: &str) -> Result<Self> {
        let digits = s.trim().trim_start_matches("0x");
        let bytes = hex::decode(digits)
            .map_err(|e| Error::invalid("keys.from_hex", "invalid private key hex").cause(e))?;
        Self::from_private_key_bytes(&bytes)
    }

    /// Get the inner signing key.
    pub fn signing_key(&self) -> &SigningKey {
        &self.inner
    }

    /// Address derived from the public key.
    pub fn address(&self) -> Address {
        Address::from_verifying_key(self.inner.verifying_key())
    }

    /// Get the private key as hex string.
    pub fn private_key_hex(&self) -> String {
        hex::encode(self.inner.to_bytes())
    }

    /// Sign a 32-byte hash and return a signature of the given code.
    pub fn sign_hash(&self, hash: &[u8; 32], code: SigCode) -> Result<Sig> {
        let (signature, recovery_id) = self.inner.sign_prehash_recoverable(hash).map_err(|e| {
            Error::other("keys.sign", "signing failed")
                .with("sig_type", code)
                .cause(e)
        })?;
        let mut bytes = Vec::with_capacity(crate::sign::SIG_LEN);
        bytes.extend_from_slice(&signature.to_bytes());
        bytes.push(recovery_id.to_byte());
        Ok(Sig::new(code, &bytes))
    }

    /// Sign the Keccak-256 hash of `data`.
    pub fn sign_keccak(&self, data: &[u8]) -> Result<Sig> {
        self.sign_hash(&keccak256(data), SigCode::ES256K)
    }

    /// Save the private key (hex) and address to files.
    pub fn save_to_files(&self, private_key_path: &Path, address_path: &Path) -> Result<()> {
        std::fs::write(private_key_path, self.private_key_hex())
            .map_err(|e| Error::other("keys.save", "failed to write private key").cause(e))?;
        std::fs::write(address_path, self.address().to_string())
            .map_err(|e| Error::other("keys.save", "failed to write address").cause(e))?;
        Ok(())
    }

    /// Load a keypair from a private key file.
    pub fn load_from_file(private_key_path: &Path) -> Result<Self> {
        let hex = std::fs::read_to_string(private_key_path).map_err(|e| {
            Error::other("keys.load", "failed to read private key")
                .with("path", private_key_path.display())
                .cause(e)
        })?;
        Self::from_private_key_hex(hex.trim())
    }
}
