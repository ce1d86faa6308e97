//! Key management for condition signatures
//!
//! Provides Ed25519 and RSA-PSS (SHA-256) key pairs, the public key text
//! form used in transaction documents, and the signing/verification
//! primitives the fulfillment variants build on.

use std::fmt;
use std::str::FromStr;

use ed25519_dalek::{Signature as Ed25519Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use rsa::pkcs8::{DecodePrivateKey, EncodePrivateKey};
use rsa::traits::PublicKeyParts;
use rsa::{BigUint, Pss, RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

use super::hash::sha256;

/// Length of an Ed25519 public key
pub const ED25519_PUBLIC_KEY_LENGTH: usize = 32;

/// Length of an Ed25519 signature
pub const ED25519_SIGNATURE_LENGTH: usize = 64;

/// Smallest accepted RSA modulus (1024 bits)
pub const RSA_MIN_MODULUS_LENGTH: usize = 128;

/// Largest accepted RSA modulus (4096 bits)
pub const RSA_MAX_MODULUS_LENGTH: usize = 512;

/// Public exponent shared by every RSA condition key
pub const RSA_PUBLIC_EXPONENT: u32 = 65537;

/// Errors that can occur during key operations
#[derive(Error, Debug)]
pub enum KeyError {
    #[error("Invalid private key")]
    InvalidPrivateKey,
    #[error("Invalid public key")]
    InvalidPublicKey,
    #[error("Unsupported key type: no scheme uses {0}-byte keys")]
    UnsupportedKeyType(usize),
    #[error("RSA error: {0}")]
    Rsa(#[from] rsa::Error),
}

/// Signature scheme of a key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyType {
    Ed25519,
    Rsa,
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyType::Ed25519 => write!(f, "ed25519"),
            KeyType::Rsa => write!(f, "rsa"),
        }
    }
}

impl FromStr for KeyType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ed25519" => Ok(KeyType::Ed25519),
            "rsa" => Ok(KeyType::Rsa),
            other => Err(format!("unknown key type '{}' (expected ed25519 or rsa)", other)),
        }
    }
}

/// A public key able to verify condition signatures
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublicKey {
    Ed25519(VerifyingKey),
    Rsa(RsaPublicKey),
}

impl PublicKey {
    /// Parse raw key bytes, dispatching on their length
    ///
    /// 32 bytes is an Ed25519 key; 128 to 512 bytes is an RSA modulus
    /// with the fixed public exponent.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        match bytes.len() {
            ED25519_PUBLIC_KEY_LENGTH => {
                let mut raw = [0u8; ED25519_PUBLIC_KEY_LENGTH];
                raw.copy_from_slice(bytes);
                let key =
                    VerifyingKey::from_bytes(&raw).map_err(|_| KeyError::InvalidPublicKey)?;
                Ok(PublicKey::Ed25519(key))
            }
            RSA_MIN_MODULUS_LENGTH..=RSA_MAX_MODULUS_LENGTH => {
                Ok(PublicKey::Rsa(rsa_public_key_from_modulus(bytes)?))
            }
            other => Err(KeyError::UnsupportedKeyType(other)),
        }
    }

    /// Raw key bytes (Ed25519 point, or big-endian RSA modulus)
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            PublicKey::Ed25519(key) => key.to_bytes().to_vec(),
            PublicKey::Rsa(key) => key.n().to_bytes_be(),
        }
    }

    /// Base58 text form used in transaction documents
    pub fn to_base58(&self) -> String {
        bs58::encode(self.to_bytes()).into_string()
    }

    /// Parse the base58 text form
    pub fn from_base58(encoded: &str) -> Result<Self, KeyError> {
        let bytes = bs58::decode(encoded)
            .into_vec()
            .map_err(|_| KeyError::InvalidPublicKey)?;
        Self::from_bytes(&bytes)
    }

    /// Which scheme this key belongs to
    pub fn key_type(&self) -> KeyType {
        match self {
            PublicKey::Ed25519(_) => KeyType::Ed25519,
            PublicKey::Rsa(_) => KeyType::Rsa,
        }
    }

    /// Verify a signature over `message`
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> bool {
        match self {
            PublicKey::Ed25519(key) => verify_ed25519(key, message, signature),
            PublicKey::Rsa(key) => verify_rsa(key, message, signature),
        }
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_base58())
    }
}

impl FromStr for PublicKey {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_base58(s)
    }
}

/// A signing key pair
#[derive(Clone)]
pub enum KeyPair {
    Ed25519(SigningKey),
    Rsa(RsaPrivateKey),
}

impl KeyPair {
    /// Generate a new random Ed25519 key pair
    pub fn generate_ed25519() -> Self {
        KeyPair::Ed25519(SigningKey::generate(&mut OsRng))
    }

    /// Generate a new random RSA key pair with a modulus of `bits` bits
    pub fn generate_rsa(bits: usize) -> Result<Self, KeyError> {
        if bits % 8 != 0
            || !(RSA_MIN_MODULUS_LENGTH * 8..=RSA_MAX_MODULUS_LENGTH * 8).contains(&bits)
        {
            return Err(KeyError::UnsupportedKeyType(bits / 8));
        }
        let key = RsaPrivateKey::new_with_exp(
            &mut OsRng,
            bits,
            &BigUint::from(RSA_PUBLIC_EXPONENT),
        )?;
        Ok(KeyPair::Rsa(key))
    }

    /// Generate a key pair of the given type with default parameters
    pub fn generate(key_type: KeyType) -> Result<Self, KeyError> {
        match key_type {
            KeyType::Ed25519 => Ok(Self::generate_ed25519()),
            KeyType::Rsa => Self::generate_rsa(2048),
        }
    }

    /// Which scheme this key pair belongs to
    pub fn key_type(&self) -> KeyType {
        match self {
            KeyPair::Ed25519(_) => KeyType::Ed25519,
            KeyPair::Rsa(_) => KeyType::Rsa,
        }
    }

    /// The public half of the pair
    pub fn public_key(&self) -> PublicKey {
        match self {
            KeyPair::Ed25519(key) => PublicKey::Ed25519(key.verifying_key()),
            KeyPair::Rsa(key) => PublicKey::Rsa(key.to_public_key()),
        }
    }

    /// Sign `message`
    ///
    /// RSA signatures are PSS over the SHA-256 digest of the message and
    /// always have the modulus length.
    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>, KeyError> {
        match self {
            KeyPair::Ed25519(key) => Ok(key.sign(message).to_bytes().to_vec()),
            KeyPair::Rsa(key) => {
                let digest = sha256(message);
                Ok(key.sign_with_rng(&mut OsRng, Pss::new::<Sha256>(), &digest)?)
            }
        }
    }

    /// Text form of the private key
    ///
    /// Ed25519 seeds are base58; RSA keys are hex PKCS#8 DER.
    /// WARNING: Keep this secret!
    pub fn private_key_string(&self) -> Result<String, KeyError> {
        match self {
            KeyPair::Ed25519(key) => Ok(bs58::encode(key.to_bytes()).into_string()),
            KeyPair::Rsa(key) => {
                let der = key
                    .to_pkcs8_der()
                    .map_err(|_| KeyError::InvalidPrivateKey)?;
                Ok(hex::encode(der.as_bytes()))
            }
        }
    }

    /// Parse a private key produced by [`KeyPair::private_key_string`]
    pub fn from_private_key_string(encoded: &str) -> Result<Self, KeyError> {
        if let Ok(seed) = bs58::decode(encoded).into_vec() {
            if seed.len() == ed25519_dalek::SECRET_KEY_LENGTH {
                let mut raw = [0u8; ed25519_dalek::SECRET_KEY_LENGTH];
                raw.copy_from_slice(&seed);
                return Ok(KeyPair::Ed25519(SigningKey::from_bytes(&raw)));
            }
        }

        let der = hex::decode(encoded).map_err(|_| KeyError::InvalidPrivateKey)?;
        let key = RsaPrivateKey::from_pkcs8_der(&der).map_err(|_| KeyError::InvalidPrivateKey)?;
        let modulus_length = key.size();
        if !(RSA_MIN_MODULUS_LENGTH..=RSA_MAX_MODULUS_LENGTH).contains(&modulus_length) {
            return Err(KeyError::UnsupportedKeyType(modulus_length));
        }
        Ok(KeyPair::Rsa(key))
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("type", &self.key_type())
            .field("public_key", &self.public_key().to_base58())
            .finish()
    }
}

/// Build an RSA public key from a big-endian modulus
pub fn rsa_public_key_from_modulus(modulus: &[u8]) -> Result<RsaPublicKey, KeyError> {
    // The modulus length is the signature length, so it must be minimal
    if modulus.first().map_or(true, |b| *b == 0) {
        return Err(KeyError::InvalidPublicKey);
    }
    let key = RsaPublicKey::new(
        BigUint::from_bytes_be(modulus),
        BigUint::from(RSA_PUBLIC_EXPONENT),
    )?;
    Ok(key)
}

/// Verify an Ed25519 signature
pub fn verify_ed25519(key: &VerifyingKey, message: &[u8], signature: &[u8]) -> bool {
    match Ed25519Signature::from_slice(signature) {
        Ok(sig) => key.verify(message, &sig).is_ok(),
        Err(_) => false,
    }
}

/// Verify an RSA-PSS (SHA-256) signature
pub fn verify_rsa(key: &RsaPublicKey, message: &[u8], signature: &[u8]) -> bool {
    if signature.len() != key.size() {
        return false;
    }
    let digest = sha256(message);
    key.verify(Pss::new::<Sha256>(), &digest, signature).is_ok()
}
