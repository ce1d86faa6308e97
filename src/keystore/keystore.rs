//! On-disk key store
//!
//! Each key pair lives in its own JSON file named after the fingerprint of
//! its public key.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::crypto::{sha256_hex, KeyError, KeyPair, KeyType, PublicKey};

/// Hex characters of the public key digest used as a file name
const FINGERPRINT_LENGTH: usize = 32;

/// Key store errors
#[derive(Error, Debug)]
pub enum KeyStoreError {
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("Crypto error: {0}")]
    CryptoError(#[from] KeyError),
    #[error("No key matches {0}")]
    NotFound(String),
}

/// Key store configuration
#[derive(Debug, Clone)]
pub struct KeyStoreConfig {
    pub keys_dir: PathBuf,
    pub default_key_type: KeyType,
}

impl Default for KeyStoreConfig {
    fn default() -> Self {
        Self {
            keys_dir: PathBuf::from(".conditions_data").join("keys"),
            default_key_type: KeyType::Ed25519,
        }
    }
}

impl KeyStoreConfig {
    /// Keys under `data_dir/keys`
    pub fn in_data_dir(data_dir: &Path) -> Self {
        Self {
            keys_dir: data_dir.join("keys"),
            ..Self::default()
        }
    }
}

/// Serializable key data for persistence
#[derive(Debug, Serialize, Deserialize)]
struct KeyData {
    key_type: KeyType,
    public_key: String,
    private_key: String,
    label: Option<String>,
}

/// A key pair with an optional label
#[derive(Debug, Clone)]
pub struct StoredKey {
    key_pair: KeyPair,
    pub label: Option<String>,
}

impl StoredKey {
    pub fn new(key_pair: KeyPair, label: Option<&str>) -> Self {
        Self {
            key_pair,
            label: label.map(str::to_string),
        }
    }

    pub fn key_pair(&self) -> &KeyPair {
        &self.key_pair
    }

    pub fn public_key(&self) -> PublicKey {
        self.key_pair.public_key()
    }

    /// File-name fingerprint of the public key
    pub fn fingerprint(&self) -> String {
        fingerprint(&self.public_key())
    }

    /// Save to file
    pub fn save(&self, path: &Path) -> Result<(), KeyStoreError> {
        let data = KeyData {
            key_type: self.key_pair.key_type(),
            public_key: self.public_key().to_base58(),
            private_key: self.key_pair.private_key_string()?,
            label: self.label.clone(),
        };
        let json = serde_json::to_string_pretty(&data)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Load from file
    pub fn load(path: &Path) -> Result<Self, KeyStoreError> {
        let json = fs::read_to_string(path)?;
        let data: KeyData = serde_json::from_str(&json)?;

        let key_pair = KeyPair::from_private_key_string(&data.private_key)?;
        if key_pair.key_type() != data.key_type || key_pair.public_key().to_base58() != data.public_key {
            return Err(KeyError::InvalidPrivateKey.into());
        }
        Ok(Self {
            key_pair,
            label: data.label,
        })
    }

    /// Public information (safe to share)
    pub fn info(&self) -> KeyInfo {
        KeyInfo {
            key_type: self.key_pair.key_type(),
            public_key: self.public_key().to_base58(),
            label: self.label.clone(),
        }
    }
}

/// Public key information (safe to share)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyInfo {
    pub key_type: KeyType,
    pub public_key: String,
    pub label: Option<String>,
}

fn fingerprint(public_key: &PublicKey) -> String {
    let mut digest = sha256_hex(&public_key.to_bytes());
    digest.truncate(FINGERPRINT_LENGTH);
    digest
}

/// Directory of stored key pairs
pub struct KeyStore {
    config: KeyStoreConfig,
}

impl KeyStore {
    /// Open (creating if needed) the key directory
    pub fn new(config: KeyStoreConfig) -> Result<Self, KeyStoreError> {
        fs::create_dir_all(&config.keys_dir)?;
        Ok(Self { config })
    }

    pub fn with_defaults() -> Result<Self, KeyStoreError> {
        Self::new(KeyStoreConfig::default())
    }

    pub fn config(&self) -> &KeyStoreConfig {
        &self.config
    }

    fn key_path(&self, fingerprint: &str) -> PathBuf {
        self.config.keys_dir.join(format!("{}.json", fingerprint))
    }

    /// Generate and save a key of the configured default type
    pub fn create_key(&self, label: Option<&str>) -> Result<StoredKey, KeyStoreError> {
        self.create_key_of_type(self.config.default_key_type, label)
    }

    pub fn create_key_of_type(
        &self,
        key_type: KeyType,
        label: Option<&str>,
    ) -> Result<StoredKey, KeyStoreError> {
        let key = StoredKey::new(KeyPair::generate(key_type)?, label);
        self.save_key(&key)?;
        Ok(key)
    }

    pub fn save_key(&self, key: &StoredKey) -> Result<(), KeyStoreError> {
        let path = self.key_path(&key.fingerprint());
        key.save(&path)?;
        debug!("saved {} key to {}", key.key_pair.key_type(), path.display());
        Ok(())
    }

    /// Every stored key; unreadable files are skipped
    pub fn list_keys(&self) -> Result<Vec<StoredKey>, KeyStoreError> {
        let mut keys = Vec::new();

        for entry in fs::read_dir(&self.config.keys_dir)? {
            let path = entry?.path();
            if path.extension().map(|e| e == "json").unwrap_or(false) {
                match StoredKey::load(&path) {
                    Ok(key) => keys.push(key),
                    Err(e) => debug!("skipping {}: {}", path.display(), e),
                }
            }
        }

        keys.sort_by(|a, b| a.label.cmp(&b.label).then_with(|| a.fingerprint().cmp(&b.fingerprint())));
        Ok(keys)
    }

    /// Load the key for `public_key`
    pub fn load_key(&self, public_key: &PublicKey) -> Result<StoredKey, KeyStoreError> {
        let path = self.key_path(&fingerprint(public_key));
        if !path.exists() {
            return Err(KeyStoreError::NotFound(public_key.to_base58()));
        }
        StoredKey::load(&path)
    }

    /// Find a key by label or base58 public key
    pub fn find_key(&self, name: &str) -> Result<StoredKey, KeyStoreError> {
        if let Ok(public_key) = PublicKey::from_base58(name) {
            if let Ok(key) = self.load_key(&public_key) {
                return Ok(key);
            }
        }
        self.list_keys()?
            .into_iter()
            .find(|key| key.label.as_deref() == Some(name))
            .ok_or_else(|| KeyStoreError::NotFound(name.to_string()))
    }

    pub fn delete_key(&self, public_key: &PublicKey) -> Result<(), KeyStoreError> {
        fs::remove_file(self.key_path(&fingerprint(public_key)))?;
        Ok(())
    }
}
