//! Persistent storage for signing keys

pub mod keystore;

pub use keystore::{KeyInfo, KeyStore, KeyStoreConfig, KeyStoreError, StoredKey};
