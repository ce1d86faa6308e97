//! Ledger Conditions: crypto-conditions for locking and unlocking ledger outputs
//!
//! This crate provides:
//! - A self-describing binary and URI codec for conditions and fulfillments
//! - Preimage, prefix, Ed25519, RSA-PSS, timeout and weighted threshold
//!   fulfillments with deterministic condition hashes
//! - Minimal-payload selection for threshold fulfillments
//! - Transaction documents whose inputs carry fulfillments, with signing,
//!   attaching and verification
//! - A file-based key store
//!
//! # Example
//!
//! ```rust
//! use ledger_conditions::crypto::KeyPair;
//! use ledger_conditions::transaction::Transaction;
//! use serde_json::json;
//!
//! // Lock a new asset to a fresh key
//! let owner = KeyPair::generate_ed25519();
//! let mut tx = Transaction::create(&[owner.public_key()], 1, json!({"name": "song"}), None).unwrap();
//! assert!(!tx.is_fulfilled());
//!
//! // Sign the canonical bytes and attach the fulfillment
//! tx.fulfill_single(&owner).unwrap();
//! assert!(tx.is_fulfilled());
//! println!("{}", tx.inputs[0].fulfillment.as_deref().unwrap());
//! ```

pub mod cli;
pub mod codec;
pub mod condition;
pub mod crypto;
pub mod fulfillment;
pub mod keystore;
pub mod transaction;

// Re-export commonly used types
pub use condition::{Bitmask, Condition, ConditionError, TypeId};
pub use crypto::{KeyPair, KeyType, PublicKey};
pub use fulfillment::{
    Ed25519, Fulfillment, PreImage, Prefix, Rsa, Threshold, Timeout, MAX_PAYLOAD_SIZE,
    MAX_SUBFULFILLMENTS,
};
pub use keystore::{KeyStore, KeyStoreConfig};
pub use transaction::{
    ConditionDetails, ConditionDocument, Input, Output, Transaction, TransactionBuilder,
    TransactionError,
};
