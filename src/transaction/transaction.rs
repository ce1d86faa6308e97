//! Transaction documents locked and unlocked by conditions
//!
//! A transaction moves an asset between owners. Each output is locked with
//! a condition derived from its owners' public keys; each input points at
//! a previous output and carries the fulfillment URI that unlocks it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::condition::ConditionError;
use crate::crypto::{sha256_hex, KeyError, PublicKey};

use super::details::{owners_fulfillment, ConditionDocument};

// =============================================================================
// Constants
// =============================================================================

/// Current transaction document version
pub const TX_VERSION: &str = "2.0";

// =============================================================================
// Error Types
// =============================================================================

/// Transaction-related errors
#[derive(Error, Debug)]
pub enum TransactionError {
    #[error("Condition error: {0}")]
    Condition(#[from] ConditionError),
    #[error("Key error: {0}")]
    Key(#[from] KeyError),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Count mismatch: expected {expected}, got {actual}")]
    CountMismatch { expected: usize, actual: usize },
    #[error("Transaction has no inputs")]
    NoInputs,
    #[error("Input {0} does not exist")]
    InputOutOfRange(usize),
}

// =============================================================================
// Transaction Input
// =============================================================================

/// Reference to an output of an earlier transaction
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OutputLink {
    pub transaction_id: String,
    pub output_index: u32,
}

/// Transaction input
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Input {
    /// Base58 public keys that must jointly sign
    pub owners_before: Vec<String>,
    /// Output being spent; `None` for CREATE
    pub fulfills: Option<OutputLink>,
    /// Fulfillment URI, absent until signed
    pub fulfillment: Option<String>,
}

impl Input {
    pub fn new(owners_before: &[PublicKey], fulfills: Option<OutputLink>) -> Self {
        Self {
            owners_before: owners_before.iter().map(PublicKey::to_base58).collect(),
            fulfills,
            fulfillment: None,
        }
    }

    /// Parse `owners_before` back into keys
    pub fn owners(&self) -> Result<Vec<PublicKey>, KeyError> {
        self.owners_before
            .iter()
            .map(|key| PublicKey::from_base58(key))
            .collect()
    }
}

// =============================================================================
// Transaction Output
// =============================================================================

/// Transaction output
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Output {
    pub amount: u64,
    pub condition: ConditionDocument,
    pub public_keys: Vec<String>,
}

impl Output {
    /// Lock `amount` to all of `owners`
    pub fn new(amount: u64, owners: &[PublicKey]) -> Result<Self, TransactionError> {
        let fulfillment = owners_fulfillment(owners)?;
        Ok(Self {
            amount,
            condition: ConditionDocument::from_fulfillment(&fulfillment),
            public_keys: owners.iter().map(PublicKey::to_base58).collect(),
        })
    }
}

// =============================================================================
// Transaction
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Operation {
    Create,
    Transfer,
}

/// A ledger transaction
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transaction {
    /// Hex SHA-256 of the unsigned document
    pub id: String,
    pub version: String,
    pub operation: Operation,
    /// Asset data for CREATE, or `{"id": ...}` for TRANSFER
    pub asset: Value,
    #[serde(default)]
    pub metadata: Option<Value>,
    pub inputs: Vec<Input>,
    pub outputs: Vec<Output>,
    pub timestamp: DateTime<Utc>,
}

impl Transaction {
    /// CREATE `amount` of `asset` owned by `owners`
    pub fn create(
        owners: &[PublicKey],
        amount: u64,
        asset: Value,
        metadata: Option<Value>,
    ) -> Result<Self, TransactionError> {
        let mut builder = TransactionBuilder::create(asset)
            .add_input(Input::new(owners, None))
            .add_output(Output::new(amount, owners)?);
        if let Some(metadata) = metadata {
            builder = builder.metadata(metadata);
        }
        builder.build()
    }

    /// Canonical signing bytes: the document with every fulfillment nulled
    pub fn signing_bytes(&self) -> Result<Vec<u8>, TransactionError> {
        let mut unsigned = self.clone();
        for input in &mut unsigned.inputs {
            input.fulfillment = None;
        }
        Ok(serde_json::to_vec(&unsigned)?)
    }

    /// Calculate the transaction id (fulfillments and the id itself excluded)
    pub fn calculate_id(&self) -> Result<String, TransactionError> {
        let mut unsigned = self.clone();
        unsigned.id = String::new();
        for input in &mut unsigned.inputs {
            input.fulfillment = None;
        }
        Ok(sha256_hex(&serde_json::to_vec(&unsigned)?))
    }

    /// Whether `id` matches the document contents
    pub fn has_valid_id(&self) -> bool {
        matches!(self.calculate_id(), Ok(id) if id == self.id)
    }

    pub fn total_output(&self) -> u64 {
        self.outputs.iter().map(|o| o.amount).sum()
    }

    pub fn to_json(&self) -> Result<String, TransactionError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, TransactionError> {
        Ok(serde_json::from_str(json)?)
    }
}

// =============================================================================
// Transaction Builder
// =============================================================================

/// Builder for transaction documents
pub struct TransactionBuilder {
    operation: Operation,
    asset: Value,
    metadata: Option<Value>,
    inputs: Vec<Input>,
    outputs: Vec<Output>,
}

impl TransactionBuilder {
    pub fn new(operation: Operation, asset: Value) -> Self {
        Self {
            operation,
            asset,
            metadata: None,
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    /// Start a CREATE carrying `asset`
    pub fn create(asset: Value) -> Self {
        Self::new(Operation::Create, asset)
    }

    /// Start a TRANSFER of the asset created by `asset_id`
    pub fn transfer(asset_id: &str) -> Self {
        Self::new(Operation::Transfer, serde_json::json!({ "id": asset_id }))
    }

    pub fn metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn add_input(mut self, input: Input) -> Self {
        self.inputs.push(input);
        self
    }

    /// Spend output `output_index` of `previous`, owned by `owners`
    pub fn spend(self, previous: &Transaction, output_index: u32, owners: &[PublicKey]) -> Self {
        self.add_input(Input::new(
            owners,
            Some(OutputLink {
                transaction_id: previous.id.clone(),
                output_index,
            }),
        ))
    }

    pub fn add_output(mut self, output: Output) -> Self {
        self.outputs.push(output);
        self
    }

    /// Build the unsigned transaction and fix its id
    pub fn build(self) -> Result<Transaction, TransactionError> {
        if self.inputs.is_empty() {
            return Err(TransactionError::NoInputs);
        }
        let mut tx = Transaction {
            id: String::new(),
            version: TX_VERSION.to_string(),
            operation: self.operation,
            asset: self.asset,
            metadata: self.metadata,
            inputs: self.inputs,
            outputs: self.outputs,
            timestamp: Utc::now(),
        };
        tx.id = tx.calculate_id()?;
        Ok(tx)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyPair;
    use serde_json::json;

    #[test]
    fn test_create_transaction() {
        let kp = KeyPair::generate_ed25519();
        let tx = Transaction::create(&[kp.public_key()], 10, json!({"name": "song"}), None).unwrap();

        assert_eq!(tx.operation, Operation::Create);
        assert_eq!(tx.version, TX_VERSION);
        assert_eq!(tx.total_output(), 10);
        assert_eq!(tx.inputs[0].owners_before, vec![kp.public_key().to_base58()]);
        assert!(tx.inputs[0].fulfills.is_none());
        assert!(tx.has_valid_id());
    }

    #[test]
    fn test_id_ignores_fulfillments() {
        let kp = KeyPair::generate_ed25519();
        let mut tx = Transaction::create(&[kp.public_key()], 1, json!({}), None).unwrap();
        let id = tx.id.clone();
        let unsigned = tx.signing_bytes().unwrap();

        tx.inputs[0].fulfillment = Some("cf:0:AA".to_string());
        assert_eq!(tx.calculate_id().unwrap(), id);
        assert_eq!(tx.signing_bytes().unwrap(), unsigned);

        tx.asset = json!({"name": "changed"});
        assert!(!tx.has_valid_id());
        assert_ne!(tx.signing_bytes().unwrap(), unsigned);
    }

    #[test]
    fn test_transfer_builder() {
        let alice = KeyPair::generate_ed25519();
        let bob = KeyPair::generate_ed25519();
        let created = Transaction::create(&[alice.public_key()], 5, json!({"n": 1}), None).unwrap();

        let transfer = TransactionBuilder::transfer(&created.id)
            .spend(&created, 0, &[alice.public_key()])
            .add_output(Output::new(5, &[bob.public_key()]).unwrap())
            .metadata(json!({"note": "sale"}))
            .build()
            .unwrap();

        assert_eq!(transfer.operation, Operation::Transfer);
        assert_eq!(transfer.asset["id"], created.id.as_str());
        let link = transfer.inputs[0].fulfills.as_ref().unwrap();
        assert_eq!(link.transaction_id, created.id);
        assert_eq!(link.output_index, 0);
    }

    #[test]
    fn test_builder_requires_inputs() {
        let result = TransactionBuilder::create(json!({})).build();
        assert!(matches!(result, Err(TransactionError::NoInputs)));
    }

    #[test]
    fn test_json_round_trip() {
        let kp = KeyPair::generate_ed25519();
        let tx = Transaction::create(&[kp.public_key()], 3, json!({"a": [1, 2]}), Some(json!({"m": true})))
            .unwrap();
        let parsed = Transaction::from_json(&tx.to_json().unwrap()).unwrap();
        assert_eq!(parsed, tx);
        assert_eq!(parsed.signing_bytes().unwrap(), tx.signing_bytes().unwrap());
    }

    #[test]
    fn test_joint_output_uses_threshold() {
        let keys: Vec<PublicKey> = (0..2)
            .map(|_| KeyPair::generate_ed25519().public_key())
            .collect();
        let output = Output::new(1, &keys).unwrap();
        assert_eq!(output.condition.details.threshold, Some(2));
        assert_eq!(output.public_keys.len(), 2);
        assert!(output.condition.uri.starts_with("cc:2:"));
    }
}
