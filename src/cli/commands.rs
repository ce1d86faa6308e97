//! CLI commands for conditions and transactions
//!
//! Implements all command handlers for the CLI interface.

use std::fs;
use std::path::{Path, PathBuf};

use crate::condition::Condition;
use crate::crypto::{KeyType, PublicKey};
use crate::fulfillment::Fulfillment;
use crate::keystore::{KeyStore, KeyStoreConfig};
use crate::transaction::{owners_fulfillment, ConditionDocument, Transaction};

/// Result type for CLI operations
pub type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Application state
pub struct AppState {
    pub key_store: KeyStore,
    pub data_dir: PathBuf,
}

impl AppState {
    /// Initialize application state
    pub fn new(data_dir: PathBuf) -> CliResult<Self> {
        let key_store = KeyStore::new(KeyStoreConfig::in_data_dir(&data_dir))?;
        Ok(Self {
            key_store,
            data_dir,
        })
    }

    /// Resolve a stored key label, or parse a base58 public key
    pub fn resolve_public_key(&self, name: &str) -> CliResult<PublicKey> {
        match self.key_store.find_key(name) {
            Ok(key) => Ok(key.public_key()),
            Err(_) => Ok(PublicKey::from_base58(name)?),
        }
    }

    fn resolve_all(&self, names: &[String]) -> CliResult<Vec<PublicKey>> {
        names.iter().map(|name| self.resolve_public_key(name)).collect()
    }
}

fn read_transaction(path: &Path) -> CliResult<Transaction> {
    Ok(Transaction::from_json(&fs::read_to_string(path)?)?)
}

fn write_transaction(tx: &Transaction, path: &Path) -> CliResult<()> {
    fs::write(path, tx.to_json()?)?;
    Ok(())
}

/// Create a new key pair
pub fn cmd_key_new(state: &AppState, label: Option<&str>, key_type: Option<KeyType>) -> CliResult<()> {
    let key_type = key_type.unwrap_or(state.key_store.config().default_key_type);
    let key = state.key_store.create_key_of_type(key_type, label)?;

    println!("🔐 New {} key created!", key_type);
    println!("   🔑 Public Key: {}", key.public_key());
    if let Some(l) = &key.label {
        println!("   🏷️  Label: {}", l);
    }
    println!(
        "\n   ⚠️  IMPORTANT: Your private key is stored in {:?}.",
        state.key_store.config().keys_dir
    );
    println!("   Back up this directory to avoid losing access to your outputs!");

    Ok(())
}

/// List all keys
pub fn cmd_key_list(state: &AppState) -> CliResult<()> {
    let keys = state.key_store.list_keys()?;

    if keys.is_empty() {
        println!("📭 No keys found. Create one with: conditions key new");
        return Ok(());
    }

    println!("🔑 Keys ({}):", keys.len());
    for key in keys {
        let info = key.info();
        println!(
            "   {} [{}] {}",
            info.label.as_deref().unwrap_or("-"),
            info.key_type,
            info.public_key
        );
    }

    Ok(())
}

/// Derive the condition locking an output to `owners`
pub fn cmd_condition(state: &AppState, owners: &[String]) -> CliResult<()> {
    let public_keys = state.resolve_all(owners)?;
    let fulfillment = owners_fulfillment(&public_keys)?;
    let document = ConditionDocument::from_fulfillment(&fulfillment);

    println!("🔒 Condition for {} owner(s)", public_keys.len());
    println!("   ├─ URI: {}", document.uri);
    println!("   ├─ Type: {}", fulfillment.type_id());
    println!("   └─ Max fulfillment size: {} bytes", fulfillment.size());
    println!("{}", serde_json::to_string_pretty(&document)?);

    Ok(())
}

/// Write an unsigned CREATE transaction
pub fn cmd_tx_create(
    state: &AppState,
    owners: &[String],
    amount: u64,
    asset: &str,
    metadata: Option<&str>,
    output: &Path,
) -> CliResult<()> {
    let public_keys = state.resolve_all(owners)?;
    let asset: serde_json::Value = serde_json::from_str(asset)?;
    let metadata = metadata.map(serde_json::from_str::<serde_json::Value>).transpose()?;

    let tx = Transaction::create(&public_keys, amount, asset, metadata)?;
    write_transaction(&tx, output)?;

    println!("📝 Transaction created!");
    println!("   ├─ ID: {}", tx.id);
    println!("   ├─ Owners: {}", public_keys.len());
    println!("   ├─ Amount: {}", amount);
    println!("   └─ Written to {:?}", output);

    Ok(())
}

/// Sign input 0 of a transaction with a stored key
pub fn cmd_tx_sign(state: &AppState, path: &Path, key_name: &str) -> CliResult<()> {
    let mut tx = read_transaction(path)?;
    let key = state.key_store.find_key(key_name)?;

    tx.fulfill_single(key.key_pair())?;
    write_transaction(&tx, path)?;

    println!("✍️  Signed {} with {}", tx.id, key.public_key());
    if tx.is_fulfilled() {
        println!("   ✅ All inputs fulfilled");
    } else {
        println!("   ⏳ Not yet fulfilled: more signers are needed");
    }

    Ok(())
}

/// Check every input of a transaction
pub fn cmd_tx_verify(path: &Path) -> CliResult<()> {
    let tx = read_transaction(path)?;

    println!("🔍 Verifying transaction {}...", tx.id);
    if !tx.has_valid_id() {
        println!("   ❌ ID does not match the transaction contents");
    }
    if tx.is_fulfilled() {
        println!("   ✅ Transaction is fulfilled");
    } else {
        println!("   ❌ Transaction is NOT fulfilled");
    }

    Ok(())
}

/// Print the fields of a condition or fulfillment URI
pub fn cmd_inspect(uri: &str) -> CliResult<()> {
    let uri = uri.trim();
    if uri.starts_with("cc:") {
        let condition: Condition = uri.parse()?;
        println!("🔒 Condition");
        print_condition(&condition);
        return Ok(());
    }

    let fulfillment: Fulfillment = uri.parse()?;
    println!("🔓 Fulfillment");
    println!("   ├─ Payload: {} bytes", fulfillment.payload()?.len());
    if let Fulfillment::Threshold(threshold) = &fulfillment {
        println!(
            "   ├─ Threshold: {} of {} subs",
            threshold.threshold(),
            threshold.subfulfillments().len()
        );
    }
    print_condition(fulfillment.condition());

    Ok(())
}

fn print_condition(condition: &Condition) {
    println!("   ├─ Type: {} ({})", condition.type_id(), condition.type_id().as_u16());
    println!("   ├─ Bitmask: {:#x}", condition.bitmask().bits());
    println!("   ├─ Hash: {}", condition.hash_hex());
    println!("   ├─ Max fulfillment size: {} bytes", condition.size());
    println!("   └─ URI: {}", condition.to_uri());
}
