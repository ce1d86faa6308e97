//! Ledger conditions CLI application
//!
//! A command-line interface for keys, conditions and transaction fulfillment.

use clap::{Parser, Subcommand};
use ledger_conditions::cli::{self, AppState};
use ledger_conditions::crypto::KeyType;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "conditions")]
#[command(author = "Darshan")]
#[command(version = "0.1.0")]
#[command(about = "Crypto-conditions and transaction fulfillment for ledger outputs", long_about = None)]
struct Cli {
    /// Data directory for key storage
    #[arg(short, long, default_value = ".conditions_data")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Key operations
    Key {
        #[command(subcommand)]
        action: KeyCommands,
    },

    /// Derive the condition for one or more owners
    Condition {
        /// Owner key labels or base58 public keys
        #[arg(required = true)]
        owners: Vec<String>,
    },

    /// Transaction operations
    Tx {
        #[command(subcommand)]
        action: TxCommands,
    },

    /// Fulfillment and condition URIs
    Fulfillment {
        #[command(subcommand)]
        action: FulfillmentCommands,
    },
}

#[derive(Subcommand)]
enum KeyCommands {
    /// Create a new key pair
    New {
        /// Optional label for the key
        #[arg(short, long)]
        label: Option<String>,

        /// Key type: ed25519 or rsa
        #[arg(short = 't', long = "type")]
        key_type: Option<KeyType>,
    },

    /// List all keys
    List,
}

#[derive(Subcommand)]
enum TxCommands {
    /// Write an unsigned CREATE transaction
    Create {
        /// Owner key labels or base58 public keys
        #[arg(short, long = "owner", required = true)]
        owners: Vec<String>,

        /// Amount to create
        #[arg(short, long, default_value = "1")]
        amount: u64,

        /// Asset data as JSON
        #[arg(long, default_value = "{}")]
        asset: String,

        /// Metadata as JSON
        #[arg(short, long)]
        metadata: Option<String>,

        /// Output file path
        #[arg(long)]
        out: PathBuf,
    },

    /// Sign a transaction file with a stored key
    Sign {
        /// Transaction file path
        #[arg(short, long)]
        file: PathBuf,

        /// Key label or base58 public key
        #[arg(short, long)]
        key: String,
    },

    /// Check that every input of a transaction is fulfilled
    Verify {
        /// Transaction file path
        #[arg(short, long)]
        file: PathBuf,
    },
}

#[derive(Subcommand)]
enum FulfillmentCommands {
    /// Decode a fulfillment (cf:) or condition (cc:) URI
    Inspect {
        /// The URI to decode
        uri: String,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // URI and file commands don't need the key store
    match &cli.command {
        Commands::Fulfillment {
            action: FulfillmentCommands::Inspect { uri },
        } => return cli::cmd_inspect(uri),
        Commands::Tx {
            action: TxCommands::Verify { file },
        } => return cli::cmd_tx_verify(file),
        _ => {}
    }

    let state = AppState::new(cli.data_dir.clone())?;

    match cli.command {
        Commands::Key { action } => match action {
            KeyCommands::New { label, key_type } => {
                cli::cmd_key_new(&state, label.as_deref(), key_type)?;
            }
            KeyCommands::List => {
                cli::cmd_key_list(&state)?;
            }
        },

        Commands::Condition { owners } => {
            cli::cmd_condition(&state, &owners)?;
        }

        Commands::Tx { action } => match action {
            TxCommands::Create {
                owners,
                amount,
                asset,
                metadata,
                out,
            } => {
                cli::cmd_tx_create(&state, &owners, amount, &asset, metadata.as_deref(), &out)?;
            }
            TxCommands::Sign { file, key } => {
                cli::cmd_tx_sign(&state, &file, &key)?;
            }
            TxCommands::Verify { .. } => unreachable!(),
        },

        Commands::Fulfillment { .. } => unreachable!(),
    }

    Ok(())
}
