//! Transaction documents and the fulfillment protocol
//!
//! This module provides:
//! - Transaction, input and output documents
//! - Output condition details in JSON form
//! - Attaching, detaching and verifying input fulfillments

pub mod details;
pub mod fulfill;
pub mod transaction;

pub use details::{owners_fulfillment, ConditionDetails, ConditionDocument, DetailsKind};
pub use transaction::{
    Input, Operation, Output, OutputLink, Transaction, TransactionBuilder, TransactionError,
    TX_VERSION,
};
