//! Errors raised while building, encoding, or decoding conditions and
//! fulfillments

use std::fmt;

use thiserror::Error;

/// Condition and fulfillment errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConditionError {
    #[error("Invalid condition: {0}")]
    InvalidCondition(String),
    #[error("Invalid fulfillment: {0}")]
    InvalidFulfillment(String),
    #[error("Invalid signature")]
    InvalidSignature,
    #[error("Invalid type: {0}")]
    InvalidType(String),
    #[error("Insufficient threshold: need weight {threshold}, at most {available} available")]
    InsufficientThreshold { threshold: u32, available: u64 },
    #[error("Fulfillment payload of {0} bytes exceeds the maximum")]
    PayloadTooLarge(usize),
    #[error("Too many subfulfillments: {0}")]
    TooManySubfulfillments(usize),
    #[error("Weight must be at least 1")]
    InvalidWeight,
}

impl ConditionError {
    pub(crate) fn condition(reason: impl fmt::Display) -> Self {
        ConditionError::InvalidCondition(reason.to_string())
    }

    pub(crate) fn fulfillment(reason: impl fmt::Display) -> Self {
        ConditionError::InvalidFulfillment(reason.to_string())
    }
}

impl From<crate::crypto::KeyError> for ConditionError {
    fn from(err: crate::crypto::KeyError) -> Self {
        match err {
            crate::crypto::KeyError::UnsupportedKeyType(_) => {
                ConditionError::InvalidType(err.to_string())
            }
            other => ConditionError::InvalidFulfillment(other.to_string()),
        }
    }
}
