//! Binary and URI codec for the condition wire format
//!
//! This module provides:
//! - Variable-length octet strings and unsigned integers
//! - Fixed-width big-endian integers
//! - Condition and fulfillment URI text forms

pub mod uri;
pub mod varint;

pub use uri::{
    base64url_decode, base64url_encode, format_condition_uri, format_fulfillment_uri,
    parse_condition_uri, parse_fulfillment_uri, ConditionUriParts, CONDITION_URI_SCHEME,
    FULFILLMENT_URI_SCHEME,
};
pub use varint::{
    length_prefix_len, minimal_be_bytes, var_octet_len, var_uint_len, CodecError, Reader,
    Writer, MAX_LENGTH_BYTES,
};
