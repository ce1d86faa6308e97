//! Text forms of conditions and fulfillments
//!
//! - Condition: `cc:<hex type>:<hex bitmask>:<base64url hash>:<decimal size>`
//! - Fulfillment: `cf:<hex type>:<base64url payload>`
//!
//! Numbers are written in their canonical form (lowercase hex, no leading
//! zeros) and anything else is rejected on parse, so each value has exactly
//! one text form.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

use super::varint::CodecError;

/// Scheme prefix of condition URIs
pub const CONDITION_URI_SCHEME: &str = "cc";

/// Scheme prefix of fulfillment URIs
pub const FULFILLMENT_URI_SCHEME: &str = "cf";

/// Fields carried by a condition URI
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionUriParts {
    pub type_id: u16,
    pub bitmask: u64,
    pub hash: Vec<u8>,
    pub size: u64,
}

pub fn base64url_encode(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

pub fn base64url_decode(encoded: &str) -> Result<Vec<u8>, CodecError> {
    URL_SAFE_NO_PAD
        .decode(encoded)
        .map_err(|e| CodecError::Base64(e.to_string()))
}

pub fn format_condition_uri(type_id: u16, bitmask: u64, hash: &[u8], size: u64) -> String {
    format!(
        "{}:{:x}:{:x}:{}:{}",
        CONDITION_URI_SCHEME,
        type_id,
        bitmask,
        base64url_encode(hash),
        size
    )
}

pub fn parse_condition_uri(uri: &str) -> Result<ConditionUriParts, CodecError> {
    let parts: Vec<&str> = uri.split(':').collect();
    if parts.len() != 5 {
        return Err(CodecError::Uri(format!(
            "expected 5 fields in condition uri, found {}",
            parts.len()
        )));
    }
    if parts[0] != CONDITION_URI_SCHEME {
        return Err(CodecError::Uri(format!("unexpected scheme '{}'", parts[0])));
    }

    let type_id = parse_hex(parts[1])?;
    let type_id = u16::try_from(type_id).map_err(|_| CodecError::Overflow(16))?;
    let bitmask = parse_hex(parts[2])?;
    let hash = base64url_decode(parts[3])?;
    let size: u64 = parts[4]
        .parse()
        .map_err(|_| CodecError::Uri(format!("invalid size '{}'", parts[4])))?;
    if size.to_string() != parts[4] {
        return Err(CodecError::Uri(format!("non-canonical size '{}'", parts[4])));
    }

    Ok(ConditionUriParts {
        type_id,
        bitmask,
        hash,
        size,
    })
}

pub fn format_fulfillment_uri(type_id: u16, payload: &[u8]) -> String {
    format!(
        "{}:{:x}:{}",
        FULFILLMENT_URI_SCHEME,
        type_id,
        base64url_encode(payload)
    )
}

pub fn parse_fulfillment_uri(uri: &str) -> Result<(u16, Vec<u8>), CodecError> {
    let parts: Vec<&str> = uri.split(':').collect();
    if parts.len() != 3 {
        return Err(CodecError::Uri(format!(
            "expected 3 fields in fulfillment uri, found {}",
            parts.len()
        )));
    }
    if parts[0] != FULFILLMENT_URI_SCHEME {
        return Err(CodecError::Uri(format!("unexpected scheme '{}'", parts[0])));
    }

    let type_id = parse_hex(parts[1])?;
    let type_id = u16::try_from(type_id).map_err(|_| CodecError::Overflow(16))?;
    let payload = base64url_decode(parts[2])?;
    Ok((type_id, payload))
}

fn parse_hex(field: &str) -> Result<u64, CodecError> {
    let value = u64::from_str_radix(field, 16)
        .map_err(|_| CodecError::Uri(format!("invalid hex field '{}'", field)))?;
    if format!("{:x}", value) != field {
        return Err(CodecError::Uri(format!("non-canonical hex field '{}'", field)));
    }
    Ok(value)
}
