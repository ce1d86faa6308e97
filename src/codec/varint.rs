//! Length-prefixed binary primitives
//!
//! A length below 128 is a single byte. Anything longer is written as
//! `0x80 | k` followed by `k` big-endian length bytes. `VarOctet` is a
//! length followed by that many bytes; `VarUint` is a `VarOctet` holding the
//! minimal big-endian form of the integer.

use thiserror::Error;

/// Widest long-form length prefix accepted (in length bytes)
pub const MAX_LENGTH_BYTES: usize = 8;

/// Errors from the binary codec
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("Unexpected end of input: {needed} more bytes needed")]
    Truncated { needed: usize },
    #[error("Non-minimal encoding")]
    NonMinimal,
    #[error("Length prefix of {0} bytes is too wide")]
    LengthTooWide(usize),
    #[error("{0} trailing bytes after value")]
    TrailingBytes(usize),
    #[error("Integer does not fit in {0} bits")]
    Overflow(u32),
    #[error("Invalid base64url: {0}")]
    Base64(String),
    #[error("Malformed URI: {0}")]
    Uri(String),
}

/// Number of bytes the length prefix for `len` occupies
pub fn length_prefix_len(len: usize) -> usize {
    if len < 128 {
        1
    } else {
        1 + be_width(len as u64)
    }
}

/// Total encoded size of a `VarOctet` carrying `payload_len` bytes
pub fn var_octet_len(payload_len: usize) -> usize {
    length_prefix_len(payload_len) + payload_len
}

/// Total encoded size of `VarUint(value)`
pub fn var_uint_len(value: u64) -> usize {
    var_octet_len(be_width(value))
}

/// Minimal big-endian bytes of `value`; zero is a single zero byte
pub fn minimal_be_bytes(value: u64) -> Vec<u8> {
    let width = be_width(value);
    value.to_be_bytes()[8 - width..].to_vec()
}

fn be_width(value: u64) -> usize {
    if value == 0 {
        1
    } else {
        (64 - value.leading_zeros() as usize + 7) / 8
    }
}

/// Append-only encoder for the condition wire format
#[derive(Debug, Default, Clone)]
pub struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    pub fn write_u16(&mut self, value: u16) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    pub fn write_u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    pub fn write_u64(&mut self, value: u64) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    /// Raw bytes with no prefix
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn write_length(&mut self, len: usize) {
        if len < 128 {
            self.buf.push(len as u8);
        } else {
            let width = be_width(len as u64);
            self.buf.push(0x80 | width as u8);
            self.buf
                .extend_from_slice(&(len as u64).to_be_bytes()[8 - width..]);
        }
    }

    pub fn write_var_octet(&mut self, bytes: &[u8]) {
        self.write_length(bytes.len());
        self.buf.extend_from_slice(bytes);
    }

    pub fn write_var_uint(&mut self, value: u64) {
        self.write_var_octet(&minimal_be_bytes(value));
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

/// Cursor over a borrowed byte slice
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len().saturating_sub(self.pos)
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn read_exact(&mut self, len: usize) -> Result<&'a [u8], CodecError> {
        if self.remaining() < len {
            return Err(CodecError::Truncated {
                needed: len - self.remaining(),
            });
        }
        let start = self.pos;
        self.pos += len;
        Ok(&self.bytes[start..start + len])
    }

    pub fn read_u8(&mut self) -> Result<u8, CodecError> {
        Ok(self.read_exact(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, CodecError> {
        let b = self.read_exact(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    pub fn read_u32(&mut self) -> Result<u32, CodecError> {
        let b = self.read_exact(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_u64(&mut self) -> Result<u64, CodecError> {
        let b = self.read_exact(8)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(b);
        Ok(u64::from_be_bytes(raw))
    }

    pub fn read_length(&mut self) -> Result<usize, CodecError> {
        let first = self.read_u8()?;
        if first < 0x80 {
            return Ok(first as usize);
        }

        let width = (first & 0x7f) as usize;
        if width == 0 || width > MAX_LENGTH_BYTES {
            return Err(CodecError::LengthTooWide(width));
        }
        let raw = self.read_exact(width)?;
        if raw[0] == 0 {
            return Err(CodecError::NonMinimal);
        }
        let len = raw.iter().fold(0u64, |acc, b| (acc << 8) | *b as u64);
        if len < 128 {
            return Err(CodecError::NonMinimal);
        }
        usize::try_from(len).map_err(|_| CodecError::Overflow(usize::BITS))
    }

    pub fn read_var_octet(&mut self) -> Result<&'a [u8], CodecError> {
        let len = self.read_length()?;
        self.read_exact(len)
    }

    pub fn read_var_uint(&mut self) -> Result<u64, CodecError> {
        let raw = self.read_var_octet()?;
        match raw.len() {
            0 => Err(CodecError::NonMinimal),
            n if n > 8 => Err(CodecError::Overflow(64)),
            n if n > 1 && raw[0] == 0 => Err(CodecError::NonMinimal),
            _ => Ok(raw.iter().fold(0u64, |acc, b| (acc << 8) | *b as u64)),
        }
    }

    /// Fail if any input is left unread
    pub fn finish(&self) -> Result<(), CodecError> {
        match self.remaining() {
            0 => Ok(()),
            n => Err(CodecError::TrailingBytes(n)),
        }
    }
}
