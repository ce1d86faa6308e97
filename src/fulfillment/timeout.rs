//! Expiry fulfillment
//!
//! Satisfied while the checked time has not passed the expiry. The message
//! is the current Unix time in seconds, written as a decimal string.

use chrono::{DateTime, Duration, Utc};

use crate::codec::{Reader, Writer};
use crate::condition::{Condition, ConditionError, TypeId, TIMEOUT_BITMASK};
use crate::crypto::sha256;

#[derive(Debug, Clone)]
pub struct Timeout {
    expire: u64,
    condition: Condition,
}

impl Timeout {
    /// Expire at `expire` (Unix seconds)
    pub fn new(expire: u64) -> Self {
        let payload = encode_expiry(expire);
        let condition = Condition::new(TypeId::Timeout, TIMEOUT_BITMASK, sha256(&payload), payload.len());
        Self { expire, condition }
    }

    /// Expire `duration` from now
    pub fn expiring_in(duration: Duration) -> Self {
        let expire = (Utc::now() + duration).timestamp().max(0) as u64;
        Self::new(expire)
    }

    pub fn expire(&self) -> u64 {
        self.expire
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        i64::try_from(self.expire)
            .ok()
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
    }

    pub fn condition(&self) -> &Condition {
        &self.condition
    }

    pub(crate) fn condition_mut(&mut self) -> &mut Condition {
        &mut self.condition
    }

    /// `true` iff the decimal timestamp in `message` is not after the expiry
    pub fn validate(&self, message: &[u8]) -> bool {
        let parsed = std::str::from_utf8(message)
            .ok()
            .and_then(|s| s.parse::<i64>().ok());
        match parsed {
            Some(now) => i128::from(self.expire) >= i128::from(now),
            None => false,
        }
    }

    pub fn validate_at(&self, now: DateTime<Utc>) -> bool {
        self.validate(now.timestamp().to_string().as_bytes())
    }

    pub fn payload(&self) -> Vec<u8> {
        encode_expiry(self.expire)
    }

    pub(crate) fn from_payload(payload: &[u8]) -> Result<Self, ConditionError> {
        let mut r = Reader::new(payload);
        let expire = r.read_var_uint().map_err(ConditionError::fulfillment)?;
        r.finish().map_err(ConditionError::fulfillment)?;
        Ok(Self::new(expire))
    }
}

fn encode_expiry(expire: u64) -> Vec<u8> {
    let mut w = Writer::new();
    w.write_var_uint(expire);
    w.into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_boundaries() {
        let f = Timeout::new(1_700_000_000);
        assert!(f.validate(b"1699999999"));
        assert!(f.validate(b"1700000000"));
        assert!(!f.validate(b"1700000001"));
        assert!(!f.validate(b"not a number"));
        assert!(!f.validate(b" 1700000000\n"));
        assert!(!f.validate(b""));
    }

    #[test]
    fn test_validate_at() {
        let f = Timeout::expiring_in(Duration::hours(1));
        assert!(f.validate_at(Utc::now()));
        assert!(!f.validate_at(Utc::now() + Duration::hours(2)));
    }

    #[test]
    fn test_payload_and_condition() {
        let f = Timeout::new(0x0102);
        assert_eq!(f.payload(), vec![0x02, 0x01, 0x02]);
        assert_eq!(f.condition().size(), 3);
        assert_eq!(f.condition().hash(), &sha256(&[0x02, 0x01, 0x02]));

        let decoded = Timeout::from_payload(&f.payload()).unwrap();
        assert_eq!(decoded.expire(), 0x0102);
        assert!(Timeout::from_payload(&[0x02, 0x01, 0x02, 0x00]).is_err());
    }
}
