//! Signing inputs and checking their fulfillments
//!
//! Every signature covers [`Transaction::signing_bytes`]. Verification
//! never touches the document: it recomputes those bytes and the condition
//! each input's owners imply, then checks the attached fulfillment against
//! both.

use log::{debug, warn};

use crate::condition::ConditionError;
use crate::crypto::{KeyPair, PublicKey};
use crate::fulfillment::{Fulfillment, Threshold};

use super::details::owners_fulfillment;
use super::transaction::{Input, Transaction, TransactionError};

impl Transaction {
    /// Sign with one key and attach the fulfillment to input 0
    pub fn fulfill_single(&mut self, key_pair: &KeyPair) -> Result<(), TransactionError> {
        if self.inputs.is_empty() {
            return Err(TransactionError::NoInputs);
        }
        let message = self.signing_bytes()?;
        let fulfillment = Fulfillment::sign(key_pair, &message)?;
        self.inputs[0].fulfillment = Some(fulfillment.to_uri()?);
        debug!(
            "attached {} fulfillment to input 0 of {}",
            fulfillment.type_id(),
            self.id
        );
        Ok(())
    }

    /// Combine detached Ed25519 signatures into an n-of-n threshold on input 0
    ///
    /// Nothing is attached unless every signature verifies.
    pub fn fulfill_multiple<S: AsRef<[u8]>>(
        &mut self,
        public_keys: &[PublicKey],
        signatures: &[S],
    ) -> Result<(), TransactionError> {
        if public_keys.len() != signatures.len() {
            return Err(TransactionError::CountMismatch {
                expected: public_keys.len(),
                actual: signatures.len(),
            });
        }
        if self.inputs.is_empty() {
            return Err(TransactionError::NoInputs);
        }

        let message = self.signing_bytes()?;
        let mut subs = Vec::with_capacity(public_keys.len());
        for (public_key, signature) in public_keys.iter().zip(signatures) {
            if !matches!(public_key, PublicKey::Ed25519(_)) {
                return Err(ConditionError::InvalidType(format!(
                    "joint signatures must be ed25519, found {}",
                    public_key.key_type()
                ))
                .into());
            }
            let sub = Fulfillment::from_signature(public_key, signature.as_ref())?;
            if !sub.validate(&message) {
                return Err(ConditionError::InvalidSignature.into());
            }
            subs.push(sub);
        }

        let fulfillment = Threshold::new(subs.len() as u32, subs)?;
        self.inputs[0].fulfillment = Some(Fulfillment::Threshold(fulfillment).to_uri()?);
        debug!(
            "attached {}-of-{} fulfillment to input 0 of {}",
            public_keys.len(),
            public_keys.len(),
            self.id
        );
        Ok(())
    }

    /// Attach one fulfillment per input, by position
    pub fn attach_fulfillments(&mut self, fulfillments: &[Fulfillment]) -> Result<(), TransactionError> {
        if fulfillments.len() != self.inputs.len() {
            return Err(TransactionError::CountMismatch {
                expected: self.inputs.len(),
                actual: fulfillments.len(),
            });
        }
        let uris = fulfillments
            .iter()
            .map(Fulfillment::to_uri)
            .collect::<Result<Vec<_>, _>>()?;
        for (input, uri) in self.inputs.iter_mut().zip(uris) {
            input.fulfillment = Some(uri);
        }
        debug!("attached {} fulfillments to {}", fulfillments.len(), self.id);
        Ok(())
    }

    /// Parse and remove every attached fulfillment
    ///
    /// Leaves the document in its signing form. Inputs without a fulfillment
    /// yield `None`. On a parse error nothing is removed.
    pub fn detach_fulfillments(&mut self) -> Result<Vec<Option<Fulfillment>>, TransactionError> {
        let parsed = self
            .inputs
            .iter()
            .map(|input| input.fulfillment.as_deref().map(Fulfillment::from_uri).transpose())
            .collect::<Result<Vec<_>, _>>()?;
        for input in &mut self.inputs {
            input.fulfillment = None;
        }
        debug!("detached fulfillments from {}", self.id);
        Ok(parsed)
    }

    /// Fulfillment attached to input `index`, parsed
    pub fn input_fulfillment(&self, index: usize) -> Result<Option<Fulfillment>, TransactionError> {
        let input = self
            .inputs
            .get(index)
            .ok_or(TransactionError::InputOutOfRange(index))?;
        Ok(input
            .fulfillment
            .as_deref()
            .map(Fulfillment::from_uri)
            .transpose()?)
    }

    /// Whether every input carries a fulfillment that satisfies its owners
    pub fn is_fulfilled(&self) -> bool {
        if self.inputs.is_empty() {
            return false;
        }
        let message = match self.signing_bytes() {
            Ok(message) => message,
            Err(e) => {
                warn!("cannot serialize {}: {}", self.id, e);
                return false;
            }
        };
        self.inputs
            .iter()
            .enumerate()
            .all(|(index, input)| match check_input(input, &message) {
                Ok(()) => true,
                Err(e) => {
                    warn!("input {} of {} rejected: {}", index, self.id, e);
                    false
                }
            })
    }
}

fn check_input(input: &Input, message: &[u8]) -> Result<(), TransactionError> {
    let uri = input
        .fulfillment
        .as_deref()
        .ok_or_else(|| ConditionError::fulfillment("input is not fulfilled"))?;
    let fulfillment = Fulfillment::from_uri(uri)?;
    let expected = owners_fulfillment(&input.owners()?)?;
    fulfillment.verify(expected.condition(), message)?;
    Ok(())
}
