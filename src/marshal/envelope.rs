//! Result envelope - a success/failure pair of string arrays
//!
//! The host side has no sum type to receive a `Result`, so outcomes cross as
//! an object with two `Array<String>` fields of which at most one is
//! populated. The only way to build an [`Envelope`] is through [`Envelope::success`]
//! and [`Envelope::failure`].

use super::array::{ElementKind, Sequence};
use super::object::{call_accessor, construct, ClassDescriptor, FieldDescriptor, FieldKind, FieldValue};
use crate::errors::{BridgeError, BridgeResult};
use crate::host::HostRuntime;
use std::fmt::Display;

pub const SUCCESS_FIELD: FieldDescriptor = FieldDescriptor::new("successData", FieldKind::TextArray);
pub const FAILURE_FIELD: FieldDescriptor = FieldDescriptor::new("failureData", FieldKind::TextArray);

/// Field layout shared by every envelope class
pub const ENVELOPE_FIELDS: &[FieldDescriptor] = &[SUCCESS_FIELD, FAILURE_FIELD];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    success: Vec<String>,
    failure: Vec<String>,
}

impl Envelope {
    pub fn success<I, S>(data: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(data.into_iter().map(Into::into).collect(), Vec::new())
    }

    /// A failure must say something; empty failure data is a caller bug
    pub fn failure<I, S>(data: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let failure: Vec<String> = data.into_iter().map(Into::into).collect();
        assert!(
            !failure.is_empty(),
            "envelope failure constructed without a description"
        );
        Self::new(Vec::new(), failure)
    }

    /// Fold a fallible computation; the error's display text becomes the failure line
    pub fn from_result<E: Display>(outcome: Result<Vec<String>, E>) -> Self {
        match outcome {
            Ok(data) => Self::success(data),
            Err(error) => Self::failure([error.to_string()]),
        }
    }

    fn new(success: Vec<String>, failure: Vec<String>) -> Self {
        assert!(
            success.is_empty() || failure.is_empty(),
            "envelope populated with both success and failure data"
        );
        Self { success, failure }
    }

    pub fn success_data(&self) -> &[String] {
        &self.success
    }

    pub fn failure_data(&self) -> &[String] {
        &self.failure
    }

    pub fn is_failure(&self) -> bool {
        !self.failure.is_empty()
    }

    pub fn into_result(self) -> Result<Vec<String>, Vec<String>> {
        if self.failure.is_empty() {
            Ok(self.success)
        } else {
            Err(self.failure)
        }
    }
}

/// Build a host envelope object of class `descriptor`
pub fn lift_envelope<H: HostRuntime>(
    host: &mut H,
    descriptor: &ClassDescriptor,
    envelope: &Envelope,
) -> BridgeResult<H::Object> {
    construct(
        host,
        descriptor,
        &[
            (
                SUCCESS_FIELD.name,
                FieldValue::Sequence(Sequence::Text(envelope.success.clone())),
            ),
            (
                FAILURE_FIELD.name,
                FieldValue::Sequence(Sequence::Text(envelope.failure.clone())),
            ),
        ],
    )
}

/// Read a host envelope object back through its getters
pub fn read_envelope<H: HostRuntime>(
    host: &mut H,
    descriptor: &ClassDescriptor,
    object: &H::Object,
) -> BridgeResult<Envelope> {
    let success = read_side(host, object, &SUCCESS_FIELD)?;
    let failure = read_side(host, object, &FAILURE_FIELD)?;

    if !success.is_empty() && !failure.is_empty() {
        return Err(BridgeError::EnvelopeViolation {
            class: descriptor.name.to_string(),
        });
    }

    Ok(Envelope::new(success, failure))
}

fn read_side<H: HostRuntime>(
    host: &mut H,
    object: &H::Object,
    field: &FieldDescriptor,
) -> BridgeResult<Vec<String>> {
    match call_accessor(host, object, field)? {
        FieldValue::Sequence(Sequence::Text(items)) => Ok(items),
        other => Err(BridgeError::mismatch(
            ElementKind::Text.array_class(),
            format!("{:?}", other.kind()),
        )),
    }
}
