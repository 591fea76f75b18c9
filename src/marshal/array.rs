//! Array marshalling - native sequences ↔ host object arrays
//!
//! Slot `i` of a host array always holds element `i` of the sequence it was
//! built from, and vice versa.

use super::codec::{decode_int, decode_text, encode_int, encode_text, narrow_int};
use super::value::{NativeValue, ValueKind};
use crate::errors::{BridgeError, BridgeResult};
use crate::host::HostRuntime;
use tracing::trace;

/// Element kinds a [`Sequence`] can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Text,
    /// Boxed on the host side: `Array<Int>` is `Integer[]`
    Int,
}

impl ElementKind {
    pub const fn value_kind(self) -> ValueKind {
        match self {
            Self::Text => ValueKind::Text,
            Self::Int => ValueKind::Int,
        }
    }

    pub const fn element_class(self) -> &'static str {
        self.value_kind().class_name()
    }

    /// Runtime class of a host array of this kind
    pub const fn array_class(self) -> &'static str {
        match self {
            Self::Text => "[Ljava/lang/String;",
            Self::Int => "[Ljava/lang/Integer;",
        }
    }
}

/// Ordered, homogeneous list of primitive values. Fixed once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sequence {
    Text(Vec<String>),
    Int(Vec<i32>),
}

impl Sequence {
    pub fn text<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Text(items.into_iter().map(Into::into).collect())
    }

    pub fn ints(items: impl IntoIterator<Item = i32>) -> Self {
        Self::Int(items.into_iter().collect())
    }

    pub fn empty(kind: ElementKind) -> Self {
        match kind {
            ElementKind::Text => Self::Text(Vec::new()),
            ElementKind::Int => Self::Int(Vec::new()),
        }
    }

    /// Build from loosely typed values; every value must be of `kind`
    pub fn from_values(kind: ElementKind, values: Vec<NativeValue>) -> BridgeResult<Self> {
        let mut sequence = Self::empty(kind);

        for value in values {
            match (&mut sequence, value) {
                (Self::Text(items), NativeValue::Text(text)) => items.push(text),
                (Self::Int(items), NativeValue::Int(v)) => items.push(v),
                (_, other) => {
                    return Err(BridgeError::mismatch(
                        format!("{:?}", kind.value_kind()),
                        format!("{:?}", other.kind()),
                    ))
                }
            }
        }

        Ok(sequence)
    }

    pub fn kind(&self) -> ElementKind {
        match self {
            Self::Text(_) => ElementKind::Text,
            Self::Int(_) => ElementKind::Int,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Text(items) => items.len(),
            Self::Int(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_text(&self) -> Option<&[String]> {
        match self {
            Self::Text(items) => Some(items),
            Self::Int(_) => None,
        }
    }

    pub fn as_ints(&self) -> Option<&[i32]> {
        match self {
            Self::Int(items) => Some(items),
            Self::Text(_) => None,
        }
    }
}

/// Allocate a host array of the sequence's kind and fill it in order.
///
/// An empty sequence still yields a real, zero-length array.
pub fn build_host_array<H: HostRuntime>(host: &mut H, sequence: &Sequence) -> BridgeResult<H::Object> {
    let kind = sequence.kind();
    let length = narrow_int(sequence.len())?;
    let array = host.new_object_array(length, kind.element_class())?;

    match sequence {
        Sequence::Text(items) => {
            for (index, item) in items.iter().enumerate() {
                let element = encode_text(host, item)?;
                host.set_array_element(&array, index as i32, &element)?;
                host.release(element);
            }
        }
        Sequence::Int(items) => {
            for (index, item) in items.iter().enumerate() {
                let element = encode_int(host, *item)?;
                host.set_array_element(&array, index as i32, &element)?;
                host.release(element);
            }
        }
    }

    trace!(
        event = "array_built",
        class = kind.array_class(),
        length = length,
        "Host array built"
    );

    Ok(array)
}

/// Read a host array back, refusing arrays whose runtime element kind differs
pub fn read_host_array<H: HostRuntime>(
    host: &mut H,
    array: &H::Object,
    expected: ElementKind,
) -> BridgeResult<Sequence> {
    if host.is_null(array) {
        return Err(BridgeError::NullHandle("array"));
    }

    let found = host.array_class_name(array)?;
    if found != expected.array_class() {
        return Err(BridgeError::mismatch(expected.array_class(), found));
    }

    let length = host.array_length(array)?;
    let mut sequence = Sequence::empty(expected);

    for index in 0..length {
        let element = host.array_element(array, index)?;
        match &mut sequence {
            Sequence::Text(items) => items.push(decode_text(host, &element)?),
            Sequence::Int(items) => items.push(decode_int(host, &element)?),
        }
        host.release(element);
    }

    Ok(sequence)
}
