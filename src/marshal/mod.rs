//! Marshalling core - native values ↔ host-runtime representations
//!
//! Design: every operation is generic over [`HostRuntime`](crate::host::HostRuntime),
//! so the same code drives a live JVM and the in-memory test heap.
//!
//! Architecture:
//! - `value.rs` - value model (HostValue, NativeValue, ValueKind)
//! - `codec.rs` - text and integer codec, generic value lowering/lifting
//! - `array.rs` - Sequence ↔ host object arrays
//! - `object.rs` - class descriptors, class cache, construction, accessors
//! - `envelope.rs` - success/failure result envelope

mod array;
mod codec;
mod envelope;
mod object;
mod value;

pub use array::{build_host_array, read_host_array, ElementKind, Sequence};
pub use codec::{
    decode_int, decode_text, encode_int, encode_text, encode_utf16, encode_utf8, lift_value,
    lower_value, narrow_int,
};
pub use envelope::{lift_envelope, read_envelope, Envelope, ENVELOPE_FIELDS, FAILURE_FIELD, SUCCESS_FIELD};
pub use object::{
    call_accessor, call_text_method, construct, resolve_class, ClassCache, ClassDescriptor,
    FieldDescriptor, FieldKind, FieldValue,
};
pub use value::{HostValue, NativeValue, ValueKind};

#[cfg(test)]
mod tests;
