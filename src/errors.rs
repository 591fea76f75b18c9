//! Error types for the marshalling core.
//!
//! Every failure inside the bridge is a [`BridgeError`]. Data-dependent
//! failures are folded into a result envelope before they reach an entry
//! point; anything that still arrives at the boundary is fatal.

/// Marshalling and binding errors.
///
/// # Categories
///
/// | Category | Variants | Description |
/// |----------|----------|-------------|
/// | Codec | `Encoding`, `Range`, `NegativeByte` | Value cannot cross the boundary |
/// | Shape | `TypeMismatch`, `UnsupportedKind`, `ArrayOfVoid`, `NullHandle` | Wrong kind of host value |
/// | Binding | `ClassResolution`, `FieldBinding` | Host class shape differs from the descriptor |
/// | Envelope | `EnvelopeViolation` | Host envelope carries both success and failure data |
/// | System | `Host`, `Assertion`, `Config` | Host runtime, self-check and configuration failures |
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BridgeError {
    /// Text is not valid UTF-8, or holds an unpaired surrogate
    #[error("encoding error: {0}")]
    Encoding(String),

    /// Integer does not fit the target width
    #[error("value {value} is out of range for {target}")]
    Range { value: String, target: &'static str },

    /// Host value or array has a different kind than expected
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    /// Native bytes are unsigned, so negative host bytes are rejected
    #[error("byte {0} is negative and has no native counterpart")]
    NegativeByte(i8),

    #[error("arrays of void are not representable")]
    ArrayOfVoid,

    #[error("unsupported host value: {0}")]
    UnsupportedKind(String),

    #[error("null handle where a {0} was expected")]
    NullHandle(&'static str),

    #[error("class `{name}` could not be resolved: {reason}")]
    ClassResolution { name: String, reason: String },

    #[error("field `{field}` of `{class}` could not be bound: {reason}")]
    FieldBinding {
        class: String,
        field: String,
        reason: String,
    },

    /// A host envelope object has both sides populated
    #[error("envelope `{class}` carries both success and failure data")]
    EnvelopeViolation { class: String },

    #[error("host runtime error: {0}")]
    Host(String),

    #[error("native assertion failed: {0}")]
    Assertion(String),

    #[error("configuration error: {0}")]
    Config(String),
}

pub type BridgeResult<T> = Result<T, BridgeError>;

impl BridgeError {
    pub fn range(value: impl ToString, target: &'static str) -> Self {
        Self::Range {
            value: value.to_string(),
            target,
        }
    }

    pub fn mismatch(expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::TypeMismatch {
            expected: expected.into(),
            found: found.into(),
        }
    }

    pub fn field(class: &str, field: &str, reason: impl Into<String>) -> Self {
        Self::FieldBinding {
            class: class.to_string(),
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<jni::errors::Error> for BridgeError {
    fn from(value: jni::errors::Error) -> Self {
        BridgeError::Host(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = BridgeError::range(1u64 << 40, "i32");
        assert_eq!(err.to_string(), "value 1099511627776 is out of range for i32");

        let err = BridgeError::field("RustyClass", "message", "no such field");
        assert_eq!(
            err.to_string(),
            "field `message` of `RustyClass` could not be bound: no such field"
        );
    }

    #[test]
    fn test_jni_errors_become_host_errors() {
        let err: BridgeError = jni::errors::Error::NullPtr("env").into();
        assert!(matches!(err, BridgeError::Host(_)));
    }
}
