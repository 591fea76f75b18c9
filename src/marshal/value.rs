//! Value model shared by both sides of the boundary.
//!
//! `HostValue` mirrors the JNI `jvalue` shape; `NativeValue` is what the
//! native side works with once a value has been lowered.

use crate::errors::{BridgeError, BridgeResult};

/// Kind descriptor for a value crossing the boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum ValueKind {
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
    Boolean,
    Char,
    #[default]
    Void,
    Text,
}

impl ValueKind {
    /// JVM type signature used in field and method descriptors
    pub const fn signature(self) -> &'static str {
        match self {
            Self::Byte => "B",
            Self::Short => "S",
            Self::Int => "I",
            Self::Long => "J",
            Self::Float => "F",
            Self::Double => "D",
            Self::Boolean => "Z",
            Self::Char => "C",
            Self::Void => "V",
            Self::Text => "Ljava/lang/String;",
        }
    }

    /// Internal name of the class that boxes this kind
    pub const fn class_name(self) -> &'static str {
        match self {
            Self::Byte => "java/lang/Byte",
            Self::Short => "java/lang/Short",
            Self::Int => "java/lang/Integer",
            Self::Long => "java/lang/Long",
            Self::Float => "java/lang/Float",
            Self::Double => "java/lang/Double",
            Self::Boolean => "java/lang/Boolean",
            Self::Char => "java/lang/Character",
            Self::Void => "java/lang/Void",
            Self::Text => "java/lang/String",
        }
    }

    /// Signature of a primitive array of this kind (`String[]` for text)
    pub fn array_signature(self) -> BridgeResult<&'static str> {
        let signature = match self {
            Self::Byte => "[B",
            Self::Short => "[S",
            Self::Int => "[I",
            Self::Long => "[J",
            Self::Float => "[F",
            Self::Double => "[D",
            Self::Boolean => "[Z",
            Self::Char => "[C",
            Self::Void => return Err(BridgeError::ArrayOfVoid),
            Self::Text => "[Ljava/lang/String;",
        };

        Ok(signature)
    }

    /// Signature of an array of the boxed class, e.g. `[Ljava/lang/Integer;`
    pub fn boxed_array_signature(self) -> BridgeResult<String> {
        if self == Self::Void {
            return Err(BridgeError::ArrayOfVoid);
        }
        Ok(format!("[L{};", self.class_name()))
    }
}

/// A JNI-shaped value. `O` is the host's object handle type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HostValue<O> {
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    /// Raw `jboolean`
    Boolean(u8),
    /// UTF-16 code unit
    Char(u16),
    Void,
    Object(O),
}

impl<O> HostValue<O> {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Byte(_) => "byte",
            Self::Short(_) => "short",
            Self::Int(_) => "int",
            Self::Long(_) => "long",
            Self::Float(_) => "float",
            Self::Double(_) => "double",
            Self::Boolean(_) => "boolean",
            Self::Char(_) => "char",
            Self::Void => "void",
            Self::Object(_) => "object",
        }
    }

    pub fn borrowed(&self) -> HostValue<&O> {
        match self {
            Self::Byte(v) => HostValue::Byte(*v),
            Self::Short(v) => HostValue::Short(*v),
            Self::Int(v) => HostValue::Int(*v),
            Self::Long(v) => HostValue::Long(*v),
            Self::Float(v) => HostValue::Float(*v),
            Self::Double(v) => HostValue::Double(*v),
            Self::Boolean(v) => HostValue::Boolean(*v),
            Self::Char(v) => HostValue::Char(*v),
            Self::Void => HostValue::Void,
            Self::Object(o) => HostValue::Object(o),
        }
    }

    pub fn int(self) -> BridgeResult<i32> {
        match self {
            Self::Int(v) => Ok(v),
            other => Err(BridgeError::mismatch("int", other.kind_name())),
        }
    }

    pub fn object(self) -> BridgeResult<O> {
        match self {
            Self::Object(o) => Ok(o),
            other => Err(BridgeError::mismatch("object", other.kind_name())),
        }
    }
}

/// A value on the native side of the boundary
#[derive(Debug, Clone, PartialEq, PartialOrd, Default)]
pub enum NativeValue {
    /// Unsigned; host bytes below zero are rejected on the way in
    Byte(u8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Boolean(bool),
    Char(char),
    #[default]
    Void,
    Text(String),
}

impl NativeValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Byte(_) => ValueKind::Byte,
            Self::Short(_) => ValueKind::Short,
            Self::Int(_) => ValueKind::Int,
            Self::Long(_) => ValueKind::Long,
            Self::Float(_) => ValueKind::Float,
            Self::Double(_) => ValueKind::Double,
            Self::Boolean(_) => ValueKind::Boolean,
            Self::Char(_) => ValueKind::Char,
            Self::Void => ValueKind::Void,
            Self::Text(_) => ValueKind::Text,
        }
    }
}

impl From<&str> for NativeValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<i32> for NativeValue {
    fn from(value: i32) -> Self {
        Self::Int(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signatures() {
        assert_eq!(ValueKind::Int.signature(), "I");
        assert_eq!(ValueKind::Long.signature(), "J");
        assert_eq!(ValueKind::Text.signature(), "Ljava/lang/String;");
        assert_eq!(ValueKind::Int.array_signature(), Ok("[I"));
        assert_eq!(
            ValueKind::Int.boxed_array_signature().as_deref(),
            Ok("[Ljava/lang/Integer;")
        );
    }

    #[test]
    fn test_void_arrays_rejected() {
        assert_eq!(ValueKind::Void.array_signature(), Err(BridgeError::ArrayOfVoid));
        assert_eq!(
            ValueKind::Void.boxed_array_signature(),
            Err(BridgeError::ArrayOfVoid)
        );
    }

    #[test]
    fn test_native_kinds() {
        assert_eq!(NativeValue::from("x").kind(), ValueKind::Text);
        assert_eq!(NativeValue::from(3).kind(), ValueKind::Int);
        assert_eq!(NativeValue::default().kind(), ValueKind::Void);
    }
}
