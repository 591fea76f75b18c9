//! Primitive codec - native text and integers ↔ host primitives
//!
//! Design: strict in both directions. Nothing is ever substituted with a
//! replacement character; malformed text is an error.

use super::value::{HostValue, NativeValue, ValueKind};
use crate::errors::{BridgeError, BridgeResult};
use crate::host::HostRuntime;
use std::fmt::Display;

/// Lift native text into a host string
pub fn encode_text<H: HostRuntime>(host: &mut H, text: &str) -> BridgeResult<H::Object> {
    host.new_string(text)
}

/// Lift raw bytes that are supposed to be UTF-8
pub fn encode_utf8<H: HostRuntime>(host: &mut H, bytes: &[u8]) -> BridgeResult<H::Object> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| BridgeError::Encoding(format!("native text is not UTF-8: {}", e)))?;
    encode_text(host, text)
}

/// Lift UTF-16 code units. Unpaired surrogates are rejected.
pub fn encode_utf16<H: HostRuntime>(host: &mut H, units: &[u16]) -> BridgeResult<H::Object> {
    let text = String::from_utf16(units)
        .map_err(|_| BridgeError::Encoding("text holds an unpaired surrogate".to_string()))?;
    encode_text(host, &text)
}

/// Lower a host string into native text
pub fn decode_text<H: HostRuntime>(host: &mut H, string: &H::Object) -> BridgeResult<String> {
    if host.is_null(string) {
        return Err(BridgeError::NullHandle("string"));
    }
    if !host.is_instance_of(string, ValueKind::Text.class_name())? {
        return Err(BridgeError::mismatch(ValueKind::Text.class_name(), "non-string object"));
    }

    let bytes = host.string_bytes(string)?;
    cesu8::from_java_cesu8(&bytes)
        .map(|text| text.into_owned())
        .map_err(|_| {
            BridgeError::Encoding(
                "host string holds an unpaired surrogate or malformed modified UTF-8".to_string(),
            )
        })
}

/// Narrow a native integer to the 32-bit width used at the boundary
pub fn narrow_int<T>(value: T) -> BridgeResult<i32>
where
    T: TryInto<i32> + Display + Copy,
{
    value
        .try_into()
        .map_err(|_| BridgeError::range(value, "i32"))
}

/// Lift an integer into a boxed host `Integer`
pub fn encode_int<H: HostRuntime>(host: &mut H, value: i32) -> BridgeResult<H::Object> {
    host.box_int(value)
}

/// Lower a boxed host `Integer`
pub fn decode_int<H: HostRuntime>(host: &mut H, boxed: &H::Object) -> BridgeResult<i32> {
    if host.is_null(boxed) {
        return Err(BridgeError::NullHandle("integer"));
    }
    if !host.is_instance_of(boxed, ValueKind::Int.class_name())? {
        return Err(BridgeError::mismatch(ValueKind::Int.class_name(), "non-integer object"));
    }
    host.call_method(boxed, "intValue", "()I", &[])?.int()
}

/// Lower any JNI-shaped value
pub fn lower_value<H: HostRuntime>(
    host: &mut H,
    value: HostValue<&H::Object>,
) -> BridgeResult<NativeValue> {
    let outcome = match value {
        HostValue::Byte(byte) => {
            if byte < 0 {
                return Err(BridgeError::NegativeByte(byte));
            }
            NativeValue::Byte(byte as u8)
        }
        HostValue::Short(v) => NativeValue::Short(v),
        HostValue::Int(v) => NativeValue::Int(v),
        HostValue::Long(v) => NativeValue::Long(v),
        HostValue::Float(v) => NativeValue::Float(v),
        HostValue::Double(v) => NativeValue::Double(v),
        HostValue::Boolean(v) => NativeValue::Boolean(v != 0),
        HostValue::Char(unit) => match char::from_u32(u32::from(unit)) {
            Some(c) => NativeValue::Char(c),
            None => {
                return Err(BridgeError::Encoding(format!(
                    "char {:#06x} is an unpaired surrogate",
                    unit
                )))
            }
        },
        HostValue::Void => NativeValue::Void,
        HostValue::Object(object) => {
            if host.is_null(object) {
                return Err(BridgeError::NullHandle("object"));
            }
            if !host.is_instance_of(object, ValueKind::Text.class_name())? {
                return Err(BridgeError::UnsupportedKind(
                    "object that is not a java/lang/String".to_string(),
                ));
            }
            NativeValue::Text(decode_text(host, object)?)
        }
    };

    Ok(outcome)
}

/// Lift a native value into its JNI shape
pub fn lift_value<H: HostRuntime>(
    host: &mut H,
    value: &NativeValue,
) -> BridgeResult<HostValue<H::Object>> {
    let outcome = match value {
        NativeValue::Byte(byte) => {
            HostValue::Byte(i8::try_from(*byte).map_err(|_| BridgeError::range(byte, "i8"))?)
        }
        NativeValue::Short(v) => HostValue::Short(*v),
        NativeValue::Int(v) => HostValue::Int(*v),
        NativeValue::Long(v) => HostValue::Long(*v),
        NativeValue::Float(v) => HostValue::Float(*v),
        NativeValue::Double(v) => HostValue::Double(*v),
        NativeValue::Boolean(v) => HostValue::Boolean(u8::from(*v)),
        NativeValue::Char(c) => {
            let unit = u16::try_from(u32::from(*c))
                .map_err(|_| BridgeError::range(format!("{:?}", c), "a single UTF-16 unit"))?;
            HostValue::Char(unit)
        }
        NativeValue::Void => HostValue::Void,
        NativeValue::Text(text) => HostValue::Object(encode_text(host, text)?),
    };

    Ok(outcome)
}
