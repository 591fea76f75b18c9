//! Native self-checks run against the live host
//!
//! Any mismatch is an `Assertion` error, which the boundary turns into a
//! process abort.

use super::{RESULT_OF_ARRAY_STRING, INT_FIXTURE, TEXT_FIXTURE};
use crate::errors::{BridgeError, BridgeResult};
use crate::host::HostRuntime;
use crate::marshal::{
    build_host_array, decode_text, encode_text, lift_envelope, lower_value, narrow_int,
    read_envelope, read_host_array, ElementKind, Envelope, HostValue, NativeValue, Sequence,
};
use std::fmt::Debug;
use tracing::debug;

const SAMPLE_TEXT: &str = "MY_TEST_STRING ünïcödé 😀";

fn ensure_eq<T: PartialEq + Debug>(label: &str, left: T, right: T) -> BridgeResult<()> {
    if left == right {
        Ok(())
    } else {
        Err(BridgeError::Assertion(format!(
            "{}: left {:?}, right {:?}",
            label, left, right
        )))
    }
}

pub fn native_assertions<H: HostRuntime>(host: &mut H) -> BridgeResult<()> {
    check_value_lowering(host)?;
    check_text_round_trip(host)?;
    check_arrays(host)?;
    check_envelope(host)?;
    debug!("Native assertions passed");
    Ok(())
}

fn check_value_lowering<H: HostRuntime>(host: &mut H) -> BridgeResult<()> {
    let cases: [(HostValue<&H::Object>, NativeValue); 9] = [
        (HostValue::Byte(4), NativeValue::Byte(4)),
        (HostValue::Short(50), NativeValue::Short(50)),
        (HostValue::Int(50), NativeValue::Int(50)),
        (HostValue::Long(50), NativeValue::Long(50)),
        (HostValue::Float(504.99), NativeValue::Float(504.99)),
        (HostValue::Double(504.99), NativeValue::Double(504.99)),
        (HostValue::Boolean(1), NativeValue::Boolean(true)),
        (HostValue::Char(0x41), NativeValue::Char('A')),
        (HostValue::Void, NativeValue::Void),
    ];
    for (input, expected) in cases {
        let label = format!("lower {}", input.kind_name());
        ensure_eq(&label, lower_value(host, input), Ok(expected))?;
    }

    ensure_eq(
        "lower negative byte",
        lower_value(host, HostValue::Byte(-4)),
        Err(BridgeError::NegativeByte(-4)),
    )?;

    let string = encode_text(host, "MY_TEST_STRING")?;
    ensure_eq(
        "lower string object",
        lower_value(host, HostValue::Object(&string)),
        Ok(NativeValue::Text("MY_TEST_STRING".to_string())),
    )?;

    ensure_eq(
        "narrow oversized integer",
        narrow_int(i64::MAX).is_err(),
        true,
    )
}

fn check_text_round_trip<H: HostRuntime>(host: &mut H) -> BridgeResult<()> {
    let string = encode_text(host, SAMPLE_TEXT)?;
    ensure_eq("text round trip", decode_text(host, &string)?.as_str(), SAMPLE_TEXT)
}

fn check_arrays<H: HostRuntime>(host: &mut H) -> BridgeResult<()> {
    let text = Sequence::text(TEXT_FIXTURE);
    let array = build_host_array(host, &text)?;
    ensure_eq(
        "text array round trip",
        read_host_array(host, &array, ElementKind::Text)?,
        text,
    )?;

    let ints = Sequence::ints(INT_FIXTURE);
    let int_array = build_host_array(host, &ints)?;
    ensure_eq(
        "int array round trip",
        read_host_array(host, &int_array, ElementKind::Int)?,
        ints,
    )?;

    let empty = build_host_array(host, &Sequence::empty(ElementKind::Text))?;
    ensure_eq("empty array is not null", host.is_null(&empty), false)?;
    ensure_eq("empty array length", host.array_length(&empty)?, 0)?;

    let misread = read_host_array(host, &array, ElementKind::Int);
    ensure_eq(
        "element kind mismatch rejected",
        matches!(misread, Err(BridgeError::TypeMismatch { .. })),
        true,
    )
}

fn check_envelope<H: HostRuntime>(host: &mut H) -> BridgeResult<()> {
    let envelope = Envelope::success(TEXT_FIXTURE);
    let object = lift_envelope(host, &RESULT_OF_ARRAY_STRING, &envelope)?;
    let read = read_envelope(host, &RESULT_OF_ARRAY_STRING, &object)?;
    ensure_eq("envelope round trip", &read, &envelope)?;
    ensure_eq(
        "envelope exclusivity",
        read.success_data().is_empty() || read.failure_data().is_empty(),
        true,
    )
}
