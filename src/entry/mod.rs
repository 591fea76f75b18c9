//! Entry point registry - the call surface declared by the host
//!
//! Every entry point is a plain generic function over
//! [`HostRuntime`]; `exports.rs` binds each one to its JNI symbol and
//! `boundary.rs` keeps native faults from crossing into the host.

mod assertions;
mod boundary;
mod dir_reader;
mod exports;

pub use assertions::native_assertions;
pub use boundary::{run_entry, run_guarded, Fatal};
pub use dir_reader::{read_dir_envelope, read_entries};

use crate::errors::BridgeResult;
use crate::host::HostRuntime;
use crate::marshal::{
    build_host_array, construct, encode_text, lift_envelope, ClassDescriptor, ElementKind,
    Envelope, FieldDescriptor, FieldKind, FieldValue, Sequence, ENVELOPE_FIELDS, SUCCESS_FIELD,
};
use std::path::Path;

/// Kotlin file facade that declares the externals (`@file:JvmName`)
pub const HOST_CLASS: &str = "RustLibrary";

pub const RUSTY_MESSAGE: &str = "RUSTY_JNI_CLASS";
pub const TEXT_FIXTURE: [&str; 3] = ["ONE", "TWO", "THREE"];
pub const INT_FIXTURE: [i32; 3] = [0, 1, 2];
pub const DEBUG_OK: &str = "DEBUG_TRUE";

pub const RUSTY_CLASS: ClassDescriptor =
    ClassDescriptor::new("RustyClass", &[FieldDescriptor::new("message", FieldKind::Text)]);
pub const RESULT_OF_ARRAY_STRING: ClassDescriptor =
    ClassDescriptor::new("ResultOfArrayString", ENVELOPE_FIELDS);
pub const DIR_READER_WITH_RESULT: ClassDescriptor =
    ClassDescriptor::new("DirReaderWithResult", ENVELOPE_FIELDS);

/// Every class the native side instantiates
pub const CLASSES: &[ClassDescriptor] = &[RUSTY_CLASS, RESULT_OF_ARRAY_STRING, DIR_READER_WITH_RESULT];

/// What an entry point hands back to the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnShape {
    Unit,
    Text,
    TextArray,
    IntArray,
    Object(&'static ClassDescriptor),
}

impl ReturnShape {
    /// Return type as written in the Kotlin declaration
    pub fn kotlin_type(self) -> Option<&'static str> {
        match self {
            Self::Unit => None,
            Self::Text => Some("String"),
            Self::TextArray => Some("Array<String>"),
            Self::IntArray => Some("Array<Int>"),
            Self::Object(class) => Some(class.name),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryPoint {
    pub name: &'static str,
    pub returns: ReturnShape,
}

impl EntryPoint {
    /// Exported symbol, `Java_<class>_<method>` with JNI escaping
    pub fn symbol(&self) -> String {
        format!("Java_{}_{}", mangle(HOST_CLASS), mangle(self.name))
    }
}

/// JNI short-name escaping
fn mangle(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        match c {
            '/' | '.' => out.push('_'),
            '_' => out.push_str("_1"),
            ';' => out.push_str("_2"),
            '[' => out.push_str("_3"),
            c if c.is_ascii_alphanumeric() => out.push(c),
            c => {
                let mut units = [0u16; 2];
                for unit in c.encode_utf16(&mut units) {
                    out.push_str(&format!("_0{:04x}", unit));
                }
            }
        }
    }
    out
}

pub const ENTRY_POINTS: &[EntryPoint] = &[
    EntryPoint { name: "nativeAssertions", returns: ReturnShape::Unit },
    EntryPoint { name: "rustyClass", returns: ReturnShape::Object(&RUSTY_CLASS) },
    EntryPoint { name: "rustyArray", returns: ReturnShape::TextArray },
    EntryPoint { name: "rustyArrayInts", returns: ReturnShape::IntArray },
    EntryPoint { name: "resultOfArrayString", returns: ReturnShape::Object(&RESULT_OF_ARRAY_STRING) },
    EntryPoint { name: "dirReaderWithResult", returns: ReturnShape::Object(&DIR_READER_WITH_RESULT) },
    EntryPoint { name: "sillyDebugger", returns: ReturnShape::Text },
];

pub fn entry_point(name: &str) -> Option<&'static EntryPoint> {
    ENTRY_POINTS.iter().find(|entry| entry.name == name)
}

pub fn rusty_class<H: HostRuntime>(host: &mut H) -> BridgeResult<H::Object> {
    construct(
        host,
        &RUSTY_CLASS,
        &[("message", FieldValue::Text(RUSTY_MESSAGE.to_string()))],
    )
}

pub fn rusty_array<H: HostRuntime>(host: &mut H) -> BridgeResult<H::Object> {
    build_host_array(host, &Sequence::text(TEXT_FIXTURE))
}

pub fn rusty_array_ints<H: HostRuntime>(host: &mut H) -> BridgeResult<H::Object> {
    build_host_array(host, &Sequence::ints(INT_FIXTURE))
}

pub fn result_of_array_string<H: HostRuntime>(host: &mut H) -> BridgeResult<H::Object> {
    lift_envelope(host, &RESULT_OF_ARRAY_STRING, &Envelope::success(TEXT_FIXTURE))
}

/// Read failures land in the envelope; only binding errors propagate
pub fn dir_reader_with_result<H: HostRuntime>(host: &mut H, path: &Path) -> BridgeResult<H::Object> {
    let envelope = read_dir_envelope(path);
    lift_envelope(host, &DIR_READER_WITH_RESULT, &envelope)
}

/// Try a field binding and report how it went
pub fn silly_debugger<H: HostRuntime>(host: &mut H) -> BridgeResult<H::Object> {
    let attempt = construct(
        host,
        &RESULT_OF_ARRAY_STRING,
        &[(
            SUCCESS_FIELD.name,
            FieldValue::Sequence(Sequence::empty(ElementKind::Text)),
        )],
    );

    let report = match attempt {
        Ok(object) => {
            host.release(object);
            DEBUG_OK.to_string()
        }
        Err(error) => error.to_string(),
    };
    encode_text(host, &report)
}
