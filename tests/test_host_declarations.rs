//! The Kotlin externals and the native registry must agree on names and
//! return types; nothing checks this at runtime.

use rusty_jni::entry::{CLASSES, HOST_CLASS};
use rusty_jni::ENTRY_POINTS;
use std::collections::BTreeMap;

const RUST_KT: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/host/kotlin/Rust.kt"));

/// `external fun name(): Type` -> (name, Some(Type))
fn declared_externals(source: &str) -> BTreeMap<String, Option<String>> {
    source
        .lines()
        .filter_map(|line| line.trim().strip_prefix("external fun "))
        .map(|rest| {
            let (name, tail) = rest.split_once("()").expect("externals take no arguments");
            let returns = tail
                .trim()
                .strip_prefix(':')
                .map(|ty| ty.trim().to_string());
            (name.trim().to_string(), returns)
        })
        .collect()
}

#[test]
fn test_facade_name_matches() {
    assert!(RUST_KT.contains(&format!("@file:JvmName(\"{}\")", HOST_CLASS)));
}

#[test]
fn test_every_external_is_registered() {
    let declared = declared_externals(RUST_KT);
    assert_eq!(declared.len(), ENTRY_POINTS.len());

    for entry in ENTRY_POINTS {
        let returns = declared
            .get(entry.name)
            .unwrap_or_else(|| panic!("{} is not declared in Rust.kt", entry.name));
        assert_eq!(
            returns.as_deref(),
            entry.returns.kotlin_type(),
            "return type of {}",
            entry.name
        );
    }
}

#[test]
fn test_instantiated_classes_are_declared() {
    for class in CLASSES {
        assert!(
            RUST_KT.contains(&format!("class {}", class.name)),
            "{} is not declared in Rust.kt",
            class.name
        );
        for field in class.fields {
            assert!(
                RUST_KT.contains(field.name),
                "{}.{} is not declared in Rust.kt",
                class.name,
                field.name
            );
        }
    }
}
