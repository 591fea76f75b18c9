//! Marshalling tests against the in-memory host

use super::*;
use crate::errors::BridgeError;
use crate::host::{ClassDef, HostRuntime, MemoryHost, ObjRef};
use proptest::prelude::*;

const RUSTY: ClassDescriptor =
    ClassDescriptor::new("RustyClass", &[FieldDescriptor::new("message", FieldKind::Text)]);
const ENVELOPE: ClassDescriptor = ClassDescriptor::new("ResultOfArrayString", ENVELOPE_FIELDS);

fn host() -> MemoryHost {
    MemoryHost::with_fixture_classes()
}

// Text codec

#[test]
fn test_text_round_trip_outside_bmp() {
    let mut host = host();
    for text in ["", "plain", "ünïcödé", "a\0b", "😀 and 𝄞"] {
        let string = encode_text(&mut host, text).unwrap();
        assert_eq!(decode_text(&mut host, &string).unwrap(), text);
    }
}

#[test]
fn test_lone_surrogate_is_an_encoding_error() {
    let mut host = host();
    let string = host.new_string_from_units(&[0x41, 0xD800, 0x42]);
    assert!(matches!(
        decode_text(&mut host, &string),
        Err(BridgeError::Encoding(_))
    ));
}

#[test]
fn test_malformed_native_text_rejected() {
    let mut host = host();
    assert!(matches!(
        encode_utf8(&mut host, &[0x66, 0xFF, 0x6F]),
        Err(BridgeError::Encoding(_))
    ));
    assert!(matches!(
        encode_utf16(&mut host, &[0xDC00]),
        Err(BridgeError::Encoding(_))
    ));

    let ok = encode_utf16(&mut host, &[0xD83D, 0xDE00]).unwrap();
    assert_eq!(decode_text(&mut host, &ok).unwrap(), "😀");
}

#[test]
fn test_decode_text_rejects_non_strings() {
    let mut host = host();
    let boxed = encode_int(&mut host, 5).unwrap();
    assert!(matches!(
        decode_text(&mut host, &boxed),
        Err(BridgeError::TypeMismatch { .. })
    ));
    assert_eq!(
        decode_text(&mut host, &ObjRef::NULL),
        Err(BridgeError::NullHandle("string"))
    );
}

// Integers

#[test]
fn test_narrow_int() {
    assert_eq!(narrow_int(7usize), Ok(7));
    assert_eq!(narrow_int(-5i64), Ok(-5));
    assert!(matches!(
        narrow_int(3_000_000_000u64),
        Err(BridgeError::Range { .. })
    ));
    assert!(matches!(narrow_int(i64::MIN), Err(BridgeError::Range { .. })));
}

#[test]
fn test_boxed_int_round_trip() {
    let mut host = host();
    for value in [i32::MIN, -1, 0, 1, i32::MAX] {
        let boxed = encode_int(&mut host, value).unwrap();
        assert_eq!(decode_int(&mut host, &boxed).unwrap(), value);
    }

    let string = encode_text(&mut host, "5").unwrap();
    assert!(decode_int(&mut host, &string).is_err());
}

// Generic values

#[test]
fn test_lower_value_edge_cases() {
    let mut host = host();

    assert_eq!(
        lower_value(&mut host, HostValue::Boolean(2)),
        Ok(NativeValue::Boolean(true))
    );
    assert_eq!(
        lower_value(&mut host, HostValue::Byte(i8::MIN)),
        Err(BridgeError::NegativeByte(i8::MIN))
    );
    assert!(matches!(
        lower_value(&mut host, HostValue::Char(0xD800)),
        Err(BridgeError::Encoding(_))
    ));
    assert_eq!(
        lower_value(&mut host, HostValue::Object(&ObjRef::NULL)),
        Err(BridgeError::NullHandle("object"))
    );

    let boxed = encode_int(&mut host, 1).unwrap();
    assert!(matches!(
        lower_value(&mut host, HostValue::Object(&boxed)),
        Err(BridgeError::UnsupportedKind(_))
    ));
}

#[test]
fn test_lift_value() {
    let mut host = host();

    assert!(matches!(
        lift_value(&mut host, &NativeValue::Byte(200)),
        Err(BridgeError::Range { .. })
    ));
    assert!(matches!(
        lift_value(&mut host, &NativeValue::Char('😀')),
        Err(BridgeError::Range { .. })
    ));
    assert_eq!(
        lift_value(&mut host, &NativeValue::Char('é')),
        Ok(HostValue::Char(0xE9))
    );

    let lifted = lift_value(&mut host, &NativeValue::from("hi")).unwrap();
    let string = lifted.object().unwrap();
    assert_eq!(decode_text(&mut host, &string).unwrap(), "hi");
}

#[test]
fn test_lowered_values_lift_back() {
    let mut host = host();
    let values = [
        NativeValue::Byte(127),
        NativeValue::Short(-3),
        NativeValue::Long(1 << 40),
        NativeValue::Double(0.5),
        NativeValue::Boolean(false),
        NativeValue::Void,
    ];
    for value in values {
        let lifted = lift_value(&mut host, &value).unwrap();
        assert_eq!(lower_value(&mut host, lifted.borrowed()).unwrap(), value);
    }
}

// Arrays

#[test]
fn test_array_order_preserved() {
    let mut host = host();
    let text = Sequence::text(["ONE", "TWO", "THREE"]);
    let array = build_host_array(&mut host, &text).unwrap();

    assert_eq!(host.array_class_name(&array).unwrap(), "[Ljava/lang/String;");
    assert_eq!(host.array_length(&array).unwrap(), 3);
    let second = host.array_element(&array, 1).unwrap();
    assert_eq!(decode_text(&mut host, &second).unwrap(), "TWO");
    assert_eq!(read_host_array(&mut host, &array, ElementKind::Text).unwrap(), text);

    let ints = Sequence::ints([0, 1, 2]);
    let array = build_host_array(&mut host, &ints).unwrap();
    assert_eq!(host.array_class_name(&array).unwrap(), "[Ljava/lang/Integer;");
    assert_eq!(read_host_array(&mut host, &array, ElementKind::Int).unwrap(), ints);
}

#[test]
fn test_empty_array_is_real() {
    let mut host = host();
    let array = build_host_array(&mut host, &Sequence::empty(ElementKind::Int)).unwrap();
    assert!(!host.is_null(&array));
    assert_eq!(host.array_length(&array).unwrap(), 0);
    assert!(read_host_array(&mut host, &array, ElementKind::Int)
        .unwrap()
        .is_empty());
}

#[test]
fn test_array_elements_are_released() {
    let mut host = host();
    let array = build_host_array(&mut host, &Sequence::text(["ONE", "TWO", "THREE"])).unwrap();
    assert_eq!(host.released(), 3);

    read_host_array(&mut host, &array, ElementKind::Text).unwrap();
    assert_eq!(host.released(), 6);

    let ints = build_host_array(&mut host, &Sequence::ints(0..100)).unwrap();
    read_host_array(&mut host, &ints, ElementKind::Int).unwrap();
    assert_eq!(host.released(), 206);
}

#[test]
fn test_envelope_temporaries_are_released() {
    let mut host = host();
    let object = lift_envelope(&mut host, &ENVELOPE, &Envelope::success(["a", "b"])).unwrap();
    // Two element strings, then both field arrays once bound
    assert_eq!(host.released(), 4);

    read_envelope(&mut host, &ENVELOPE, &object).unwrap();
    // Both getter results and the two elements read from them
    assert_eq!(host.released(), 8);
}

#[test]
fn test_array_kind_mismatch() {
    let mut host = host();
    let array = build_host_array(&mut host, &Sequence::ints([1])).unwrap();
    assert!(matches!(
        read_host_array(&mut host, &array, ElementKind::Text),
        Err(BridgeError::TypeMismatch { .. })
    ));
    assert_eq!(
        read_host_array(&mut host, &ObjRef::NULL, ElementKind::Text),
        Err(BridgeError::NullHandle("array"))
    );
}

#[test]
fn test_sequence_from_values() {
    let seq = Sequence::from_values(ElementKind::Int, vec![NativeValue::Int(4), 5.into()]).unwrap();
    assert_eq!(seq.as_ints(), Some(&[4, 5][..]));

    let err = Sequence::from_values(ElementKind::Text, vec!["a".into(), NativeValue::Int(1)]);
    assert!(matches!(err, Err(BridgeError::TypeMismatch { .. })));
}

// Objects

#[test]
fn test_native_message_overrides_host_default() {
    let mut host = host();

    let host_built = host.new_instance("RustyClass").unwrap();
    assert_eq!(
        call_text_method(&mut host, &host_built, "getMessage").unwrap(),
        "FROM_KOTLIN"
    );

    let native = construct(
        &mut host,
        &RUSTY,
        &[("message", FieldValue::Text("RUSTY_JNI_CLASS".to_string()))],
    )
    .unwrap();
    assert_eq!(
        call_accessor(&mut host, &native, &RUSTY.fields[0]).unwrap(),
        FieldValue::Text("RUSTY_JNI_CLASS".to_string())
    );
}

#[test]
fn test_binding_errors_allocate_nothing() {
    let mut host = host();
    let before = host.live_objects();

    let unknown = construct(&mut host, &RUSTY, &[("mesage", FieldValue::Int(1))]);
    assert!(matches!(unknown, Err(BridgeError::FieldBinding { .. })));

    let wrong_kind = construct(&mut host, &RUSTY, &[("message", FieldValue::Int(1))]);
    assert!(matches!(wrong_kind, Err(BridgeError::FieldBinding { .. })));

    assert_eq!(host.live_objects(), before);
}

#[test]
fn test_host_class_without_the_field() {
    const BARE: ClassDescriptor =
        ClassDescriptor::new("Bare", &[FieldDescriptor::new("message", FieldKind::Text)]);

    let mut host = host();
    host.declare(ClassDef::new("Bare"));

    let err = construct(&mut host, &BARE, &[("message", FieldValue::Text("x".to_string()))]);
    match err {
        Err(BridgeError::FieldBinding { class, field, .. }) => {
            assert_eq!(class, "Bare");
            assert_eq!(field, "message");
        }
        other => panic!("expected a field binding error, got {:?}", other),
    }
}

#[test]
fn test_classes_resolve_once() {
    let mut host = host();
    for _ in 0..3 {
        construct(&mut host, &RUSTY, &[]).unwrap();
    }
    assert_eq!(host.class_lookups(), 1);
    assert!(host.class_cache().is_resolved("RustyClass"));
    assert_eq!(host.class_cache().resolved(), 1);
}

#[test]
fn test_failed_resolution_is_not_cached() {
    let mut host = MemoryHost::new();

    assert!(matches!(
        construct(&mut host, &RUSTY, &[]),
        Err(BridgeError::ClassResolution { .. })
    ));
    assert!(!host.class_cache().is_resolved("RustyClass"));

    host.declare(ClassDef::new("RustyClass").field("message", "Ljava/lang/String;"));
    assert!(construct(&mut host, &RUSTY, &[]).is_ok());
    assert_eq!(host.class_lookups(), 2);
}

#[test]
fn test_class_cache_initializes_once_across_threads() {
    use std::sync::atomic::{AtomicUsize, Ordering};

    let cache: ClassCache<usize> = ClassCache::new();
    let lookups = AtomicUsize::new(0);

    let seen: Vec<usize> = std::thread::scope(|scope| {
        let workers: Vec<_> = (0..8)
            .map(|_| {
                scope.spawn(|| {
                    let cell = cache.cell("RustyClass");
                    *cell
                        .get_or_try_init(|| {
                            std::thread::yield_now();
                            Ok::<usize, BridgeError>(40 + lookups.fetch_add(1, Ordering::SeqCst))
                        })
                        .unwrap()
                })
            })
            .collect();
        workers.into_iter().map(|worker| worker.join().unwrap()).collect()
    });

    assert_eq!(lookups.load(Ordering::SeqCst), 1);
    assert!(seen.iter().all(|&class| class == 40));
    assert_eq!(cache.resolved(), 1);
}

#[test]
fn test_accessor_names() {
    assert_eq!(SUCCESS_FIELD.accessor(), "getSuccessData");
    assert_eq!(FieldDescriptor::new("message", FieldKind::Text).accessor(), "getMessage");
}

// Envelopes

#[test]
fn test_envelope_lifts_and_reads_back() {
    let mut host = host();
    let failure = Envelope::failure(["disk on fire"]);
    let object = lift_envelope(&mut host, &ENVELOPE, &failure).unwrap();
    assert_eq!(read_envelope(&mut host, &ENVELOPE, &object).unwrap(), failure);
}

#[test]
fn test_host_envelope_with_both_sides_is_a_violation() {
    let mut host = host();
    let object = construct(
        &mut host,
        &ENVELOPE,
        &[
            ("successData", FieldValue::Sequence(Sequence::text(["a"]))),
            ("failureData", FieldValue::Sequence(Sequence::text(["b"]))),
        ],
    )
    .unwrap();

    assert_eq!(
        read_envelope(&mut host, &ENVELOPE, &object),
        Err(BridgeError::EnvelopeViolation {
            class: "ResultOfArrayString".to_string()
        })
    );
}

#[test]
fn test_unset_envelope_field_is_null() {
    let mut host = host();
    let object = construct(
        &mut host,
        &ENVELOPE,
        &[("successData", FieldValue::Sequence(Sequence::text(["a"])))],
    )
    .unwrap();

    assert_eq!(
        read_envelope(&mut host, &ENVELOPE, &object),
        Err(BridgeError::NullHandle("array"))
    );
}

proptest! {
    #[test]
    fn prop_text_arrays_keep_order(items in proptest::collection::vec(any::<String>(), 0..16)) {
        let mut host = host();
        let seq = Sequence::Text(items);
        let array = build_host_array(&mut host, &seq).unwrap();
        prop_assert_eq!(read_host_array(&mut host, &array, ElementKind::Text).unwrap(), seq);
    }

    #[test]
    fn prop_int_arrays_keep_order(items in proptest::collection::vec(any::<i32>(), 0..32)) {
        let mut host = host();
        let seq = Sequence::Int(items);
        let array = build_host_array(&mut host, &seq).unwrap();
        prop_assert_eq!(read_host_array(&mut host, &array, ElementKind::Int).unwrap(), seq);
    }

    #[test]
    fn prop_envelopes_are_exclusive(
        outcome in prop_oneof![
            proptest::collection::vec(".*", 0..8).prop_map(Ok::<Vec<String>, String>),
            ".*".prop_map(Err::<Vec<String>, String>),
        ]
    ) {
        let mut host = host();
        let envelope = Envelope::from_result(outcome);
        prop_assert!(envelope.success_data().is_empty() || envelope.failure_data().is_empty());

        let object = lift_envelope(&mut host, &ENVELOPE, &envelope).unwrap();
        let read = read_envelope(&mut host, &ENVELOPE, &object).unwrap();
        prop_assert_eq!(read, envelope);
    }
}
