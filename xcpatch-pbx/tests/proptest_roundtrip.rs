//! Property-based tests for the pbxproj writer/parser pair.
//!
//! Key invariant: for any value tree the writer can emit,
//! `parse(write(tree)) == tree`.

use proptest::prelude::*;
use xcpatch_pbx::{parse_document, write_document, PbxDict, PbxString, PbxValue};

/// Strings covering bare tokens, quoted tokens, escapes, and shell-script
/// style payloads.
fn arb_string_value() -> impl Strategy<Value = String> {
    prop_oneof![
        prop::string::string_regex(r"[A-Za-z0-9_$./]{1,16}").unwrap(),
        prop::string::string_regex(r#"[A-Za-z0-9 @()$/="'.-]{0,24}"#).unwrap(),
        prop::string::string_regex(r"[a-z]{1,6}(\n[a-z ]{1,10}){0,3}").unwrap(),
        Just("$(inherited) @executable_path/Frameworks".to_string()),
        Just("//starts/like/a/comment".to_string()),
        Just(String::new()),
    ]
}

fn arb_annotation() -> impl Strategy<Value = Option<String>> {
    prop_oneof![
        Just(None),
        // No leading/trailing space: the parser trims annotation text.
        prop::string::string_regex(r"[A-Za-z0-9]([A-Za-z0-9 ._-]{0,18}[A-Za-z0-9._-])?")
            .unwrap()
            .prop_map(Some),
    ]
}

fn arb_key() -> impl Strategy<Value = PbxString> {
    (
        prop::string::string_regex(r"[A-Za-z0-9_]{1,16}").unwrap(),
        arb_annotation(),
    )
        .prop_map(|(value, annotation)| PbxString { value, annotation })
}

fn arb_value() -> impl Strategy<Value = PbxValue> {
    let leaf = (arb_string_value(), arb_annotation())
        .prop_map(|(value, annotation)| PbxValue::String(PbxString { value, annotation }));

    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(PbxValue::Array),
            prop::collection::vec((arb_key(), inner), 0..4).prop_map(|entries| {
                let mut dict = PbxDict::new();
                for (key, value) in entries {
                    // Duplicate keys collapse on insert; keep the tree a map.
                    if !dict.contains_key(&key.value) {
                        match key.annotation {
                            Some(ann) => dict.insert_annotated(key.value, ann, value),
                            None => dict.insert(key.value, value),
                        }
                    }
                }
                PbxValue::Dict(dict)
            }),
        ]
    })
}

proptest! {
    #[test]
    fn write_then_parse_is_identity(tree in arb_value()) {
        let written = write_document(&tree);
        let reparsed = parse_document(&written).expect("writer output must parse");
        prop_assert_eq!(tree, reparsed);
    }

    #[test]
    fn writer_output_is_stable(tree in arb_value()) {
        let once = write_document(&tree);
        let twice = write_document(&parse_document(&once).unwrap());
        prop_assert_eq!(once, twice);
    }
}
