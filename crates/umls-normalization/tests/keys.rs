//! Tests for lookup-key generation.

use std::collections::BTreeSet;

use proptest::prelude::*;
use umls_model::{KeyKind, Mention};
use umls_normalization::{KeyGenerator, Vocabulary, canonicalize, normalize};

fn kinds_and_keys(mention: &str) -> Vec<(KeyKind, String)> {
    KeyGenerator::default()
        .build_keys(&Mention::untyped(mention))
        .keys
        .into_iter()
        .map(|k| (k.kind, k.key))
        .collect()
}

#[test]
fn pleural_effusion_head_candidates() {
    let generator = KeyGenerator::default();
    let heads: BTreeSet<String> = generator
        .head_candidates("small left pleural effusion")
        .into_iter()
        .collect();
    let expected: BTreeSet<String> = ["effusion", "pleural effusion"]
        .into_iter()
        .map(String::from)
        .collect();
    assert_eq!(heads, expected);
}

#[test]
fn keys_are_ordered_by_kind() {
    assert_eq!(
        kinds_and_keys("Right-sided effusion"),
        vec![
            (KeyKind::FullNorm, "right-sided effusion".to_string()),
            (KeyKind::FullCan, "right sided effusion".to_string()),
            (KeyKind::Head, "sided effusion".to_string()),
            (KeyKind::Head, "effusion".to_string()),
        ]
    );
}

#[test]
fn duplicate_key_keeps_first_kind() {
    // normalized == canonical == the single head window
    assert_eq!(
        kinds_and_keys("Pneumonia"),
        vec![(KeyKind::FullNorm, "pneumonia".to_string())]
    );
}

#[test]
fn measurement_flag_uses_canonical_form() {
    let generator = KeyGenerator::default();
    for text in ["3.5 cm", "10mm", "2 m"] {
        let keys = generator.build_keys(&Mention::untyped(text));
        assert!(keys.is_measurement, "{text} should be measurement-like");
    }
    let keys = generator.build_keys(&Mention::untyped("consolidation"));
    assert!(!keys.is_measurement);
}

#[test]
fn empty_mention_has_no_keys() {
    let keys = KeyGenerator::default().build_keys(&Mention::untyped("???"));
    assert_eq!(keys.normalized, "");
    assert_eq!(keys.canonical, "");
    assert!(keys.keys.is_empty());
}

#[test]
fn type_hints_are_sorted() {
    let keys = KeyGenerator::default().build_keys(&Mention::new("lungs", ["OBS-DP", "ANAT-DP"]));
    assert_eq!(keys.type_hints, vec!["ANAT-DP", "OBS-DP"]);
}

#[test]
fn custom_vocabulary_is_respected() {
    let vocabulary = Vocabulary::new(["of"], Vec::<String>::new(), ["subtle"]);
    let generator = KeyGenerator::new(vocabulary);
    assert_eq!(
        generator.head_candidates("subtle left opacity"),
        vec!["left opacity", "opacity"]
    );
}

proptest! {
    #[test]
    fn keys_are_unique_and_non_empty(text in "[A-Za-z0-9 ./()-]{0,40}") {
        let keys = KeyGenerator::default().build_keys(&Mention::untyped(text));
        let mut seen = BTreeSet::new();
        for key in &keys.keys {
            prop_assert!(!key.key.is_empty());
            prop_assert!(seen.insert(key.key.clone()));
        }
    }

    #[test]
    fn canonical_form_is_a_fixed_point(text in "\\PC{0,40}") {
        let once = canonicalize(&text);
        prop_assert_eq!(canonicalize(&once), once.clone());
        prop_assert!(!once.starts_with(' ') && !once.ends_with(' '));
        prop_assert!(!once.contains("  "));
    }

    #[test]
    fn normalized_form_has_restricted_alphabet(text in "\\PC{0,40}") {
        let normalized = normalize(&text);
        prop_assert!(normalized.chars().all(|c| c.is_ascii_lowercase()
            || c.is_ascii_digit()
            || c.is_whitespace()
            || c == '-'));
    }
}
