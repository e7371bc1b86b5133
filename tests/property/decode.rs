//! Property-based tests for reply decoding and tag normalization

use devlog::decode::{decode_response, normalize_tags, MAX_TAGS, MIN_TAGS};
use proptest::prelude::*;
use serde_json::{json, Value};

fn fallback() -> Vec<String> {
    vec!["engineering".into(), "software".into(), "build-in-public".into()]
}

/// Tag lists always land within the allowed band
#[test]
fn test_normalized_tag_count_in_band() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&proptest::collection::vec("[a-z ]{0,12}", 0..12), |tags| {
            let raw = Value::Array(tags.iter().map(|t| json!(t)).collect());
            let normalized = normalize_tags(Some(&raw), &fallback());
            prop_assert!(normalized.len() >= MIN_TAGS);
            prop_assert!(normalized.len() <= MAX_TAGS);
            prop_assert!(normalized.iter().all(|t| !t.trim().is_empty()));
            Ok(())
        })
        .unwrap();
}

/// Fences and surrounding prose never change the decoded record
#[test]
fn test_wrapping_noise_is_ignored() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(
            &("[A-Za-z0-9 ]{1,40}", "[A-Za-z0-9 .]{1,80}", "[A-Za-z ]{0,30}"),
            |(title, content, prose)| {
                let clean = json!({"title": title, "content": content}).to_string();
                let expected = decode_response(&clean).unwrap();

                let fenced = format!("```json\n{}\n```", clean);
                prop_assert_eq!(decode_response(&fenced).unwrap(), expected.clone());

                let chatty = format!("{}\n{}\n{}", prose, clean, prose);
                prop_assert_eq!(decode_response(&chatty).unwrap(), expected);
                Ok(())
            },
        )
        .unwrap();
}
