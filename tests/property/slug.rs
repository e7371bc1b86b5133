//! Property-based tests for slug generation

use devlog::document::{slugify, FALLBACK_SLUG, SLUG_MAX_LEN};
use proptest::prelude::*;

fn is_well_formed(slug: &str) -> bool {
    !slug.is_empty()
        && slug.len() <= SLUG_MAX_LEN
        && !slug.starts_with('-')
        && !slug.ends_with('-')
        && !slug.contains("--")
        && slug
            .chars()
            .all(|c| c == '-' || c.is_ascii_lowercase() || c.is_ascii_digit())
}

/// Any input yields a non-empty, lowercase, hyphen-delimited, bounded slug
#[test]
fn test_slug_is_total_and_well_formed() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&any::<String>(), |title| {
            let slug = slugify(&title);
            prop_assert!(is_well_formed(&slug), "bad slug {:?} for {:?}", slug, title);
            Ok(())
        })
        .unwrap();
}

/// Same title, same slug
#[test]
fn test_slug_is_deterministic() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&"[ -~]{0,200}", |title| {
            prop_assert_eq!(slugify(&title), slugify(&title));
            Ok(())
        })
        .unwrap();
}

/// Punctuation-only titles fall back to the placeholder
#[test]
fn test_punctuation_only_titles_fall_back() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&"[!-/:-@\\[-`{-~ ]{0,40}", |title| {
            prop_assert_eq!(slugify(&title), FALLBACK_SLUG);
            Ok(())
        })
        .unwrap();
}

proptest! {
    /// Slugs of already-clean slugs are unchanged
    #[test]
    fn slug_is_idempotent(title in "[A-Za-z0-9 ,.!?'-]{0,120}") {
        let once = slugify(&title);
        prop_assert_eq!(slugify(&once), once.clone());
    }
}
