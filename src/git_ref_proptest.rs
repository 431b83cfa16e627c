//! Property-based tests for git reference handling.
//!
//! These tests use proptest to generate random reference names and verify
//! that the canonical and short renderings stay consistent.

#[cfg(test)]
mod proptest_tests {
    use crate::git_ref::GitRef;
    use proptest::prelude::*;

    fn name_strategy() -> impl Strategy<Value = String> {
        "[a-zA-Z0-9_][a-zA-Z0-9_./-]{0,30}[a-zA-Z0-9_]"
            .prop_filter("no '..' sequences", |s| !s.contains(".."))
            .prop_filter("no refs/ prefix", |s| !s.starts_with("refs/"))
            .prop_filter("no .lock suffix", |s| !s.ends_with(".lock"))
    }

    fn ref_strategy() -> impl Strategy<Value = GitRef> {
        prop_oneof![
            name_strategy().prop_map(|n| GitRef::branch(n).unwrap()),
            name_strategy().prop_map(|n| GitRef::tag(n).unwrap()),
            "[0-9a-f]{40}".prop_map(|s| GitRef::commit(s).unwrap()),
        ]
    }

    proptest! {
        /// Property: short(canonical(ref)) == short(ref)
        #[test]
        fn canonical_round_trips_short_form(r in ref_strategy()) {
            let parsed = GitRef::from_canonical(&r.canonical()).unwrap();
            prop_assert_eq!(parsed.short(), r.short());
        }

        /// Property: parsing the canonical form yields the same variant
        #[test]
        fn canonical_preserves_kind(r in ref_strategy()) {
            let parsed = GitRef::from_canonical(&r.canonical()).unwrap();
            prop_assert_eq!(parsed.kind(), r.kind());
            prop_assert_eq!(parsed, r);
        }

        /// Property: exactly one of branch/tag/commit is set
        #[test]
        fn exactly_one_variant(r in ref_strategy()) {
            let flags = [
                matches!(r, GitRef::Branch(_)),
                matches!(r, GitRef::Tag(_)),
                matches!(r, GitRef::Commit(_)),
            ];
            prop_assert_eq!(flags.iter().filter(|f| **f).count(), 1);
        }

        /// Property: names containing whitespace are always rejected
        #[test]
        fn whitespace_names_rejected(prefix in "[a-z]{1,5}", suffix in "[a-z]{1,5}") {
            let name = format!("{} {}", prefix, suffix);
            prop_assert!(GitRef::branch(name.clone()).is_err());
            prop_assert!(GitRef::tag(name).is_err());
        }
    }
}
