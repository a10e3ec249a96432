//! Property-based tests for atelier_core.
//!
//! Invariants of the data model and the session store that must hold for any
//! input, not just the hand-picked cases in the unit tests.

use atelier_core::{ConversationKey, FilterSpec, FilterType, PersonaKey, SessionStore};
use proptest::prelude::*;
use std::sync::Arc;

fn arb_filter_type() -> impl Strategy<Value = FilterType> {
    prop_oneof![
        Just(FilterType::Material),
        Just(FilterType::Store),
        Just(FilterType::Sustainable),
        Just(FilterType::Unknown),
    ]
}

proptest! {
    /// An unknown filter never carries a value, whatever was passed in.
    #[test]
    fn filter_unknown_implies_empty_value(t in arb_filter_type(), v in "\\PC{0,40}") {
        let spec = FilterSpec::new(t, v);
        if spec.filter_type == FilterType::Unknown {
            prop_assert_eq!(spec.value.as_str(), "");
        } else {
            prop_assert!(!spec.value.is_empty());
        }
    }

    /// Parsing arbitrary text either yields a known key or an error; never panics.
    #[test]
    fn persona_parse_never_panics(s in "\\PC{0,60}") {
        if let Ok(key) = s.parse::<PersonaKey>() {
            prop_assert!(PersonaKey::ALL.contains(&key));
        }
    }

    /// get_or_create returns the same session identity for repeated keys.
    #[test]
    fn session_store_is_idempotent(
        user in "[a-z0-9]{1,8}",
        session in "[a-z0-9]{1,8}",
        repeats in 2usize..6,
    ) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();
        rt.block_on(async {
            let store = SessionStore::default();
            let key = ConversationKey::new("app", &user, &session);
            let first = store.get_or_create(&key).await;
            for _ in 1..repeats {
                let again = store.get_or_create(&key).await;
                assert!(Arc::ptr_eq(&first, &again));
            }
            assert_eq!(store.len().await, 1);
        });
    }
}
