//! Property-based tests for the bounded identity field.

use proptest::prelude::*;
use proxy_policy_engine::{Ident, IDENT_MAX_LEN};

proptest! {
    #[test]
    fn ident_never_exceeds_max_len(raw in ".*") {
        let ident = Ident::new(&raw);
        prop_assert!(ident.as_str().len() <= IDENT_MAX_LEN);
    }

    #[test]
    fn ident_is_prefix_of_input(raw in ".*") {
        let ident = Ident::new(&raw);
        prop_assert!(raw.starts_with(ident.as_str()));
    }

    #[test]
    fn ident_truncation_is_silent_and_lossless_below_limit(raw in "[a-z]{0,64}") {
        let ident = Ident::new(&raw);
        prop_assert_eq!(ident.as_str(), raw.as_str());
    }

    // Multi-byte input must still cut on a character boundary.
    #[test]
    fn ident_truncates_on_char_boundary(raw in "\\PC*") {
        let ident = Ident::new(&raw);
        prop_assert!(raw.is_char_boundary(ident.as_str().len()));
    }
}
