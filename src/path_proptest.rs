//! Property-based tests for path utilities

use proptest::prelude::*;

use crate::path::{expand_user, normalize_url};

proptest! {
    /// A normalized URL is always usable as a single path component.
    #[test]
    fn normalize_url_has_no_separators(url in "[a-zA-Z0-9@:/._~-]{0,64}") {
        let normalized = normalize_url(&url);
        prop_assert!(!normalized.contains('/'));
        prop_assert!(!normalized.contains(':'));
        prop_assert!(!normalized.contains('\\'));
    }

    /// Normalization is character-for-character, so length is preserved.
    #[test]
    fn normalize_url_preserves_length(url in "[a-zA-Z0-9@:/._~-]{0,64}") {
        prop_assert_eq!(normalize_url(&url).chars().count(), url.chars().count());
    }

    /// Normalization is idempotent.
    #[test]
    fn normalize_url_idempotent(url in "[a-zA-Z0-9@:/._~-]{0,64}") {
        let once = normalize_url(&url);
        prop_assert_eq!(normalize_url(&once), once.clone());
    }

    /// Paths without a leading tilde pass through expansion untouched.
    #[test]
    fn expand_user_without_tilde_is_identity(path in "/[a-zA-Z0-9/._-]{0,32}") {
        let expanded = expand_user(&path).unwrap();
        prop_assert_eq!(expanded, std::path::PathBuf::from(path));
    }
}
