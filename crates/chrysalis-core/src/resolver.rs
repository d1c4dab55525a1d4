//! # Display Resolver
//!
//! Computes which history entry an identity currently displays and the
//! URI fragment that names it. Resolution is pure: override-if-pinned,
//! else latest. Assembling or serving the final metadata document is a
//! downstream consumer's job; nothing here performs I/O.

use crate::IdentityId;
use crate::primitives::TOKEN_URI_SEGMENT;

/// The displayed history index: the pinned override when nonzero,
/// otherwise the latest entry.
///
/// Zero is a legitimate result for uninitialized identities and means
/// "no record".
#[must_use]
pub const fn resolved_index(pinned: u32, history_count: u32) -> u32 {
    if pinned != 0 { pinned } else { history_count }
}

/// Deterministic token URI fragment for `(identity, index)`:
/// `{base}/token-uri/id-{identity}-history-{index}.json`.
///
/// Both numbers are rendered base-10 with no leading zeros. The base is
/// used verbatim apart from stripping a trailing slash, so an empty base
/// yields a rooted path fragment.
#[must_use]
pub fn token_uri(base: &str, identity: IdentityId, index: u32) -> String {
    format!(
        "{}/{}/id-{}-history-{}.json",
        base.trim_end_matches('/'),
        TOKEN_URI_SEGMENT,
        identity.0,
        index
    )
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unpinned_resolves_to_latest() {
        assert_eq!(resolved_index(0, 3), 3);
    }

    #[test]
    fn pinned_supersedes_latest() {
        assert_eq!(resolved_index(1, 3), 1);
        assert_eq!(resolved_index(2, 5), 2);
    }

    #[test]
    fn uninitialized_resolves_to_zero() {
        assert_eq!(resolved_index(0, 0), 0);
    }

    #[test]
    fn uri_format_is_exact() {
        let uri = token_uri("https://meta.example.org", IdentityId(1), 2);
        assert_eq!(uri, "https://meta.example.org/token-uri/id-1-history-2.json");
    }

    #[test]
    fn uri_strips_trailing_slash() {
        let uri = token_uri("https://meta.example.org/", IdentityId(1), 1);
        assert_eq!(uri, "https://meta.example.org/token-uri/id-1-history-1.json");
    }

    #[test]
    fn uri_with_empty_base_is_rooted() {
        let uri = token_uri("", IdentityId(42), 7);
        assert_eq!(uri, "/token-uri/id-42-history-7.json");
    }

    #[test]
    fn uri_has_no_leading_zeros() {
        let uri = token_uri("", IdentityId(1000007), 10);
        assert!(uri.ends_with("/id-1000007-history-10.json"));
    }
}
