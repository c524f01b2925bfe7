//! UTF-8-safe string clipping.
//!
//! Byte-index slicing panics when the index falls inside a multi-byte
//! character, so every truncation in this workspace goes through these
//! helpers.

/// Longest prefix of `s` whose byte length is at most `max_bytes`, snapped
/// back to a char boundary.
#[inline]
#[must_use]
pub fn clip_str(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Clip `s` to `max_bytes` and append a notice with the original length.
///
/// Used for oversized tool results and hook output diagnostics. Returns the
/// input unchanged (no allocation besides the copy) when it already fits.
#[must_use]
pub fn clip_with_notice(s: &str, max_bytes: usize) -> String {
    if s.len() <= max_bytes {
        return s.to_owned();
    }
    let prefix = clip_str(s, max_bytes);
    format!(
        "{prefix}\n[clipped: {} bytes total, showing first {}]",
        s.len(),
        prefix.len()
    )
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fits_unchanged() {
        assert_eq!(clip_str("hello", 10), "hello");
        assert_eq!(clip_str("hello", 5), "hello");
    }

    #[test]
    fn clips_ascii() {
        assert_eq!(clip_str("hello world", 5), "hello");
    }

    #[test]
    fn empty_and_zero() {
        assert_eq!(clip_str("", 4), "");
        assert_eq!(clip_str("abc", 0), "");
    }

    #[test]
    fn snaps_to_char_boundary() {
        // 'é' is two bytes (0xC3 0xA9): c(0) a(1) f(2) é(3,4)
        assert_eq!(clip_str("café", 4), "caf");
        assert_eq!(clip_str("café", 5), "café");
    }

    #[test]
    fn four_byte_scalar() {
        let s = "a🦀b"; // a(0) 🦀(1..5) b(5)
        assert_eq!(clip_str(s, 1), "a");
        assert_eq!(clip_str(s, 4), "a");
        assert_eq!(clip_str(s, 5), "a🦀");
    }

    #[test]
    fn notice_appended_when_clipped() {
        let out = clip_with_notice(&"x".repeat(100), 10);
        assert!(out.starts_with("xxxxxxxxxx\n[clipped: 100 bytes"));
    }

    #[test]
    fn notice_absent_when_fits() {
        assert_eq!(clip_with_notice("short", 64), "short");
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn clip_never_exceeds_budget(s in ".*", max in 0usize..64) {
                prop_assert!(clip_str(&s, max).len() <= max);
            }

            #[test]
            fn clip_is_a_prefix(s in ".*", max in 0usize..64) {
                prop_assert!(s.starts_with(clip_str(&s, max)));
            }
        }
    }
}
