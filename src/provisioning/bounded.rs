//! Fixed-capacity strings for provisioned fields.

use std::fmt;
use std::ops::Deref;
use zeroize::Zeroize;

/// A string holding at most `N` bytes.
///
/// Assignment never fails: input longer than `N` bytes is cut to the longest
/// prefix that fits and still ends on a UTF-8 character boundary.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct BoundedString<const N: usize> {
    inner: String,
}

impl<const N: usize> BoundedString<N> {
    /// Maximum length in bytes.
    pub const CAPACITY: usize = N;

    /// Create an empty string.
    pub fn new() -> Self {
        Self {
            inner: String::new(),
        }
    }

    /// Create from `value`, truncating silently.
    pub fn truncated(value: &str) -> Self {
        let mut s = Self::new();
        s.set(value);
        s
    }

    /// Replace the contents with `value`, truncating silently.
    pub fn set(&mut self, value: &str) {
        self.inner.zeroize();
        self.inner.push_str(&value[..floor_char_boundary(value, N)]);
    }

    /// Borrow as `&str`.
    pub fn as_str(&self) -> &str {
        &self.inner
    }
}

/// Largest index `<= max` that is a char boundary of `s`.
fn floor_char_boundary(s: &str, max: usize) -> usize {
    if s.len() <= max {
        return s.len();
    }
    let mut idx = max;
    while !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

impl<const N: usize> Deref for BoundedString<N> {
    type Target = str;

    fn deref(&self) -> &str {
        &self.inner
    }
}

impl<const N: usize> AsRef<str> for BoundedString<N> {
    fn as_ref(&self) -> &str {
        &self.inner
    }
}

impl<const N: usize> PartialEq<str> for BoundedString<N> {
    fn eq(&self, other: &str) -> bool {
        self.inner == other
    }
}

impl<const N: usize> PartialEq<&str> for BoundedString<N> {
    fn eq(&self, other: &&str) -> bool {
        self.inner == *other
    }
}

impl<const N: usize> fmt::Debug for BoundedString<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.inner, f)
    }
}

impl<const N: usize> fmt::Display for BoundedString<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inner)
    }
}

impl<const N: usize> Zeroize for BoundedString<N> {
    fn zeroize(&mut self) {
        self.inner.zeroize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_value_kept() {
        let s = BoundedString::<8>::truncated("abc");
        assert_eq!(s, "abc");
        assert_eq!(s.len(), 3);
    }

    #[test]
    fn test_exact_capacity_kept() {
        let s = BoundedString::<4>::truncated("abcd");
        assert_eq!(s, "abcd");
    }

    #[test]
    fn test_long_value_truncated() {
        let s = BoundedString::<32>::truncated(&"x".repeat(40));
        assert_eq!(s.len(), 32);
    }

    #[test]
    fn test_truncation_respects_char_boundary() {
        // "é" is two bytes; a 4-byte cut would split the second one.
        let s = BoundedString::<4>::truncated("aéé");
        assert_eq!(s, "aé");
        assert_eq!(s.len(), 3);
    }

    #[test]
    fn test_set_overwrites() {
        let mut s = BoundedString::<8>::truncated("longer");
        s.set("ab");
        assert_eq!(s, "ab");
        s.set("");
        assert!(s.is_empty());
    }
}
