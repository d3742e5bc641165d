//! Cache Line Type
//!
//! A [`CacheLine`] is one way-slot in one set. It carries no data payload:
//! the simulator only needs to know whether the slot is occupied, which
//! memory block occupies it, and how long ago it was last touched.
//!
//! # Recency
//!
//! `recency` counts accesses to the owning set since the line was last
//! touched. A hit or an install resets it to 0, and every access to the set
//! then ages each valid line by one, so a line that was just touched reads
//! as `1` once the access completes. The line with the largest recency in a
//! way range is the least recently used one.
//!
//! Fields of an invalid line are meaningless and are never consulted.

use core::fmt;

/// One way-slot in one cache set.
///
/// # Examples
///
/// ```
/// use partitioned_cache::CacheLine;
///
/// let mut line = CacheLine::empty();
/// assert!(!line.matches(7));
///
/// line.install(7);
/// assert!(line.matches(7));
/// assert_eq!(line.recency(), 0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheLine {
    valid: bool,
    tag: u64,
    recency: u64,
}

impl CacheLine {
    /// An unoccupied line.
    pub const fn empty() -> Self {
        Self {
            valid: false,
            tag: 0,
            recency: 0,
        }
    }

    /// Whether the line holds a block.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Tag of the resident block, or `None` for an invalid line.
    #[inline]
    pub fn tag(&self) -> Option<u64> {
        self.valid.then_some(self.tag)
    }

    /// Accesses to the set since this line was last touched.
    #[inline]
    pub fn recency(&self) -> u64 {
        self.recency
    }

    /// Returns `true` if the line is valid and holds `tag`.
    #[inline]
    pub fn matches(&self, tag: u64) -> bool {
        self.valid && self.tag == tag
    }

    /// Marks the line most recently used.
    #[inline]
    pub fn touch(&mut self) {
        self.recency = 0;
    }

    /// Places `tag` in the line, returning the tag it displaced, if any.
    #[inline]
    pub fn install(&mut self, tag: u64) -> Option<u64> {
        let evicted = self.tag();
        self.valid = true;
        self.tag = tag;
        self.recency = 0;
        evicted
    }

    /// Advances the line's age by one access. Invalid lines do not age.
    #[inline]
    pub fn age(&mut self) {
        if self.valid {
            self.recency = self.recency.saturating_add(1);
        }
    }

    /// Drops the resident block.
    #[inline]
    pub fn invalidate(&mut self) {
        *self = Self::empty();
    }
}

impl fmt::Display for CacheLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.tag() {
            Some(tag) => write!(f, "tag={tag} recency={}", self.recency),
            None => f.write_str("invalid"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_install_reports_displaced_tag() {
        let mut line = CacheLine::empty();
        assert_eq!(line.install(3), None);
        line.age();
        line.age();
        assert_eq!(line.recency(), 2);

        assert_eq!(line.install(9), Some(3));
        assert_eq!(line.tag(), Some(9));
        assert_eq!(line.recency(), 0);
    }

    #[test]
    fn test_invalid_line_does_not_age() {
        let mut line = CacheLine::empty();
        line.age();
        assert_eq!(line.recency(), 0);
        assert_eq!(line.tag(), None);
    }

    #[test]
    fn test_touch_and_invalidate() {
        let mut line = CacheLine::empty();
        line.install(1);
        line.age();
        line.touch();
        assert_eq!(line.recency(), 0);

        line.invalidate();
        assert!(!line.is_valid());
        assert!(!line.matches(1));
        assert_eq!(line.to_string(), "invalid");
    }
}
