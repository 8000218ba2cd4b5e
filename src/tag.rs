use std::{fmt, ops};

/// Hard limit on the number of tags: one bit each in a u32, with room to spare.
pub const MAX_TAGS: usize = 31;

/// A bitmask of tags.
///
/// Used both for the tags a client belongs to and for the set of tags a monitor
/// is currently showing. A sticky client carries every bit.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TagSet(u32);

impl TagSet {
    pub const EMPTY: TagSet = TagSet(0);

    pub fn from_bits(bits: u32) -> TagSet {
        TagSet(bits)
    }

    /// The single tag at `index`.
    pub fn single(index: usize) -> TagSet {
        debug_assert!(index < MAX_TAGS);
        TagSet(1 << index)
    }

    /// Every valid bit when `ntags` tags are configured.
    pub fn mask(ntags: usize) -> TagSet {
        let ntags = ntags.min(MAX_TAGS);
        TagSet((1u32 << ntags) - 1)
    }

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn contains(self, index: usize) -> bool {
        index < 32 && self.0 & (1 << index) != 0
    }

    pub fn intersects(self, other: TagSet) -> bool {
        self.0 & other.0 != 0
    }

    /// Index of the lowest set bit, if any.
    pub fn first(self) -> Option<usize> {
        if self.0 == 0 {
            None
        } else {
            Some(self.0.trailing_zeros() as usize)
        }
    }
}

impl fmt::Debug for TagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TagSet({:#b})", self.0)
    }
}

impl ops::BitAnd for TagSet {
    type Output = TagSet;
    fn bitand(self, rhs: TagSet) -> TagSet {
        TagSet(self.0 & rhs.0)
    }
}

impl ops::BitOr for TagSet {
    type Output = TagSet;
    fn bitor(self, rhs: TagSet) -> TagSet {
        TagSet(self.0 | rhs.0)
    }
}

impl ops::BitXor for TagSet {
    type Output = TagSet;
    fn bitxor(self, rhs: TagSet) -> TagSet {
        TagSet(self.0 ^ rhs.0)
    }
}

impl ops::BitOrAssign for TagSet {
    fn bitor_assign(&mut self, rhs: TagSet) {
        self.0 |= rhs.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_covers_configured_tags_only() {
        assert_eq!(TagSet::mask(10).bits(), 0b11_1111_1111);
        assert!(!TagSet::mask(10).contains(10));
    }

    #[test]
    fn first_finds_lowest_tag() {
        assert_eq!(TagSet::from_bits(0b1100).first(), Some(2));
        assert_eq!(TagSet::EMPTY.first(), None);
    }
}
