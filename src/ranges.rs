// Subrange types produced by the break iterators. A Subrange is a pair of
// code point indices into the caller's slice; the slice itself stays with
// the caller so views can be taken lazily.

use crate::grapheme::{at_grapheme_break, next_grapheme_break, prev_grapheme_break};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Subrange {
    pub first: usize,
    pub last: usize,
}

impl Subrange {
    pub fn new(first: usize, last: usize) -> Self {
        Subrange { first, last }
    }

    pub fn len(&self) -> usize {
        self.last - self.first
    }

    pub fn is_empty(&self) -> bool {
        self.first == self.last
    }

    pub fn of<'a>(&self, cps: &'a [u32]) -> &'a [u32] {
        &cps[self.first..self.last]
    }
}

// A line subrange; hard is true iff the break terminating it is mandatory.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Line {
    pub range: Subrange,
    pub hard: bool,
}

impl Line {
    pub fn hard_break(&self) -> bool {
        self.hard
    }

    pub fn of<'a>(&self, cps: &'a [u32]) -> &'a [u32] {
        self.range.of(cps)
    }
}

// Snaps a subrange outward to the nearest grapheme boundaries, so that
// break positions computed over code points line up with a grapheme view
// of the same text.
pub fn align_to_graphemes(cps: &[u32], sub: Subrange) -> Subrange {
    let first = if at_grapheme_break(cps, sub.first) {
        sub.first
    } else {
        prev_grapheme_break(cps, sub.first)
    };
    let last = if at_grapheme_break(cps, sub.last) {
        sub.last
    } else {
        next_grapheme_break(cps, sub.last)
    };
    Subrange::new(first, last)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_align_to_graphemes() {
        // e + combining acute forms one grapheme
        let cps = vec![0x61, 0x65, 0x301, 0x62];
        assert_eq!(
            align_to_graphemes(&cps, Subrange::new(2, 3)),
            Subrange::new(1, 3)
        );
        assert_eq!(
            align_to_graphemes(&cps, Subrange::new(1, 4)),
            Subrange::new(1, 4)
        );
        assert_eq!(
            align_to_graphemes(&cps, Subrange::new(0, 0)),
            Subrange::new(0, 0)
        );
    }
}
