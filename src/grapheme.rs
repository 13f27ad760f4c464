// Default extended grapheme cluster boundaries.
// https://unicode.org/reports/tr29/#Grapheme_Cluster_Boundary_Rules

use crate::props::{grapheme_prop, GraphemeProperty};
use crate::ranges::Subrange;

// Whether there is no break between cps[i-1] and cps[i]. The regional
// indicator and emoji rules need unbounded context, which is resolved by
// walking backward, so the answer is position-local and prev/next stay
// symmetric by construction.
fn joins_at(cps: &[u32], i: usize) -> bool {
    use GraphemeProperty::*;
    let p = grapheme_prop(cps[i - 1]);
    let c = grapheme_prop(cps[i]);
    match (p, c) {
        (CR, LF) => true,                                // GB3
        (Control | CR | LF, _) => false,                 // GB4
        (_, Control | CR | LF) => false,                 // GB5
        (L, L | V | LV | LVT) => true,                   // GB6
        (LV | V, V | T) => true,                         // GB7
        (LVT | T, T) => true,                            // GB8
        (_, Extend | ZWJ) => true,                       // GB9
        (_, SpacingMark) => true,                        // GB9a
        (Prepend, _) => true,                            // GB9b
        (ZWJ, ExtPict) => {
            // GB11: ExtPict Extend* ZWJ x ExtPict
            let mut j = i - 1;
            while j > 0 && grapheme_prop(cps[j - 1]) == Extend {
                j -= 1;
            }
            j > 0 && grapheme_prop(cps[j - 1]) == ExtPict
        }
        (RI, RI) => {
            // GB12/GB13: break between regional indicator pairs; join iff
            // an odd number of RIs precedes the candidate
            let mut count = 0;
            let mut j = i;
            while j > 0 && grapheme_prop(cps[j - 1]) == RI {
                count += 1;
                j -= 1;
            }
            count % 2 == 1
        }
        _ => false, // GB999
    }
}

// Nearest break at or before `it`; `it == cps.len()` is itself a break.
pub fn prev_grapheme_break(cps: &[u32], it: usize) -> usize {
    let mut i = it.min(cps.len());
    while i > 0 && i < cps.len() && joins_at(cps, i) {
        i -= 1;
    }
    i
}

// Nearest break after `it` (or the end).
pub fn next_grapheme_break(cps: &[u32], it: usize) -> usize {
    let n = cps.len();
    if it >= n {
        return n;
    }
    let mut i = it + 1;
    while i < n && joins_at(cps, i) {
        i += 1;
    }
    i
}

pub fn at_grapheme_break(cps: &[u32], it: usize) -> bool {
    if it >= cps.len() {
        return true;
    }
    it == 0 || !joins_at(cps, it)
}

// The grapheme cluster containing `it`.
pub fn grapheme(cps: &[u32], it: usize) -> Subrange {
    let first = prev_grapheme_break(cps, it);
    Subrange::new(first, next_grapheme_break(cps, first))
}

pub fn graphemes(cps: &[u32]) -> Graphemes<'_> {
    Graphemes {
        cps,
        front: 0,
        back: cps.len(),
    }
}

pub struct Graphemes<'a> {
    cps: &'a [u32],
    front: usize,
    back: usize,
}

impl<'a> Iterator for Graphemes<'a> {
    type Item = Subrange;

    fn next(&mut self) -> Option<Self::Item> {
        if self.front >= self.back {
            return None;
        }
        let end = next_grapheme_break(self.cps, self.front);
        let sub = Subrange::new(self.front, end.min(self.back));
        self.front = sub.last;
        Some(sub)
    }
}

impl<'a> DoubleEndedIterator for Graphemes<'a> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.front >= self.back {
            return None;
        }
        let start = prev_grapheme_break(self.cps, self.back - 1);
        let sub = Subrange::new(start.max(self.front), self.back);
        self.back = sub.first;
        Some(sub)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split(cps: &[u32]) -> Vec<Vec<u32>> {
        graphemes(cps).map(|s| s.of(cps).to_vec()).collect()
    }

    #[test]
    fn test_basic() {
        assert_eq!(split(&[]), Vec::<Vec<u32>>::new());
        assert_eq!(split(&[0x61]), vec![vec![0x61]]);
        assert_eq!(split(&[0x61, 0x62]), vec![vec![0x61], vec![0x62]]);
        // combining marks attach
        assert_eq!(
            split(&[0x61, 0x301, 0x62]),
            vec![vec![0x61, 0x301], vec![0x62]]
        );
    }

    #[test]
    fn test_extend_then_hangul() {
        // an extending sequence followed by a Jamo L starts a new cluster
        let cps = vec![0x1F3FB, 0x308, 0x1100];
        assert_eq!(split(&cps), vec![vec![0x1F3FB, 0x308], vec![0x1100]]);
        assert_eq!(prev_grapheme_break(&cps, 1), 0);
        assert_eq!(next_grapheme_break(&cps, 0), 2);
        assert!(at_grapheme_break(&cps, 2));
        assert!(!at_grapheme_break(&cps, 1));
    }

    #[test]
    fn test_crlf() {
        // CR+LF is one cluster, never split
        let cps = vec![0x61, 0x0D, 0x0A, 0x62];
        assert_eq!(
            split(&cps),
            vec![vec![0x61], vec![0x0D, 0x0A], vec![0x62]]
        );
        assert_eq!(prev_grapheme_break(&cps, 2), 1);
        assert_eq!(next_grapheme_break(&cps, 1), 3);
    }

    #[test]
    fn test_hangul() {
        // L+V+T joins into one syllable cluster
        assert_eq!(
            split(&[0x1100, 0x1161, 0x11A8, 0x1100]),
            vec![vec![0x1100, 0x1161, 0x11A8], vec![0x1100]]
        );
        // LV + T
        assert_eq!(
            split(&[0xAC00, 0x11A8]),
            vec![vec![0xAC00, 0x11A8]]
        );
    }

    #[test]
    fn test_emoji_zwj() {
        // woman + ZWJ + woman is one cluster
        let cps = vec![0x1F469, 0x200D, 0x1F469, 0x61];
        assert_eq!(
            split(&cps),
            vec![vec![0x1F469, 0x200D, 0x1F469], vec![0x61]]
        );
        // with a skin tone modifier before the ZWJ
        let cps = vec![0x1F469, 0x1F3FB, 0x200D, 0x1F469];
        assert_eq!(split(&cps), vec![cps.clone()]);
        // ZWJ after a non-pictographic base does not glue
        let cps = vec![0x61, 0x200D, 0x1F469];
        assert_eq!(
            split(&cps),
            vec![vec![0x61, 0x200D], vec![0x1F469]]
        );
    }

    #[test]
    fn test_regional_indicators() {
        let ri = 0x1F1E6;
        // pairs split two by two
        assert_eq!(
            split(&[ri, ri, ri, ri, ri]),
            vec![vec![ri, ri], vec![ri, ri], vec![ri]]
        );
        // prev/next symmetry across the pair boundary
        let cps = vec![ri, ri, ri];
        assert_eq!(prev_grapheme_break(&cps, 1), 0);
        assert_eq!(prev_grapheme_break(&cps, 2), 2);
        assert_eq!(next_grapheme_break(&cps, 2), 3);
    }

    #[test]
    fn test_prepend_and_spacing_mark() {
        // Devanagari: virama extends, the spacing mark glues to its base
        let cps = vec![0x915, 0x94D, 0x937, 0x93E];
        assert_eq!(
            split(&cps),
            vec![vec![0x915, 0x94D], vec![0x937, 0x93E]]
        );
        // prepend glues to what follows
        let cps = vec![0x600, 0x661];
        assert_eq!(split(&cps), vec![vec![0x600, 0x661]]);
    }

    #[test]
    fn test_backward_iteration() {
        let cps = vec![0x61, 0x301, 0x1100, 0x1161, 0x62];
        let fwd: Vec<_> = graphemes(&cps).collect();
        let mut bwd: Vec<_> = graphemes(&cps).rev().collect();
        bwd.reverse();
        assert_eq!(fwd, bwd);
    }
}
