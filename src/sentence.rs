// Sentence boundaries, SB1..SB998.
// https://unicode.org/reports/tr29/#Sentence_Boundary_Rules
//
// Every rule's context is resolved by bounded walks around the candidate
// position (backward through Extend/Format, optional Sp run and Close run;
// forward for the SB8 lowercase lookahead), so the break test is
// position-local and prev/next are symmetric by construction.

use crate::props::{sentence_prop, SentenceProperty};
use crate::ranges::Subrange;

use SentenceProperty::*;

fn skippable(p: SentenceProperty) -> bool {
    matches!(p, Extend | Format)
}

fn para_sep(p: SentenceProperty) -> bool {
    matches!(p, Sep | CR | LF)
}

fn sa_term(p: SentenceProperty) -> bool {
    matches!(p, ATerm | STerm)
}

// The last non-Extend/Format property strictly before `i`, if any.
fn effective_prev(cps: &[u32], i: usize) -> Option<(usize, SentenceProperty)> {
    let mut j = i;
    while j > 0 {
        j -= 1;
        let p = sentence_prop(cps[j]);
        if !skippable(p) {
            return Some((j, p));
        }
    }
    None
}

// Walks backward from just before `i` through Extend/Format (always), a Sp
// run (when skip_sps), and a Close run, and applies `pred` to the first
// property actually encountered past them.
fn before_close_sp(
    cps: &[u32],
    i: usize,
    skip_sps: bool,
    pred: impl Fn(SentenceProperty) -> bool,
) -> bool {
    let mut at = match effective_prev(cps, i) {
        Some(x) => x,
        None => return false,
    };
    if skip_sps {
        while at.1 == Sp {
            at = match effective_prev(cps, at.0) {
                Some(x) => x,
                None => return false,
            };
        }
    }
    while at.1 == Close {
        at = match effective_prev(cps, at.0) {
            Some(x) => x,
            None => return false,
        };
    }
    pred(at.1)
}

// Whether a sentence break falls between cps[i-1] and cps[i].
fn breaks_at(cps: &[u32], i: usize) -> bool {
    let n = cps.len();
    let pv = sentence_prop(cps[i - 1]);
    let cu = sentence_prop(cps[i]);

    // SB3
    if pv == CR && cu == LF {
        return false;
    }
    // SB4
    if para_sep(pv) {
        return true;
    }
    // SB5: Extend and Format are transparent (never right after a ParaSep,
    // which SB4 already handled)
    if skippable(cu) {
        return false;
    }

    let ep = effective_prev(cps, i);
    // SB6: ATerm x Numeric
    if cu == Numeric {
        if let Some((_, ATerm)) = ep {
            return false;
        }
    }
    // SB7: (Upper | Lower) ATerm x Upper
    if cu == Upper {
        if let Some((k, ATerm)) = ep {
            if before_close_sp(cps, k, false, |p| matches!(p, Upper | Lower)) {
                return false;
            }
        }
    }
    // SB8: ATerm Close* Sp* x (not-a-sentence-starter)* Lower
    if before_close_sp(cps, i, true, |p| p == ATerm) {
        let mut j = i;
        while j < n {
            let p = sentence_prop(cps[j]);
            if skippable(p) {
                j += 1;
                continue;
            }
            if p == Lower {
                return false;
            }
            if matches!(p, OLetter | Upper | Sep | CR | LF | ATerm | STerm) {
                break;
            }
            j += 1;
        }
    }
    let after_saterm_close_sp = before_close_sp(cps, i, true, sa_term);
    // SB8a: SATerm Close* Sp* x (SContinue | SATerm)
    if (cu == SContinue || sa_term(cu)) && after_saterm_close_sp {
        return false;
    }
    // SB9: SATerm Close* x (Close | Sp | ParaSep)
    if (cu == Close || cu == Sp || para_sep(cu)) && before_close_sp(cps, i, false, sa_term) {
        return false;
    }
    // SB10: SATerm Close* Sp* x (Sp | ParaSep)
    if (cu == Sp || para_sep(cu)) && after_saterm_close_sp {
        return false;
    }
    // SB11: break after a full terminator sequence
    if after_saterm_close_sp {
        return true;
    }
    // SB998
    false
}

pub fn prev_sentence_break(cps: &[u32], it: usize) -> usize {
    let mut i = it.min(cps.len());
    while i > 0 && i < cps.len() && !breaks_at(cps, i) {
        i -= 1;
    }
    i
}

pub fn next_sentence_break(cps: &[u32], from: usize) -> usize {
    let n = cps.len();
    if from >= n {
        return n;
    }
    let mut i = from + 1;
    while i < n && !breaks_at(cps, i) {
        i += 1;
    }
    i
}

pub fn at_sentence_break(cps: &[u32], it: usize) -> bool {
    if it >= cps.len() {
        return true;
    }
    it == 0 || breaks_at(cps, it)
}

// The sentence containing `it`.
pub fn sentence(cps: &[u32], it: usize) -> Subrange {
    let first = prev_sentence_break(cps, it);
    Subrange::new(first, next_sentence_break(cps, first))
}

pub fn sentences(cps: &[u32]) -> Sentences<'_> {
    Sentences {
        cps,
        front: 0,
        back: cps.len(),
    }
}

pub struct Sentences<'a> {
    cps: &'a [u32],
    front: usize,
    back: usize,
}

impl<'a> Iterator for Sentences<'a> {
    type Item = Subrange;

    fn next(&mut self) -> Option<Self::Item> {
        if self.front >= self.back {
            return None;
        }
        let end = next_sentence_break(self.cps, self.front);
        let sub = Subrange::new(self.front, end.min(self.back));
        self.front = sub.last;
        Some(sub)
    }
}

impl<'a> DoubleEndedIterator for Sentences<'a> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.front >= self.back {
            return None;
        }
        let start = prev_sentence_break(self.cps, self.back - 1);
        let sub = Subrange::new(start.max(self.front), self.back);
        self.back = sub.first;
        Some(sub)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split_str(s: &str) -> Vec<String> {
        let cps: Vec<u32> = s.chars().map(|c| c as u32).collect();
        sentences(&cps)
            .map(|w| w.of(&cps).iter().map(|&c| char::from_u32(c).unwrap()).collect())
            .collect()
    }

    #[test]
    fn test_ideograph_full_stop() {
        // a CJK clause ends at the ideographic full stop
        let cps = vec![0x5B57, 0x3002, 0x5B83];
        let subs: Vec<Subrange> = sentences(&cps).collect();
        assert_eq!(subs, vec![Subrange::new(0, 2), Subrange::new(2, 3)]);
        assert_eq!(prev_sentence_break(&cps, 1), 0);
        assert_eq!(next_sentence_break(&cps, 0), 2);
        assert!(at_sentence_break(&cps, 2));
    }

    #[test]
    fn test_terminators() {
        assert_eq!(
            split_str("He left. She stayed."),
            vec!["He left. ", "She stayed."]
        );
        assert_eq!(split_str("One! Two? Three."), vec!["One! ", "Two? ", "Three."]);
        // no terminator, no break
        assert_eq!(split_str("just some words"), vec!["just some words"]);
    }

    #[test]
    fn test_sb6_sb7() {
        // number after a period is not a sentence break
        assert_eq!(split_str("The value 3.4 is fine."), vec!["The value 3.4 is fine."]);
        // interior uppercase abbreviations hold together
        assert_eq!(split_str("In U.S.A. today"), vec!["In U.S.A. today"]);
    }

    #[test]
    fn test_sb8_lowercase_lookahead() {
        // a lowercase continuation suppresses the break after the period
        assert_eq!(split_str("etc. and so on."), vec!["etc. and so on."]);
    }

    #[test]
    fn test_close_and_space_runs() {
        // terminator + closing quote + spaces still breaks once, after the run
        assert_eq!(
            split_str("He said \"Stop.\"  Then left."),
            vec!["He said \"Stop.\"  ", "Then left."]
        );
    }

    #[test]
    fn test_scontinue() {
        assert_eq!(
            split_str("Wait... no, continue."),
            vec!["Wait... no, continue."]
        );
    }

    #[test]
    fn test_paragraph_separators() {
        let cps = vec![0x61, 0x0D, 0x0A, 0x62];
        let subs: Vec<Subrange> = sentences(&cps).collect();
        assert_eq!(subs, vec![Subrange::new(0, 3), Subrange::new(3, 4)]);
        // lone separators break too
        let cps = vec![0x61, 0x2028, 0x62];
        let subs: Vec<Subrange> = sentences(&cps).collect();
        assert_eq!(subs, vec![Subrange::new(0, 2), Subrange::new(2, 3)]);
    }

    #[test]
    fn test_prev_next_symmetry() {
        let corpora = ["He left. She stayed.", "In U.S.A. today", "a\u{3002}b\u{3002}"];
        for s in corpora {
            let cps: Vec<u32> = s.chars().map(|c| c as u32).collect();
            for p in 0..=cps.len() {
                let b = prev_sentence_break(&cps, p);
                assert!(b <= p);
                assert_eq!(prev_sentence_break(&cps, b), b);
                if b < p {
                    assert!(next_sentence_break(&cps, b) >= p);
                }
            }
        }
    }
}
