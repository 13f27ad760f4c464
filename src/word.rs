// Word boundaries, WB1..WB999, with the two tailoring hooks: a property
// function that may reclassify code points and a break override that can
// force extra breaks. https://unicode.org/reports/tr29/#Word_Boundary_Rules
//
// The automaton walks forward with a five-slot window
// {prev_prev, prev, curr, next, next_next}; WB4 is a lookahead that mutates
// the window (skippables collapse into the character before them) rather
// than a separate pass.

use crate::props::{word_prop, WordProperty};
use crate::ranges::Subrange;

pub type WordPropFn<'a> = &'a dyn Fn(u32) -> WordProperty;
pub type WordBreakFn<'a> = &'a dyn Fn(u32, u32, u32, u32, u32) -> bool;

pub fn default_word_prop(cp: u32) -> WordProperty {
    word_prop(cp)
}

// The default break override never adds a break.
pub fn untailored_word_break(_pp: u32, _p: u32, _c: u32, _n: u32, _nn: u32) -> bool {
    false
}

const PREV_PREV: usize = 0;
const PREV: usize = 1;
const CURR: usize = 2;
const NEXT: usize = 3;
const NEXT_NEXT: usize = 4;

#[derive(Clone, Copy)]
struct CpProp {
    cp: u32,
    prop: WordProperty,
}

impl CpProp {
    fn none() -> CpProp {
        CpProp {
            cp: 0,
            prop: WordProperty::Other,
        }
    }
    fn new(cp: u32, prop_fn: WordPropFn) -> CpProp {
        CpProp {
            cp,
            prop: prop_fn(cp),
        }
    }
}

#[derive(Clone, Copy, PartialEq)]
enum EmojiState {
    None,
    // the window's prev slot points at an odd-count regional indicator
    FirstEmoji,
}

#[derive(Clone)]
struct State {
    i: usize,
    caps: [CpProp; 5],
    emoji: EmojiState,
}

fn skippable(prop: WordProperty) -> bool {
    matches!(
        prop,
        WordProperty::Extend | WordProperty::Format | WordProperty::ZWJ
    )
}

fn linebreak(prop: WordProperty) -> bool {
    matches!(
        prop,
        WordProperty::CR | WordProperty::LF | WordProperty::Newline
    )
}

fn ah_letter(prop: WordProperty) -> bool {
    matches!(prop, WordProperty::ALetter | WordProperty::HebrewLetter)
}

// (MidLetter | MidNumLetQ) in WB6 and WB7
fn mid_ah(prop: WordProperty) -> bool {
    matches!(
        prop,
        WordProperty::MidLetter | WordProperty::MidNumLet | WordProperty::SingleQuote
    )
}

// (MidNum | MidNumLetQ) in WB11 and WB12
fn mid_num(prop: WordProperty) -> bool {
    matches!(
        prop,
        WordProperty::MidNum | WordProperty::MidNumLet | WordProperty::SingleQuote
    )
}

// See the chart at
// http://www.unicode.org/Public/UCD/latest/ucd/auxiliary/WordBreakTest.html;
// row = previous property, column = current, true = break. The WB3d case
// is handled in the automaton, so WSegSpace.WSegSpace here is true.
#[rustfmt::skip]
const WORD_BREAKS: [[bool; 20]; 20] = {
    const T: bool = true;
    const F: bool = false;
// Other  CR    LF    NL    Ktk   AL    ML    MN    MNL   Num   ENL   RI    HL    DQ    SQ    EP    WSSp  Fmt   Extd  ZWJ
    [
    [T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    F,    F,    F], // Other
    [T,    T,    F,    T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    T], // CR
    [T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    T], // LF
    [T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    T], // Newline
    [T,    T,    T,    T,    F,    T,    T,    T,    T,    T,    F,    T,    T,    T,    T,    T,    T,    F,    F,    F], // Katakana
    [T,    T,    T,    T,    T,    F,    T,    T,    T,    F,    F,    T,    F,    T,    T,    T,    T,    F,    F,    F], // ALetter
    [T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    F,    F,    F], // MidLetter
    [T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    F,    F,    F], // MidNum
    [T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    F,    F,    F], // MidNumLet
    [T,    T,    T,    T,    T,    F,    T,    T,    T,    F,    F,    T,    F,    T,    T,    T,    T,    F,    F,    F], // Numeric
    [T,    T,    T,    T,    F,    F,    T,    T,    T,    F,    F,    T,    F,    T,    T,    T,    T,    F,    F,    F], // ExtendNumLet
    [T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    F,    T,    T,    T,    T,    T,    F,    F,    F], // RI
    [T,    T,    T,    T,    T,    F,    T,    T,    T,    F,    F,    T,    F,    T,    F,    T,    T,    F,    F,    F], // HebrewLetter
    [T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    F,    F,    F], // DoubleQuote
    [T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    F,    F,    F], // SingleQuote
    [T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    F,    F,    F], // ExtPict
    [T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    F,    F,    F], // WSegSpace
    [T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    F,    F,    F], // Format
    [T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    F,    F,    F], // Extend
    [T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    T,    F,    T,    F,    F,    F], // ZWJ
    ]
};

fn table_word_break(prev: WordProperty, curr: WordProperty) -> bool {
    WORD_BREAKS[prev as usize][curr as usize]
}

fn advance(st: &mut State) {
    st.i += 1;
    st.caps[PREV_PREV] = st.caps[PREV];
    st.caps[PREV] = st.caps[CURR];
    st.caps[CURR] = st.caps[NEXT];
    st.caps[NEXT] = st.caps[NEXT_NEXT];
    st.caps[NEXT_NEXT] = CpProp::none();
}

// WB4: except after line breaks, ignore (Extend | Format | ZWJ)*. Collapses
// a skippable run into the character before it and refreshes the lookahead.
fn skip_forward(st: &mut State, cps: &[u32], first: usize, prop_fn: WordPropFn) {
    let n = cps.len();
    if st.i != first && !skippable(st.caps[PREV].prop) && skippable(st.caps[CURR].prop) {
        let mut j = st.i;
        let mut last_prop = WordProperty::Other;
        while j < n {
            last_prop = prop_fn(cps[j]);
            if !skippable(last_prop) {
                break;
            }
            j += 1;
        }
        if j == n {
            j -= 1;
        } else if last_prop == WordProperty::ExtPict {
            // leave a ZWJ visible so WB3c can still see ZWJ x ExtPict
            if prop_fn(cps[j - 1]) == WordProperty::ZWJ {
                j -= 1;
            }
        }
        st.i = j;
        st.caps[CURR] = CpProp::new(cps[j], prop_fn);
        st.caps[NEXT] = CpProp::none();
        st.caps[NEXT_NEXT] = CpProp::none();
        if j + 1 < n {
            st.caps[NEXT] = CpProp::new(cps[j + 1], prop_fn);
            if j + 2 < n {
                st.caps[NEXT_NEXT] = CpProp::new(cps[j + 2], prop_fn);
            }
        }
    }
}

// The window's curr after advancing once and skipping; None means end.
fn peek_after_skip(
    st: &State,
    cps: &[u32],
    first: usize,
    prop_fn: WordPropFn,
) -> Option<WordProperty> {
    let mut t = st.clone();
    advance(&mut t);
    skip_forward(&mut t, cps, first, prop_fn);
    if t.i == cps.len() {
        None
    } else {
        Some(t.caps[CURR].prop)
    }
}

pub fn next_word_break(cps: &[u32], from: usize) -> usize {
    next_word_break_with(cps, from, &default_word_prop, &untailored_word_break)
}

pub fn next_word_break_with(
    cps: &[u32],
    from: usize,
    prop_fn: WordPropFn,
    break_fn: WordBreakFn,
) -> usize {
    use WordProperty::*;
    let n = cps.len();
    if from >= n {
        return n;
    }
    let mut st = State {
        i: from + 1,
        caps: [CpProp::none(); 5],
        emoji: EmojiState::None,
    };
    if st.i == n {
        return n;
    }
    st.caps[PREV] = CpProp::new(cps[st.i - 1], prop_fn);
    st.caps[CURR] = CpProp::new(cps[st.i], prop_fn);
    if st.i + 1 < n {
        st.caps[NEXT] = CpProp::new(cps[st.i + 1], prop_fn);
        if st.i + 2 < n {
            st.caps[NEXT_NEXT] = CpProp::new(cps[st.i + 2], prop_fn);
        }
    }
    st.emoji = if st.caps[PREV].prop == RI {
        EmojiState::FirstEmoji
    } else {
        EmojiState::None
    };

    while st.i != n {
        if st.i + 1 < n && st.i + 2 < n {
            st.caps[NEXT_NEXT] = CpProp::new(cps[st.i + 2], prop_fn);
        } else {
            st.caps[NEXT_NEXT] = CpProp::none();
        }

        // the tailored break override comes before everything else
        if break_fn(
            st.caps[PREV_PREV].cp,
            st.caps[PREV].cp,
            st.caps[CURR].cp,
            st.caps[NEXT].cp,
            st.caps[NEXT_NEXT].cp,
        ) {
            return st.i;
        }

        // WB3
        if st.caps[PREV].prop == CR && st.caps[CURR].prop == LF {
            advance(&mut st);
            continue;
        }
        // WB3a
        if linebreak(st.caps[PREV].prop) {
            return st.i;
        }
        // WB3b
        if linebreak(st.caps[CURR].prop) {
            return st.i;
        }
        // WB3c
        if st.caps[PREV].prop == ZWJ && st.caps[CURR].prop == ExtPict {
            advance(&mut st);
            continue;
        }
        // WB3d
        if st.caps[PREV].prop == WSegSpace && st.caps[CURR].prop == WSegSpace {
            advance(&mut st);
            continue;
        }

        // WB4, once here, covers prev..curr and curr..next transitively
        skip_forward(&mut st, cps, from, prop_fn);
        if st.i == n {
            return n;
        }

        // WB6
        if ah_letter(st.caps[PREV].prop) && mid_ah(st.caps[CURR].prop) && st.i + 1 != n {
            match peek_after_skip(&st, cps, from, prop_fn) {
                None => return n,
                Some(p) if ah_letter(p) => {
                    advance(&mut st);
                    continue;
                }
                Some(_) => {}
            }
        }
        // WB7
        if ah_letter(st.caps[PREV_PREV].prop)
            && mid_ah(st.caps[PREV].prop)
            && ah_letter(st.caps[CURR].prop)
        {
            advance(&mut st);
            continue;
        }
        // WB7b
        if st.caps[PREV].prop == HebrewLetter && st.caps[CURR].prop == DoubleQuote && st.i + 1 != n
        {
            match peek_after_skip(&st, cps, from, prop_fn) {
                None => return n,
                Some(HebrewLetter) => {
                    advance(&mut st);
                    continue;
                }
                Some(_) => {}
            }
        }
        // WB7c
        if st.caps[PREV_PREV].prop == HebrewLetter
            && st.caps[PREV].prop == DoubleQuote
            && st.caps[CURR].prop == HebrewLetter
        {
            advance(&mut st);
            continue;
        }
        // WB11
        if st.caps[PREV_PREV].prop == Numeric
            && mid_num(st.caps[PREV].prop)
            && st.caps[CURR].prop == Numeric
        {
            advance(&mut st);
            continue;
        }
        // WB12
        if st.caps[PREV].prop == Numeric && mid_num(st.caps[CURR].prop) && st.i + 1 != n {
            match peek_after_skip(&st, cps, from, prop_fn) {
                None => return n,
                Some(Numeric) => {
                    advance(&mut st);
                    continue;
                }
                Some(_) => {}
            }
        }

        // WB15/WB16: regional indicators pair up
        if st.emoji == EmojiState::FirstEmoji {
            st.emoji = EmojiState::None;
            if st.caps[CURR].prop == RI {
                advance(&mut st);
                continue;
            }
        } else if st.caps[CURR].prop == RI {
            st.emoji = EmojiState::FirstEmoji;
            return st.i;
        }

        if table_word_break(st.caps[PREV].prop, st.caps[CURR].prop) {
            return st.i;
        }
        advance(&mut st);
    }
    n
}

// The nearest break at or before `it`, derived from the forward automaton
// anchored at the range start so that prev-then-next round trips exactly.
pub fn prev_word_break(cps: &[u32], it: usize) -> usize {
    prev_word_break_with(cps, it, &default_word_prop, &untailored_word_break)
}

pub fn prev_word_break_with(
    cps: &[u32],
    it: usize,
    prop_fn: WordPropFn,
    break_fn: WordBreakFn,
) -> usize {
    let it = it.min(cps.len());
    let mut b = 0;
    while b < it {
        let nb = next_word_break_with(cps, b, prop_fn, break_fn);
        if nb <= it {
            b = nb;
        } else {
            break;
        }
    }
    b
}

pub fn at_word_break(cps: &[u32], it: usize) -> bool {
    it >= cps.len() || prev_word_break(cps, it) == it
}

// The word containing `it`.
pub fn word(cps: &[u32], it: usize) -> Subrange {
    let first = prev_word_break(cps, it);
    Subrange::new(first, next_word_break(cps, first))
}

pub fn words(cps: &[u32]) -> Words<'_> {
    words_with(cps, &default_word_prop, &untailored_word_break)
}

pub fn words_with<'a>(cps: &'a [u32], prop_fn: WordPropFn<'a>, break_fn: WordBreakFn<'a>) -> Words<'a> {
    Words {
        cps,
        prop_fn,
        break_fn,
        front: 0,
        back: cps.len(),
    }
}

pub struct Words<'a> {
    cps: &'a [u32],
    prop_fn: WordPropFn<'a>,
    break_fn: WordBreakFn<'a>,
    front: usize,
    back: usize,
}

impl<'a> Iterator for Words<'a> {
    type Item = Subrange;

    fn next(&mut self) -> Option<Self::Item> {
        if self.front >= self.back {
            return None;
        }
        let end = next_word_break_with(self.cps, self.front, self.prop_fn, self.break_fn);
        let sub = Subrange::new(self.front, end.min(self.back));
        self.front = sub.last;
        Some(sub)
    }
}

impl<'a> DoubleEndedIterator for Words<'a> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.front >= self.back {
            return None;
        }
        let start = prev_word_break_with(self.cps, self.back - 1, self.prop_fn, self.break_fn);
        let sub = Subrange::new(start.max(self.front), self.back);
        self.back = sub.first;
        Some(sub)
    }
}
