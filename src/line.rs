// Line break opportunities, in two flavors: hard (mandatory, paragraph-
// separator style) and allowed (the full LB rule set), plus width-driven
// line splitting over the allowed breaks.
// https://www.unicode.org/reports/tr14/#Algorithm
//
// SA/AI/XX resolution (LB1) is baked into the property table; CJ resolves
// to NS here (regular, non-strict breaking). The CM/ZWJ attachment of
// LB9/LB10 is resolved by walking back to the base character.

use crate::props::{line_prop, LineProperty};
use crate::ranges::{Line, Subrange};

use LineProperty::*;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BreakKind {
    None,
    Allowed,
    Hard,
}

fn resolve(p: LineProperty) -> LineProperty {
    if p == CJ {
        NS
    } else {
        p
    }
}

// A character CM/ZWJ cannot attach to (LB9).
fn no_attach(p: LineProperty) -> bool {
    matches!(p, BK | CR | LF | NL | SP | ZW)
}

// The base the character at `j` belongs to under LB9/LB10: walks back over
// CM/ZWJ to the base character, or resolves to AL for an orphan run.
fn base_class(cps: &[u32], j: usize) -> (LineProperty, usize) {
    let mut k = j;
    loop {
        let c = line_prop(cps[k]);
        if c != CM && c != ZWJ {
            return (c, k);
        }
        if k == 0 {
            return (AL, k); // LB10
        }
        if no_attach(line_prop(cps[k - 1])) {
            return (AL, k); // LB10
        }
        k -= 1;
    }
}

// Classifies the position between cps[i-1] and cps[i]; 0 < i < len.
fn break_at(cps: &[u32], i: usize) -> BreakKind {
    let p_raw = line_prop(cps[i - 1]);
    let c_raw = line_prop(cps[i]);

    // LB4, LB5
    if p_raw == BK {
        return BreakKind::Hard;
    }
    if p_raw == CR {
        return if c_raw == LF {
            BreakKind::None
        } else {
            BreakKind::Hard
        };
    }
    if p_raw == LF || p_raw == NL {
        return BreakKind::Hard;
    }
    // LB6
    if matches!(c_raw, BK | CR | LF | NL) {
        return BreakKind::None;
    }
    // LB7
    if c_raw == SP || c_raw == ZW {
        return BreakKind::None;
    }
    // LB8: ZW SP* -:-
    {
        let mut j = i - 1;
        while line_prop(cps[j]) == SP && j > 0 {
            j -= 1;
        }
        if line_prop(cps[j]) == ZW {
            return BreakKind::Allowed;
        }
    }
    // LB8a
    if p_raw == ZWJ {
        return BreakKind::None;
    }
    // LB9: X CM* is treated as X
    if matches!(c_raw, CM | ZWJ) && !no_attach(p_raw) {
        return BreakKind::None;
    }

    let c = resolve(c_raw);
    let (pe_raw, pe_idx) = base_class(cps, i - 1);
    let pe = resolve(pe_raw);

    // the class before a run of spaces, for the SP*-spanning rules
    let (bs_exists, bs) = {
        let mut j = i;
        while j > 0 && line_prop(cps[j - 1]) == SP {
            j -= 1;
        }
        if j == i {
            (true, pe)
        } else if j == 0 {
            (false, pe)
        } else {
            (true, resolve(base_class(cps, j - 1).0))
        }
    };

    // LB11
    if c == WJ || pe == WJ {
        return BreakKind::None;
    }
    // LB12
    if pe == GL {
        return BreakKind::None;
    }
    // LB12a
    if c == GL && p_raw != SP && !matches!(pe, BA | HY) {
        return BreakKind::None;
    }
    // LB13
    if matches!(c, CL | CP | EX | IS | SY) {
        return BreakKind::None;
    }
    // LB14: OP SP* x
    if bs_exists && bs == OP {
        return BreakKind::None;
    }
    // LB15: QU SP* x OP
    if bs_exists && bs == QU && c == OP {
        return BreakKind::None;
    }
    // LB16: (CL | CP) SP* x NS
    if bs_exists && matches!(bs, CL | CP) && c == NS {
        return BreakKind::None;
    }
    // LB17: B2 SP* x B2
    if bs_exists && bs == B2 && c == B2 {
        return BreakKind::None;
    }
    // LB18
    if p_raw == SP {
        return BreakKind::Allowed;
    }
    // LB19
    if c == QU || pe == QU {
        return BreakKind::None;
    }
    // LB20
    if c == CB || pe == CB {
        return BreakKind::Allowed;
    }
    // LB21
    if matches!(c, BA | HY | NS) || pe == BB {
        return BreakKind::None;
    }
    // LB21a: HL (HY | BA) x
    if matches!(pe, HY | BA) && pe_idx > 0 && base_class(cps, pe_idx - 1).0 == HL {
        return BreakKind::None;
    }
    // LB21b
    if pe == SY && c == HL {
        return BreakKind::None;
    }
    // LB22
    if c == IN {
        return BreakKind::None;
    }
    // LB23
    if matches!(pe, AL | HL) && c == NU || pe == NU && matches!(c, AL | HL) {
        return BreakKind::None;
    }
    // LB23a
    if pe == PR && matches!(c, ID | EB | EM) || matches!(pe, ID | EB | EM) && c == PO {
        return BreakKind::None;
    }
    // LB24
    if matches!(pe, PR | PO) && matches!(c, AL | HL)
        || matches!(pe, AL | HL) && matches!(c, PR | PO)
    {
        return BreakKind::None;
    }
    // LB25
    if matches!(pe, CL | CP | NU) && matches!(c, PO | PR)
        || matches!(pe, PO | PR) && matches!(c, OP | NU)
        || matches!(pe, HY | IS | NU | SY) && c == NU
    {
        return BreakKind::None;
    }
    // LB26
    if pe == JL && matches!(c, JL | JV | H2 | H3)
        || matches!(pe, JV | H2) && matches!(c, JV | JT)
        || matches!(pe, JT | H3) && c == JT
    {
        return BreakKind::None;
    }
    // LB27
    if matches!(pe, JL | JV | JT | H2 | H3) && c == PO
        || pe == PR && matches!(c, JL | JV | JT | H2 | H3)
    {
        return BreakKind::None;
    }
    // LB28
    if matches!(pe, AL | HL) && matches!(c, AL | HL) {
        return BreakKind::None;
    }
    // LB29
    if pe == IS && matches!(c, AL | HL) {
        return BreakKind::None;
    }
    // LB30
    if matches!(pe, AL | HL | NU) && c == OP || pe == CP && matches!(c, AL | HL | NU) {
        return BreakKind::None;
    }
    // LB30a: break between regional indicator pairs only
    if pe == RI && c == RI {
        let mut count = 0;
        let mut j = pe_idx + 1;
        while j > 0 && line_prop(cps[j - 1]) == RI {
            count += 1;
            j -= 1;
        }
        if count % 2 == 1 {
            return BreakKind::None;
        }
    }
    // LB30b
    if pe == EB && c == EM {
        return BreakKind::None;
    }
    // LB31
    BreakKind::Allowed
}

// Whether the end of text counts as a hard break (text ends in a
// paragraph-separator-style character).
fn hard_at_end(cps: &[u32]) -> bool {
    match cps.last() {
        Some(&cp) => matches!(line_prop(cp), BK | CR | LF | NL),
        None => false,
    }
}

// ---------------------------------------------------------------- hard breaks

pub fn next_hard_line_break(cps: &[u32], from: usize) -> usize {
    let n = cps.len();
    if from >= n {
        return n;
    }
    let mut i = from;
    while i < n {
        match line_prop(cps[i]) {
            BK | NL | LF => return i + 1,
            CR => {
                if i + 1 < n && line_prop(cps[i + 1]) == LF {
                    return i + 2;
                }
                return i + 1;
            }
            _ => i += 1,
        }
    }
    n
}

pub fn prev_hard_line_break(cps: &[u32], it: usize) -> usize {
    let mut i = it.min(cps.len());
    while i > 0 {
        // a hard break lies at i iff cps[i-1] terminates a line
        let is_break = match line_prop(cps[i - 1]) {
            BK | NL | LF => true,
            CR => !(i < cps.len() && line_prop(cps[i]) == LF),
            _ => false,
        };
        if is_break {
            break;
        }
        i -= 1;
    }
    i
}

pub fn at_hard_line_break(cps: &[u32], it: usize) -> bool {
    it >= cps.len() || prev_hard_line_break(cps, it) == it
}

// ---------------------------------------------------------------- allowed

pub fn next_allowed_line_break(cps: &[u32], from: usize) -> (usize, bool) {
    let n = cps.len();
    if from >= n {
        return (n, hard_at_end(cps));
    }
    let mut i = from + 1;
    while i < n {
        match break_at(cps, i) {
            BreakKind::None => i += 1,
            BreakKind::Allowed => return (i, false),
            BreakKind::Hard => return (i, true),
        }
    }
    (n, hard_at_end(cps))
}

pub fn prev_allowed_line_break(cps: &[u32], it: usize) -> usize {
    let mut i = it.min(cps.len());
    while i > 0 && i < cps.len() && break_at(cps, i) == BreakKind::None {
        i -= 1;
    }
    i
}

pub fn at_allowed_line_break(cps: &[u32], it: usize) -> bool {
    if it >= cps.len() {
        return true;
    }
    it == 0 || break_at(cps, it) != BreakKind::None
}

// ---------------------------------------------------------------- lines

// The hard line containing `it`.
pub fn line(cps: &[u32], it: usize) -> Line {
    let first = prev_hard_line_break(cps, it);
    let last = next_hard_line_break(cps, first);
    Line {
        range: Subrange::new(first, last),
        hard: last < cps.len() || hard_at_end(cps),
    }
}

pub fn hard_lines(cps: &[u32]) -> HardLines<'_> {
    HardLines {
        cps,
        front: 0,
        back: cps.len(),
    }
}

pub struct HardLines<'a> {
    cps: &'a [u32],
    front: usize,
    back: usize,
}

impl<'a> Iterator for HardLines<'a> {
    type Item = Line;

    fn next(&mut self) -> Option<Self::Item> {
        if self.front >= self.back {
            return None;
        }
        let end = next_hard_line_break(self.cps, self.front);
        let hard = end < self.cps.len() || hard_at_end(self.cps);
        let line = Line {
            range: Subrange::new(self.front, end.min(self.back)),
            hard,
        };
        self.front = line.range.last;
        Some(line)
    }
}

impl<'a> DoubleEndedIterator for HardLines<'a> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.front >= self.back {
            return None;
        }
        let start = prev_hard_line_break(self.cps, self.back - 1);
        let hard = self.back < self.cps.len() || hard_at_end(self.cps);
        let line = Line {
            range: Subrange::new(start.max(self.front), self.back),
            hard,
        };
        self.back = line.range.first;
        Some(line)
    }
}

// One line per allowed break.
pub fn allowed_lines(cps: &[u32]) -> AllowedLines<'_> {
    AllowedLines {
        cps,
        front: 0,
        back: cps.len(),
    }
}

pub struct AllowedLines<'a> {
    cps: &'a [u32],
    front: usize,
    back: usize,
}

impl<'a> Iterator for AllowedLines<'a> {
    type Item = Line;

    fn next(&mut self) -> Option<Self::Item> {
        if self.front >= self.back {
            return None;
        }
        let (end, hard) = next_allowed_line_break(self.cps, self.front);
        let line = Line {
            range: Subrange::new(self.front, end.min(self.back)),
            hard,
        };
        self.front = line.range.last;
        Some(line)
    }
}

impl<'a> DoubleEndedIterator for AllowedLines<'a> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.front >= self.back {
            return None;
        }
        let start = prev_allowed_line_break(self.cps, self.back - 1);
        let hard = match self.back {
            b if b == self.cps.len() => hard_at_end(self.cps),
            b => break_at(self.cps, b) == BreakKind::Hard,
        };
        let line = Line {
            range: Subrange::new(start.max(self.front), self.back),
            hard,
        };
        self.back = line.range.first;
        Some(line)
    }
}

// Width-driven line splitting: emits the longest prefix of allowed breaks
// whose extent fits the budget. When not even the first allowed chunk fits,
// break_overlong_lines picks between hard-cutting at code point granularity
// and emitting the whole overlong chunk.
pub fn wrapped_lines<'a>(
    cps: &'a [u32],
    max_extent: usize,
    cp_extent: &'a dyn Fn(&[u32]) -> usize,
    break_overlong_lines: bool,
) -> WrappedLines<'a> {
    WrappedLines {
        cps,
        max_extent,
        cp_extent,
        break_overlong_lines,
        pos: 0,
    }
}

pub struct WrappedLines<'a> {
    cps: &'a [u32],
    max_extent: usize,
    cp_extent: &'a dyn Fn(&[u32]) -> usize,
    break_overlong_lines: bool,
    pos: usize,
}

impl<'a> Iterator for WrappedLines<'a> {
    type Item = Line;

    fn next(&mut self) -> Option<Self::Item> {
        let n = self.cps.len();
        if self.pos >= n {
            return None;
        }
        let start = self.pos;
        let mut last_fit: Option<(usize, bool)> = None;
        let mut b = start;
        loop {
            let (nb, hard) = next_allowed_line_break(self.cps, b);
            let extent = (self.cp_extent)(&self.cps[start..nb]);
            if extent <= self.max_extent {
                last_fit = Some((nb, hard));
                b = nb;
                if hard || nb == n {
                    break;
                }
            } else {
                break;
            }
        }
        let (end, hard) = match last_fit {
            Some(x) => x,
            None => {
                // nothing fits up to the first allowed break
                let (nb, hard) = next_allowed_line_break(self.cps, start);
                if self.break_overlong_lines {
                    // cut at the widest code point prefix that still fits
                    let mut end = start + 1;
                    while end < nb
                        && (self.cp_extent)(&self.cps[start..end + 1]) <= self.max_extent
                    {
                        end += 1;
                    }
                    (end, false)
                } else {
                    (nb, hard)
                }
            }
        };
        self.pos = end;
        Some(Line {
            range: Subrange::new(start, end),
            hard,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allowed(cps: &[u32]) -> Vec<usize> {
        let mut out = Vec::new();
        let mut b = 0;
        while b < cps.len() {
            b = next_allowed_line_break(cps, b).0;
            out.push(b);
        }
        out
    }

    fn count_extent(cps: &[u32]) -> usize {
        cps.len()
    }

    #[test]
    fn test_hard_breaks() {
        let cps = vec![0x61, 0x0D, 0x0A, 0x62, 0x0A, 0x63];
        assert_eq!(next_hard_line_break(&cps, 0), 3);
        assert_eq!(next_hard_line_break(&cps, 3), 5);
        assert_eq!(next_hard_line_break(&cps, 5), 6);
        assert_eq!(prev_hard_line_break(&cps, 4), 3);
        assert_eq!(prev_hard_line_break(&cps, 3), 3);
        assert_eq!(prev_hard_line_break(&cps, 2), 0);
        let lines: Vec<Line> = hard_lines(&cps).collect();
        assert_eq!(
            lines.iter().map(|l| (l.range.first, l.range.last, l.hard)).collect::<Vec<_>>(),
            vec![(0, 3, true), (3, 5, true), (5, 6, false)]
        );
    }

    #[test]
    fn test_spaces_and_zwsp() {
        // ZWSP, SPACE, DIGIT: the space binds to the ZWSP break
        let cps = vec![0x200B, 0x20, 0x30];
        assert_eq!(allowed(&cps), vec![2, 3]);
        // plain words break after the space
        let cps: Vec<u32> = "ab cd".chars().map(|c| c as u32).collect();
        assert_eq!(allowed(&cps), vec![3, 5]);
    }

    #[test]
    fn test_no_break_contexts() {
        // no break before closing punctuation, commas, or inside a word
        let cps: Vec<u32> = "foo(bar), baz".chars().map(|c| c as u32).collect();
        //                   0123456789...
        assert_eq!(allowed(&cps), vec![10, 13]);
        // hyphen allows a break after, not before
        let cps: Vec<u32> = "well-known".chars().map(|c| c as u32).collect();
        assert_eq!(allowed(&cps), vec![5, 10]);
        // combining mark attaches to its base
        let cps = vec![0x61, 0x301, 0x20, 0x62];
        assert_eq!(allowed(&cps), vec![3, 4]);
    }

    #[test]
    fn test_ideographs_break_anywhere() {
        let cps = vec![0x4E00, 0x4E8C, 0x4E09];
        assert_eq!(allowed(&cps), vec![1, 2, 3]);
        // but not before the ideographic full stop
        let cps = vec![0x4E00, 0x3002, 0x4E8C];
        assert_eq!(allowed(&cps), vec![2, 3]);
    }

    #[test]
    fn test_wrapped_lines_budgets() {
        let cps = vec![0x200B, 0x20, 0x30];
        let wrap = |budget, overlong| -> Vec<(usize, usize)> {
            wrapped_lines(&cps, budget, &count_extent, overlong)
                .map(|l| (l.range.first, l.range.last))
                .collect()
        };
        assert_eq!(wrap(80, true), vec![(0, 3)]);
        assert_eq!(wrap(2, true), vec![(0, 2), (2, 3)]);
        assert_eq!(wrap(1, true), vec![(0, 1), (1, 2), (2, 3)]);
        assert_eq!(wrap(1, false), vec![(0, 2), (2, 3)]);
    }

    #[test]
    fn test_wrapped_lines_words() {
        let cps: Vec<u32> = "aa bb cc".chars().map(|c| c as u32).collect();
        let lines: Vec<(usize, usize)> = wrapped_lines(&cps, 6, &count_extent, true)
            .map(|l| (l.range.first, l.range.last))
            .collect();
        assert_eq!(lines, vec![(0, 6), (6, 8)]);
        // every emitted line fits the budget
        for l in wrapped_lines(&cps, 6, &count_extent, true) {
            assert!(l.range.len() <= 6);
        }
    }

    #[test]
    fn test_wrapped_lines_hard_break_ends_line() {
        let cps: Vec<u32> = "ab\ncd ef".chars().map(|c| c as u32).collect();
        let lines: Vec<(usize, usize, bool)> = wrapped_lines(&cps, 80, &count_extent, true)
            .map(|l| (l.range.first, l.range.last, l.hard))
            .collect();
        assert_eq!(lines, vec![(0, 3, true), (3, 8, false)]);
    }

    #[test]
    fn test_prev_next_symmetry() {
        let corpora: Vec<Vec<u32>> = vec![
            "foo(bar), baz qux".chars().map(|c| c as u32).collect(),
            vec![0x200B, 0x20, 0x30, 0x61, 0x2D, 0x62],
            vec![0x4E00, 0x3002, 0x4E8C, 0x0A, 0x61],
        ];
        for cps in corpora {
            for p in 0..=cps.len() {
                let b = prev_allowed_line_break(&cps, p);
                assert!(b <= p);
                assert_eq!(prev_allowed_line_break(&cps, b), b);
                if b < p {
                    assert!(next_allowed_line_break(&cps, b).0 >= p);
                }
            }
        }
    }
}
