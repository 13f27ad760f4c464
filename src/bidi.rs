// The UAX #9 bidirectional algorithm: explicit embedding levels (X1..X8),
// X9 removal, level runs and BD13 run sequences, weak types (W1..W7),
// bracket pairs (N0/BD16), neutrals (N1/N2), implicit levels (I1/I2) and
// reordering (L1/L2). https://www.unicode.org/reports/tr9/
//
// The per-paragraph state is one flat PropEmbedding array; runs and run
// sequences are index ranges into it. Reordering works on the run list, so
// reversed runs are iterated lazily instead of moving code points.

use crate::line::wrapped_lines;
use crate::props::{bidi_prop, BidiProperty};
use crate::ranges::{Line, Subrange};
use crate::ucd;
use lazy_static::lazy_static;
use std::collections::HashMap;

use BidiProperty::*;

// documented maxima from UAX #9
pub const MAX_DEPTH: u8 = 125;
const BRACKET_STACK_LIMIT: usize = 63;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PropEmbedding {
    pub cp: u32,
    pub embedding: u8,
    pub prop: BidiProperty,
    pub unmatched_pdi: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct LevelRun {
    first: usize,
    last: usize,
    used: bool,
}

struct RunSequence {
    runs: Vec<LevelRun>,
    level: u8,
    sos: BidiProperty, // L or R
    eos: BidiProperty,
}

// A maximal contiguous range of the paragraph in visual order. Iterating a
// reversed run yields its code points back to front.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BidiRun {
    pub first: usize,
    pub last: usize,
    pub reversed: bool,
}

fn is_isolate_initiator(p: BidiProperty) -> bool {
    matches!(p, LRI | RLI | FSI)
}

fn removed_by_x9(p: BidiProperty) -> bool {
    matches!(p, RLE | LRE | RLO | LRO | PDF | BN)
}

fn next_odd(level: u8) -> u8 {
    (level + 1) | 1
}

fn next_even(level: u8) -> u8 {
    (level + 2) & !1
}

fn dir_of_level(level: u8) -> BidiProperty {
    if level & 1 != 0 {
        R
    } else {
        L
    }
}

lazy_static! {
    static ref BRACKET_CLOSE: HashMap<u32, u32> =
        ucd::BRACKETS.pairs.iter().map(|&[o, c]| (o, c)).collect();
    static ref BRACKET_OPEN: HashMap<u32, u32> =
        ucd::BRACKETS.pairs.iter().map(|&[o, c]| (c, o)).collect();
    static ref BRACKET_CANON: HashMap<u32, u32> = ucd::BRACKETS
        .canonical
        .iter()
        .flat_map(|&[a, b]| [(a, b)])
        .collect();
}

fn canon_bracket(cp: u32) -> u32 {
    *BRACKET_CANON.get(&cp).unwrap_or(&cp)
}

// P2/P3: the first strong character decides the paragraph direction,
// skipping over isolated runs.
pub fn paragraph_embedding_level(cps: &[u32]) -> u8 {
    let mut depth = 0usize;
    for &cp in cps {
        let p = bidi_prop(cp);
        if is_isolate_initiator(p) {
            depth += 1;
        } else if p == PDI {
            depth = depth.saturating_sub(1);
        } else if depth == 0 {
            match p {
                L => return 0,
                R | AL => return 1,
                _ => {}
            }
        }
    }
    0
}

// The direction an FSI at `idx` isolates, per P2/P3 applied to its content.
fn fsi_direction(cps: &[u32], idx: usize) -> BidiProperty {
    let mut depth = 0usize;
    for &cp in &cps[idx + 1..] {
        let p = bidi_prop(cp);
        if is_isolate_initiator(p) {
            depth += 1;
        } else if p == PDI {
            if depth == 0 {
                break;
            }
            depth -= 1;
        } else if depth == 0 {
            match p {
                L => return LRI,
                R | AL => return RLI,
                _ => {}
            }
        }
    }
    LRI
}

#[derive(Clone, Copy)]
struct Status {
    level: u8,
    override_: Option<BidiProperty>,
    isolate: bool,
}

// X1..X8 plus X9: assigns an embedding level and (possibly overridden)
// class to every code point; explicit embedding and override characters
// are turned into BN but stay in the array.
fn compute_props_and_embeddings(cps: &[u32], para_level: u8) -> Vec<PropEmbedding> {
    let mut paes = Vec::with_capacity(cps.len());
    let mut stack: Vec<Status> = Vec::with_capacity(MAX_DEPTH as usize + 2);
    stack.push(Status {
        level: para_level,
        override_: None,
        isolate: false,
    });
    let mut overflow_isolate = 0usize;
    let mut overflow_embedding = 0usize;
    let mut valid_isolate = 0usize;

    for (idx, &cp) in cps.iter().enumerate() {
        let prop = bidi_prop(cp);
        let cur = *stack.last().unwrap();
        match prop {
            RLE | LRE | RLO | LRO => {
                // X2..X5; the character itself keeps the outer level and is
                // removed later
                paes.push(PropEmbedding {
                    cp,
                    embedding: cur.level,
                    prop: BN,
                    unmatched_pdi: false,
                });
                let new_level = if matches!(prop, RLE | RLO) {
                    next_odd(cur.level)
                } else {
                    next_even(cur.level)
                };
                if new_level <= MAX_DEPTH && overflow_isolate == 0 && overflow_embedding == 0 {
                    stack.push(Status {
                        level: new_level,
                        override_: match prop {
                            RLO => Some(R),
                            LRO => Some(L),
                            _ => None,
                        },
                        isolate: false,
                    });
                } else if overflow_isolate == 0 {
                    overflow_embedding += 1;
                }
            }
            RLI | LRI | FSI => {
                // X5a..X5c; an FSI acts as the isolate its content implies
                let acts_as = if prop == FSI {
                    fsi_direction(cps, idx)
                } else {
                    prop
                };
                paes.push(PropEmbedding {
                    cp,
                    embedding: cur.level,
                    prop: cur.override_.unwrap_or(prop),
                    unmatched_pdi: false,
                });
                let new_level = if acts_as == RLI {
                    next_odd(cur.level)
                } else {
                    next_even(cur.level)
                };
                if new_level <= MAX_DEPTH && overflow_isolate == 0 && overflow_embedding == 0 {
                    valid_isolate += 1;
                    stack.push(Status {
                        level: new_level,
                        override_: None,
                        isolate: true,
                    });
                } else {
                    overflow_isolate += 1;
                }
            }
            PDI => {
                // X6a
                let mut unmatched = false;
                if overflow_isolate > 0 {
                    overflow_isolate -= 1;
                } else if valid_isolate == 0 {
                    unmatched = true;
                } else {
                    overflow_embedding = 0;
                    while !stack.last().unwrap().isolate {
                        stack.pop();
                    }
                    stack.pop();
                    valid_isolate -= 1;
                }
                let cur = *stack.last().unwrap();
                paes.push(PropEmbedding {
                    cp,
                    embedding: cur.level,
                    prop: cur.override_.unwrap_or(PDI),
                    unmatched_pdi: unmatched,
                });
            }
            PDF => {
                // X7; assigned before the pop, removed later
                paes.push(PropEmbedding {
                    cp,
                    embedding: cur.level,
                    prop: BN,
                    unmatched_pdi: false,
                });
                if overflow_isolate > 0 {
                    // ignored inside an overflowing isolate
                } else if overflow_embedding > 0 {
                    overflow_embedding -= 1;
                } else if !cur.isolate && stack.len() > 1 {
                    stack.pop();
                }
            }
            B => {
                // X8
                paes.push(PropEmbedding {
                    cp,
                    embedding: para_level,
                    prop: B,
                    unmatched_pdi: false,
                });
            }
            BN => {
                paes.push(PropEmbedding {
                    cp,
                    embedding: cur.level,
                    prop: BN,
                    unmatched_pdi: false,
                });
            }
            _ => {
                paes.push(PropEmbedding {
                    cp,
                    embedding: cur.level,
                    prop: cur.override_.unwrap_or(prop),
                    unmatched_pdi: false,
                });
            }
        }
    }
    paes
}

// BD7: maximal runs sharing an embedding level.
fn find_all_runs(paes: &[PropEmbedding]) -> Vec<LevelRun> {
    let mut runs = Vec::new();
    let mut i = 0;
    while i < paes.len() {
        let level = paes[i].embedding;
        let first = i;
        while i < paes.len() && paes[i].embedding == level {
            i += 1;
        }
        runs.push(LevelRun {
            first,
            last: i,
            used: false,
        });
    }
    runs
}

// Matches isolate initiators to their PDIs (over the original classes).
fn match_isolates(cps: &[u32]) -> (HashMap<usize, usize>, HashMap<usize, usize>) {
    let mut initiator_to_pdi = HashMap::new();
    let mut pdi_to_initiator = HashMap::new();
    let mut stack: Vec<usize> = Vec::new();
    for (i, &cp) in cps.iter().enumerate() {
        let p = bidi_prop(cp);
        if is_isolate_initiator(p) {
            stack.push(i);
        } else if p == PDI {
            if let Some(init) = stack.pop() {
                initiator_to_pdi.insert(init, i);
                pdi_to_initiator.insert(i, init);
            }
        }
    }
    (initiator_to_pdi, pdi_to_initiator)
}

// BD13: chain level runs across matched isolate initiator/PDI pairs, and
// compute sos/eos for each sequence (X10).
fn find_run_sequences(
    cps: &[u32],
    paes: &[PropEmbedding],
    runs: &mut [LevelRun],
    para_level: u8,
) -> Vec<RunSequence> {
    let (initiator_to_pdi, pdi_to_initiator) = match_isolates(cps);
    let run_starting_at: HashMap<usize, usize> =
        runs.iter().enumerate().map(|(k, r)| (r.first, k)).collect();

    let mut sequences = Vec::new();
    for k in 0..runs.len() {
        if runs[k].used {
            continue;
        }
        // a run whose first character is a matched PDI continues another
        // sequence rather than starting one
        let first_char = runs[k].first;
        if bidi_prop(cps[first_char]) == PDI && pdi_to_initiator.contains_key(&first_char) {
            continue;
        }
        let mut seq_runs = vec![runs[k]];
        runs[k].used = true;
        loop {
            let last_run = *seq_runs.last().unwrap();
            let last_char = last_run.last - 1;
            if !is_isolate_initiator(bidi_prop(cps[last_char])) {
                break;
            }
            let pdi = match initiator_to_pdi.get(&last_char) {
                Some(&pdi) => pdi,
                None => break,
            };
            let next = match run_starting_at.get(&pdi) {
                Some(&next) => next,
                None => break,
            };
            if runs[next].used {
                break;
            }
            runs[next].used = true;
            seq_runs.push(runs[next]);
        }

        let level = paes[seq_runs[0].first].embedding;
        // sos: compare against the nearest preceding non-removed character
        let mut prev_level = para_level;
        let mut j = seq_runs[0].first;
        while j > 0 {
            j -= 1;
            if !removed_by_x9(paes[j].prop) {
                prev_level = paes[j].embedding;
                break;
            }
        }
        let sos = dir_of_level(level.max(prev_level));
        // eos: against the nearest following one, or the paragraph level if
        // the sequence ends in an unmatched isolate initiator
        let last_run = *seq_runs.last().unwrap();
        let last_char = last_run.last - 1;
        let mut next_level = para_level;
        if !(is_isolate_initiator(bidi_prop(cps[last_char]))
            && !initiator_to_pdi.contains_key(&last_char))
        {
            let mut j = last_run.last;
            while j < paes.len() {
                if !removed_by_x9(paes[j].prop) {
                    next_level = paes[j].embedding;
                    break;
                }
                j += 1;
            }
        }
        let eos = dir_of_level(level.max(next_level));

        sequences.push(RunSequence {
            runs: seq_runs,
            level,
            sos,
            eos,
        });
    }
    sequences
}

// The sequence's character positions, with the BN of removed characters
// left out; every W/N rule treats them as absent.
fn sequence_positions(seq: &RunSequence, paes: &[PropEmbedding]) -> Vec<usize> {
    seq.runs
        .iter()
        .flat_map(|r| r.first..r.last)
        .filter(|&i| !removed_by_x9(paes[i].prop))
        .collect()
}

fn is_strong(p: BidiProperty) -> bool {
    matches!(p, L | R | AL)
}

// W1..W7 within one run sequence.
fn resolve_weak_types(seq: &RunSequence, paes: &mut [PropEmbedding], idxs: &[usize]) {
    // W1: NSM takes the type of its predecessor; ON after an isolate
    let mut prev = seq.sos;
    for &i in idxs {
        let p = paes[i].prop;
        if p == NSM {
            paes[i].prop = if is_isolate_initiator(prev) || prev == PDI {
                ON
            } else {
                prev
            };
        }
        prev = paes[i].prop;
    }
    // W2: EN after a last-strong AL becomes AN
    let mut last_strong = seq.sos;
    for &i in idxs {
        let p = paes[i].prop;
        if is_strong(p) {
            last_strong = p;
        } else if p == EN && last_strong == AL {
            paes[i].prop = AN;
        }
    }
    // W3
    for &i in idxs {
        if paes[i].prop == AL {
            paes[i].prop = R;
        }
    }
    // W4: a single ES/CS between numbers joins them
    for k in 1..idxs.len().saturating_sub(1) {
        let p = paes[idxs[k]].prop;
        let before = paes[idxs[k - 1]].prop;
        let after = paes[idxs[k + 1]].prop;
        if p == ES && before == EN && after == EN {
            paes[idxs[k]].prop = EN;
        } else if p == CS && before == EN && after == EN {
            paes[idxs[k]].prop = EN;
        } else if p == CS && before == AN && after == AN {
            paes[idxs[k]].prop = AN;
        }
    }
    // W5: ET runs adjacent to EN become EN
    let n = idxs.len();
    let mut k = 0;
    while k < n {
        if paes[idxs[k]].prop == ET {
            let start = k;
            while k < n && paes[idxs[k]].prop == ET {
                k += 1;
            }
            let before_en = start > 0 && paes[idxs[start - 1]].prop == EN;
            let after_en = k < n && paes[idxs[k]].prop == EN;
            if before_en || after_en {
                for &i in &idxs[start..k] {
                    paes[i].prop = EN;
                }
            }
        } else {
            k += 1;
        }
    }
    // W6: leftover separators and terminators become neutral
    for &i in idxs {
        if matches!(paes[i].prop, ES | ET | CS) {
            paes[i].prop = ON;
        }
    }
    // W7: EN after a last-strong L becomes L
    let mut last_strong = seq.sos;
    for &i in idxs {
        let p = paes[i].prop;
        if is_strong(p) {
            last_strong = p;
        } else if p == EN && last_strong == L {
            paes[i].prop = L;
        }
    }
}

// Strong direction a character contributes inside N0..N2; numbers count
// as R.
fn strong_dir(p: BidiProperty) -> Option<BidiProperty> {
    match p {
        L => Some(L),
        R | EN | AN => Some(R),
        _ => None,
    }
}

// N0 / BD16: bracket pairs take the embedding direction when their content
// or context supports it.
fn resolve_bracket_pairs(seq: &RunSequence, cps: &[u32], paes: &mut [PropEmbedding], idxs: &[usize]) {
    let e = dir_of_level(seq.level);
    let o = if e == L { R } else { L };

    let mut stack: Vec<(u32, usize)> = Vec::new();
    let mut pairs: Vec<(usize, usize)> = Vec::new();
    for (k, &i) in idxs.iter().enumerate() {
        if paes[i].prop != ON {
            continue;
        }
        let cp = cps[i];
        if let Some(&close) = BRACKET_CLOSE.get(&cp) {
            if stack.len() == BRACKET_STACK_LIMIT {
                break; // BD16: stop identifying pairs
            }
            stack.push((canon_bracket(close), k));
        } else if BRACKET_OPEN.contains_key(&cp) {
            let c = canon_bracket(cp);
            if let Some(depth) = stack.iter().rposition(|&(expected, _)| expected == c) {
                let (_, open_k) = stack[depth];
                stack.truncate(depth);
                pairs.push((open_k, k));
            }
        }
    }
    pairs.sort_unstable();

    for &(open_k, close_k) in &pairs {
        let mut found_e = false;
        let mut found_o = false;
        for &i in &idxs[open_k + 1..close_k] {
            match strong_dir(paes[i].prop) {
                Some(d) if d == e => found_e = true,
                Some(_) => found_o = true,
                None => {}
            }
        }
        let new_dir = if found_e {
            Some(e)
        } else if found_o {
            // take the context before the pair, unless it is also opposite
            let mut ctx = seq.sos;
            for &i in idxs[..open_k].iter().rev() {
                if let Some(d) = strong_dir(paes[i].prop) {
                    ctx = d;
                    break;
                }
            }
            if ctx == o {
                Some(o)
            } else {
                Some(e)
            }
        } else {
            None
        };
        if let Some(d) = new_dir {
            paes[idxs[open_k]].prop = d;
            paes[idxs[close_k]].prop = d;
            // NSMs that follow a re-typed bracket match it
            for &after in [close_k, open_k].iter() {
                let mut k = after + 1;
                while k < idxs.len() && bidi_prop(cps[idxs[k]]) == NSM {
                    paes[idxs[k]].prop = d;
                    k += 1;
                }
            }
        }
    }
}

fn is_ni(p: BidiProperty) -> bool {
    matches!(p, B | S | WS | ON | FSI | LRI | RLI | PDI)
}

// N1/N2: neutral runs take the surrounding direction, or the embedding.
fn resolve_neutrals(seq: &RunSequence, paes: &mut [PropEmbedding], idxs: &[usize]) {
    let e = dir_of_level(seq.level);
    let n = idxs.len();
    let mut k = 0;
    while k < n {
        if !is_ni(paes[idxs[k]].prop) {
            k += 1;
            continue;
        }
        let start = k;
        while k < n && is_ni(paes[idxs[k]].prop) {
            k += 1;
        }
        let before = if start == 0 {
            seq.sos
        } else {
            strong_dir(paes[idxs[start - 1]].prop).unwrap_or(e)
        };
        let after = if k == n {
            seq.eos
        } else {
            strong_dir(paes[idxs[k]].prop).unwrap_or(e)
        };
        let dir = if before == after { before } else { e };
        for &i in &idxs[start..k] {
            paes[i].prop = dir;
        }
    }
}

// I1/I2: the implicit level bumps.
fn resolve_implicit_levels(seq: &RunSequence, paes: &mut [PropEmbedding], idxs: &[usize]) {
    for &i in idxs {
        let p = paes[i].prop;
        let level = seq.level;
        paes[i].embedding = if level & 1 == 0 {
            match p {
                R => level + 1,
                AN | EN => level + 2,
                _ => level,
            }
        } else {
            match p {
                L | EN | AN => level + 1,
                _ => level,
            }
        };
    }
}

// L1: segment/paragraph separators and trailing whitespace reset to the
// paragraph level, using the original character classes.
fn l1_reset(cps: &[u32], levels: &mut [u8], para_level: u8, first: usize, last: usize) {
    let resettable = |cp: u32| -> bool {
        let p = bidi_prop(cp);
        p == WS || is_isolate_initiator(p) || p == PDI || removed_by_x9(p)
    };
    let mut i = first;
    while i < last {
        let p = bidi_prop(cps[i]);
        if p == B || p == S {
            levels[i] = para_level;
            // plus any run of whitespace and isolate controls before it
            let mut j = i;
            while j > first && resettable(cps[j - 1]) {
                j -= 1;
                levels[j] = para_level;
            }
        }
        i += 1;
    }
    // trailing whitespace at the end of the line
    let mut j = last;
    while j > first && resettable(cps[j - 1]) {
        j -= 1;
        levels[j] = para_level;
    }
}

// L2: reverse contiguous level runs from the highest level down to the
// lowest odd level, on the run list rather than the characters.
fn l2_reorder(levels: &[u8], first: usize, last: usize) -> Vec<BidiRun> {
    let mut runs: Vec<BidiRun> = Vec::new();
    let mut run_levels: Vec<u8> = Vec::new();
    let mut i = first;
    while i < last {
        let level = levels[i];
        let start = i;
        while i < last && levels[i] == level {
            i += 1;
        }
        runs.push(BidiRun {
            first: start,
            last: i,
            reversed: false,
        });
        run_levels.push(level);
    }
    let max_level = run_levels.iter().copied().max().unwrap_or(0);
    let lowest_odd = run_levels
        .iter()
        .copied()
        .filter(|l| l & 1 == 1)
        .min()
        .unwrap_or(u8::MAX);
    if lowest_odd == u8::MAX {
        return runs;
    }
    let mut l = max_level;
    loop {
        // reverse every maximal group of runs at this level or higher
        let mut k = 0;
        while k < runs.len() {
            if run_levels[k] >= l {
                let start = k;
                while k < runs.len() && run_levels[k] >= l {
                    k += 1;
                }
                runs[start..k].reverse();
                run_levels[start..k].reverse();
                for r in runs[start..k].iter_mut() {
                    r.reversed = !r.reversed;
                }
            } else {
                k += 1;
            }
        }
        if l == lowest_odd {
            break;
        }
        l -= 1;
    }
    runs
}

// The raw X1..X9 output, mostly useful for inspecting how explicit levels
// and malformed control sequences were resolved.
pub fn props_and_embeddings(cps: &[u32], para_level: Option<u8>) -> Vec<PropEmbedding> {
    let para_level = para_level.unwrap_or_else(|| paragraph_embedding_level(cps));
    compute_props_and_embeddings(cps, para_level)
}

// Per-paragraph analysis through I2; lines are reordered on demand.
pub struct BidiAnalysis<'a> {
    cps: &'a [u32],
    levels: Vec<u8>,
    pub para_level: u8,
}

// `para_level`: None selects P2/P3 auto-detection; Some(0)/Some(1) force
// LTR/RTL.
pub fn analyze(cps: &[u32], para_level: Option<u8>) -> BidiAnalysis<'_> {
    let para_level = para_level.unwrap_or_else(|| paragraph_embedding_level(cps));
    let mut paes = compute_props_and_embeddings(cps, para_level);
    let mut runs = find_all_runs(&paes);
    let sequences = find_run_sequences(cps, &paes, &mut runs, para_level);
    for seq in &sequences {
        let idxs = sequence_positions(seq, &paes);
        resolve_weak_types(seq, &mut paes, &idxs);
        resolve_bracket_pairs(seq, cps, &mut paes, &idxs);
        resolve_neutrals(seq, &mut paes, &idxs);
        resolve_implicit_levels(seq, &mut paes, &idxs);
    }
    let levels = paes.iter().map(|pe| pe.embedding).collect();
    BidiAnalysis {
        cps,
        levels,
        para_level,
    }
}

impl<'a> BidiAnalysis<'a> {
    // Visual-order runs for a slice of the paragraph, L1 and L2 applied.
    pub fn line_runs(&self, line: Subrange) -> Vec<BidiRun> {
        let mut levels = self.levels.clone();
        l1_reset(self.cps, &mut levels, self.para_level, line.first, line.last);
        l2_reorder(&levels, line.first, line.last)
    }

    pub fn paragraph_runs(&self) -> Vec<BidiRun> {
        self.line_runs(Subrange::new(0, self.cps.len()))
    }

    // Logical indices in visual order with the X9-removed characters
    // dropped; isolate controls are retained (the reference test format).
    pub fn reorder_indices(&self) -> Vec<usize> {
        let mut out = Vec::with_capacity(self.cps.len());
        for run in self.paragraph_runs() {
            let range: Vec<usize> = (run.first..run.last).collect();
            let iter: Box<dyn Iterator<Item = usize>> = if run.reversed {
                Box::new(range.into_iter().rev())
            } else {
                Box::new(range.into_iter())
            };
            for i in iter {
                if !removed_by_x9(bidi_prop(self.cps[i])) {
                    out.push(i);
                }
            }
        }
        out
    }

    // Code points in visual order; X9-removed characters and isolate
    // controls are suppressed per L1/X9.
    pub fn visual_cps(&self) -> Vec<u32> {
        self.reorder_indices()
            .into_iter()
            .filter(|&i| {
                let p = bidi_prop(self.cps[i]);
                !is_isolate_initiator(p) && p != PDI
            })
            .map(|i| self.cps[i])
            .collect()
    }
}

pub fn bidirectional_runs(cps: &[u32], para_level: Option<u8>) -> Vec<BidiRun> {
    analyze(cps, para_level).paragraph_runs()
}

// Caller-driven line splitting: break the paragraph by width, then apply
// L1/L2 per line.
pub fn bidi_lines<'a>(
    cps: &'a [u32],
    para_level: Option<u8>,
    max_extent: usize,
    cp_extent: &'a dyn Fn(&[u32]) -> usize,
    break_overlong_lines: bool,
) -> Vec<(Line, Vec<BidiRun>)> {
    let analysis = analyze(cps, para_level);
    wrapped_lines(cps, max_extent, cp_extent, break_overlong_lines)
        .map(|line| {
            let runs = analysis.line_runs(line.range);
            (line, runs)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paragraph_level_detection() {
        assert_eq!(paragraph_embedding_level(&[0x61]), 0);
        assert_eq!(paragraph_embedding_level(&[0x5D0]), 1);
        assert_eq!(paragraph_embedding_level(&[0x31, 0x20, 0x627]), 1);
        // isolated content does not decide the paragraph direction
        assert_eq!(
            paragraph_embedding_level(&[0x2067, 0x5D0, 0x2069, 0x61]),
            0
        );
        assert_eq!(paragraph_embedding_level(&[]), 0);
    }

    #[test]
    fn test_ltr_only_is_identity() {
        let cps: Vec<u32> = "hello world".chars().map(|c| c as u32).collect();
        let a = analyze(&cps, None);
        assert_eq!(a.para_level, 0);
        assert_eq!(a.reorder_indices(), (0..cps.len()).collect::<Vec<_>>());
        assert_eq!(a.visual_cps(), cps);
    }

    #[test]
    fn test_simple_rtl_run() {
        // "abc THEBREW def" with Hebrew letters reversed in the middle
        let cps = vec![0x61, 0x20, 0x5D0, 0x5D1, 0x5D2, 0x20, 0x62];
        let a = analyze(&cps, Some(0));
        assert_eq!(a.reorder_indices(), vec![0, 1, 4, 3, 2, 5, 6]);
    }

    #[test]
    fn test_rtl_paragraph_with_number() {
        // Hebrew paragraph with a number: digits stay LTR inside RTL
        let cps = vec![0x5D0, 0x5D1, 0x20, 0x31, 0x32];
        let a = analyze(&cps, None);
        assert_eq!(a.para_level, 1);
        assert_eq!(a.reorder_indices(), vec![3, 4, 2, 1, 0]);
    }

    #[test]
    fn test_weak_number_joining() {
        // "1,234" inside RTL text stays one LTR number
        let cps = vec![0x5D0, 0x20, 0x31, 0x2C, 0x32, 0x20, 0x5D1];
        let a = analyze(&cps, Some(1));
        assert_eq!(a.reorder_indices(), vec![6, 5, 2, 3, 4, 1, 0]);
    }

    #[test]
    fn test_explicit_embedding_and_isolates() {
        // ON RLE ON FSI ON R RLO L PDF ON PDI ON PDF ON, paragraph LTR
        let cps = vec![
            0x21, 0x202B, 0x21, 0x2068, 0x21, 0x5D0, 0x202E, 0x61, 0x202C, 0x21, 0x2069, 0x21,
            0x202C, 0x21,
        ];
        let a = analyze(&cps, Some(0));
        assert_eq!(
            a.reorder_indices(),
            vec![0, 11, 10, 9, 7, 5, 4, 3, 2, 13]
        );
        // the isolate controls disappear from the code point output
        let visual = a.visual_cps();
        assert!(!visual.contains(&0x2068));
        assert!(!visual.contains(&0x2069));
        assert_eq!(visual, vec![0x21, 0x21, 0x21, 0x61, 0x5D0, 0x21, 0x21, 0x21]);
    }

    #[test]
    fn test_unmatched_pdi_is_neutral() {
        // a stray PDI is flagged and does not derail the paragraph
        let cps = vec![0x61, 0x2069, 0x62];
        let paes = props_and_embeddings(&cps, None);
        assert!(paes[1].unmatched_pdi);
        assert!(!paes[0].unmatched_pdi);
        assert_eq!(paes[1].embedding, 0);
        let a = analyze(&cps, None);
        assert_eq!(a.reorder_indices(), vec![0, 1, 2]);
        // a matched PDI is not flagged
        let paes = props_and_embeddings(&[0x2066, 0x61, 0x2069], None);
        assert!(!paes[2].unmatched_pdi);
    }

    #[test]
    fn test_overflow_embeddings_are_ignored() {
        // far past the 125-level limit; the text must come out intact
        let mut cps = Vec::new();
        for _ in 0..200 {
            cps.push(0x202B);
        }
        cps.push(0x61);
        for _ in 0..200 {
            cps.push(0x202C);
        }
        let a = analyze(&cps, Some(0));
        let visual = a.visual_cps();
        assert_eq!(visual, vec![0x61]);
    }

    #[test]
    fn test_bracket_pairs() {
        // N0: brackets around RTL content inside an RTL context go RTL
        let cps = vec![0x5D0, 0x28, 0x5D1, 0x29, 0x5D2];
        let a = analyze(&cps, None);
        assert_eq!(a.para_level, 1);
        // fully reversed, brackets mirroring their content
        assert_eq!(a.reorder_indices(), vec![4, 3, 2, 1, 0]);
        // LTR content in LTR paragraph with RTL neighbors keeps brackets LTR
        let cps = vec![0x61, 0x28, 0x62, 0x5D0, 0x29, 0x63];
        let a = analyze(&cps, Some(0));
        assert_eq!(a.reorder_indices(), vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_hard_tab_resets_to_paragraph_level() {
        // L1: the segment separator and trailing whitespace take the
        // paragraph level
        let cps = vec![0x5D0, 0x5D1, 0x09, 0x5D2, 0x20];
        let a = analyze(&cps, Some(0));
        let runs = a.paragraph_runs();
        // tab and trailing space stay at level 0
        let levels: Vec<u8> = {
            let mut levels = a.levels.clone();
            super::l1_reset(&cps, &mut levels, 0, 0, cps.len());
            levels
        };
        assert_eq!(levels[2], 0);
        assert_eq!(levels[4], 0);
        assert!(!runs.is_empty());
    }

    #[test]
    fn test_bidi_lines() {
        let count = |s: &[u32]| s.len();
        let cps = vec![0x5D0, 0x5D1, 0x20, 0x5D2, 0x5D3];
        let lines = bidi_lines(&cps, Some(1), 3, &count, true);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].0.range, Subrange::new(0, 3));
        assert_eq!(lines[1].0.range, Subrange::new(3, 5));
        // each line reorders independently
        let first_line_indices: Vec<usize> = lines[0]
            .1
            .iter()
            .flat_map(|r| {
                let v: Vec<usize> = (r.first..r.last).collect();
                if r.reversed {
                    v.into_iter().rev().collect::<Vec<_>>()
                } else {
                    v
                }
            })
            .collect();
        assert_eq!(first_line_indices, vec![2, 1, 0]);
    }

    #[test]
    fn test_total_on_malformed_controls() {
        // unbalanced and nested garbage never panics and keeps every
        // non-control character
        let cps = vec![0x202C, 0x2069, 0x61, 0x202B, 0x2066, 0x5D0, 0x62, 0x2069];
        let a = analyze(&cps, None);
        let mut visual = a.visual_cps();
        visual.sort_unstable();
        let mut expect = vec![0x61, 0x5D0, 0x62];
        expect.sort_unstable();
        assert_eq!(visual, expect);
    }
}
