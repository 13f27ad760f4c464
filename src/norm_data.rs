// Normalization data in the Normalizer2 norm16 layout. Every code point maps
// through the trie to a 16-bit value whose position relative to a handful of
// thresholds answers the composition quick-check questions without touching
// the extra data:
//
//   0            trie error value (ill-formed input), behaves like inert
//   1            inert
//   2            Jamo L
//   [4, minYesNo)                    starters with only a compositions list
//   minYesNo                         Hangul LV
//   (minYesNo, minYesNoMappingsOnly) composed characters that compose further
//   minYesNoMappingsOnly | 1         Hangul LVT
//   ... mappings-only, then the no-no sections, each an offset (<<1) into
//   extra_data with bit 0 = has-composition-boundary-after
//   [limitNoNo, minMaybeYes)         algorithmic deltas, bits 2..1 = tccc class
//   0xFC00 | cc<<1                   backward-combining (maybe), cc possibly 0
//   0xFE00                           Jamo V/T
//   0xFE00 | cc<<1 (cc>0)            nonzero-cc characters that never combine
//
// The table is built once from the resources/ UCD extracts; the layout and
// the accessors below follow ICU's normalizer2impl.

use crate::helpers::{decode_utf16_prev, encode_utf16_into, is_lead_surrogate};
use crate::trie::CodePointTrie;
use crate::ucd;
use lazy_static::lazy_static;
use std::collections::{BTreeMap, HashMap};

pub const INERT: u16 = 1;
pub const JAMO_L: u16 = 2;
pub const JAMO_VT: u16 = 0xFE00;
pub const MIN_NORMAL_MAYBE_YES: u16 = 0xFC00;
pub const MIN_YES_YES_WITH_CC: u16 = 0xFE02;

pub const OFFSET_SHIFT: u32 = 1;
pub const HAS_COMP_BOUNDARY_AFTER: u16 = 1;

const DELTA_TCCC_1: u16 = 2;
const DELTA_TCCC_MASK: u16 = 6;
const DELTA_SHIFT: u32 = 3;
const MAX_DELTA: i32 = 0x40;

pub const MAPPING_HAS_CCC_LCCC_WORD: u16 = 0x80;
pub const MAPPING_LENGTH_MASK: u16 = 0x1F;

const COMP_1_LAST_TUPLE: u16 = 0x8000;
const COMP_1_TRIPLE: u16 = 1;
const COMP_1_TRAIL_LIMIT: u32 = 0x3400;
const COMP_1_TRAIL_MASK: u16 = 0x7FFE;
const COMP_1_TRAIL_SHIFT: u32 = 9;
const COMP_2_TRAIL_SHIFT: u32 = 6;
const COMP_2_TRAIL_MASK: u16 = 0xFFC0;

pub mod hangul {
    pub const JAMO_L_BASE: u32 = 0x1100;
    pub const JAMO_V_BASE: u32 = 0x1161;
    pub const JAMO_T_BASE: u32 = 0x11A7;
    pub const JAMO_L_COUNT: u32 = 19;
    pub const JAMO_V_COUNT: u32 = 21;
    pub const JAMO_T_COUNT: u32 = 28;
    pub const HANGUL_BASE: u32 = 0xAC00;
    pub const HANGUL_COUNT: u32 = JAMO_L_COUNT * JAMO_V_COUNT * JAMO_T_COUNT;
    pub const HANGUL_LIMIT: u32 = HANGUL_BASE + HANGUL_COUNT;

    pub fn is_hangul(c: u32) -> bool {
        (HANGUL_BASE..HANGUL_LIMIT).contains(&c)
    }
    pub fn is_hangul_lv(c: u32) -> bool {
        is_hangul(c) && (c - HANGUL_BASE) % JAMO_T_COUNT == 0
    }
    pub fn is_jamo_l(c: u32) -> bool {
        c.wrapping_sub(JAMO_L_BASE) < JAMO_L_COUNT
    }
    pub fn is_jamo_v(c: u32) -> bool {
        c.wrapping_sub(JAMO_V_BASE) < JAMO_V_COUNT
    }
    pub fn is_jamo_t(c: u32) -> bool {
        let t = c.wrapping_sub(JAMO_T_BASE);
        0 < t && t < JAMO_T_COUNT
    }

    // Appends the full 2- or 3-jamo decomposition of a Hangul syllable.
    pub fn decompose(c: u32, out: &mut Vec<u16>) {
        let c = c - HANGUL_BASE;
        let t = c % JAMO_T_COUNT;
        let lv = c / JAMO_T_COUNT;
        out.push((JAMO_L_BASE + lv / JAMO_V_COUNT) as u16);
        out.push((JAMO_V_BASE + lv % JAMO_V_COUNT) as u16);
        if t != 0 {
            out.push((JAMO_T_BASE + t) as u16);
        }
    }

    pub fn compose_lv(l: u32, v: u32) -> u32 {
        HANGUL_BASE + ((l - JAMO_L_BASE) * JAMO_V_COUNT + (v - JAMO_V_BASE)) * JAMO_T_COUNT
    }
}

pub struct Mapping<'a> {
    pub units: &'a [u16],
    pub lead_cc: u8,
    pub trail_cc: u8,
}

pub struct NormData {
    trie: CodePointTrie<u16>,
    extra_data: Vec<u16>,
    pub min_decomp_no_cp: u32,
    pub min_comp_no_maybe_cp: u32,
    pub min_yes_no: u16,
    pub min_yes_no_mappings_only: u16,
    pub min_no_no: u16,
    pub min_no_no_comp_boundary_before: u16,
    pub min_no_no_comp_no_maybe_cc: u16,
    pub min_no_no_empty: u16,
    pub limit_no_no: u16,
    pub min_maybe_yes: u16,
    center_no_no_delta: i32,
    small_fcd: [u8; 256],
}

lazy_static! {
    static ref NORM_DATA: NormData = NormData::build();
}

pub fn norm_data() -> &'static NormData {
    &NORM_DATA
}

impl NormData {
    // The trie stores values for surrogate code points too, but a lead
    // surrogate seen as a code point is always inert.
    pub fn norm16(&self, c: u32) -> u16 {
        if is_lead_surrogate(c) {
            INERT
        } else {
            self.trie.get(c)
        }
    }

    pub fn raw_norm16(&self, c: u32) -> u16 {
        self.trie.get(c)
    }

    pub fn trie(&self) -> &CodePointTrie<u16> {
        &self.trie
    }

    pub fn is_comp_yes_and_zero_cc(&self, norm16: u16) -> bool {
        norm16 < self.min_no_no
    }
    pub fn is_maybe_or_non_zero_cc(&self, norm16: u16) -> bool {
        norm16 >= self.min_maybe_yes
    }
    pub fn is_maybe(&self, norm16: u16) -> bool {
        self.min_maybe_yes <= norm16 && norm16 <= JAMO_VT
    }
    pub fn is_inert(norm16: u16) -> bool {
        norm16 == INERT
    }
    pub fn is_jamo_l(norm16: u16) -> bool {
        norm16 == JAMO_L
    }
    pub fn is_jamo_vt(norm16: u16) -> bool {
        norm16 == JAMO_VT
    }
    pub fn is_hangul_lv(&self, norm16: u16) -> bool {
        norm16 == self.min_yes_no
    }
    pub fn is_hangul_lvt(&self, norm16: u16) -> bool {
        norm16 == (self.min_yes_no_mappings_only | HAS_COMP_BOUNDARY_AFTER)
    }
    pub fn is_decomp_yes(&self, norm16: u16) -> bool {
        norm16 < self.min_yes_no || self.min_maybe_yes <= norm16
    }
    // Faster variant without the (theoretical) zero-cc maybes that combine
    // forward; standard data has none.
    pub fn is_most_decomp_yes_and_zero_cc(&self, norm16: u16) -> bool {
        norm16 < self.min_yes_no || norm16 == MIN_NORMAL_MAYBE_YES || norm16 == JAMO_VT
    }
    pub fn is_decomp_no_algorithmic(&self, norm16: u16) -> bool {
        norm16 >= self.limit_no_no
    }
    pub fn is_algorithmic_no_no(&self, norm16: u16) -> bool {
        self.limit_no_no <= norm16 && norm16 < self.min_maybe_yes
    }

    pub fn cc(&self, norm16: u16) -> u8 {
        if norm16 >= MIN_NORMAL_MAYBE_YES {
            return Self::cc_from_normal_yes_or_maybe(norm16);
        }
        if norm16 < self.min_no_no || self.limit_no_no <= norm16 {
            return 0;
        }
        self.cc_from_no_no(norm16)
    }
    pub fn cc_from_normal_yes_or_maybe(norm16: u16) -> u8 {
        (norm16 >> OFFSET_SHIFT) as u8
    }
    pub fn cc_from_yes_or_maybe(norm16: u16) -> u8 {
        if norm16 >= MIN_NORMAL_MAYBE_YES {
            Self::cc_from_normal_yes_or_maybe(norm16)
        } else {
            0
        }
    }
    pub fn cc_from_yes_or_maybe_cp(&self, c: u32) -> u8 {
        if c < self.min_comp_no_maybe_cp {
            return 0;
        }
        Self::cc_from_yes_or_maybe(self.norm16(c))
    }
    fn cc_from_no_no(&self, norm16: u16) -> u8 {
        let off = self.mapping_offset(norm16);
        if self.extra_data[off] & MAPPING_HAS_CCC_LCCC_WORD != 0 {
            self.extra_data[off - 1] as u8
        } else {
            0
        }
    }
    // Requires an is_comp_yes_and_zero_cc norm16.
    pub fn trail_cc_from_comp_yes_and_zero_cc(&self, norm16: u16) -> u8 {
        if norm16 <= self.min_yes_no {
            0
        } else {
            (self.extra_data[self.mapping_offset(norm16)] >> 8) as u8
        }
    }

    pub fn mapping_offset(&self, norm16: u16) -> usize {
        (norm16 >> OFFSET_SHIFT) as usize
    }

    // Requires minYesNo < norm16 < limitNoNo.
    pub fn mapping(&self, norm16: u16) -> Mapping<'_> {
        let off = self.mapping_offset(norm16);
        let first = self.extra_data[off];
        let len = (first & MAPPING_LENGTH_MASK) as usize;
        let lead_cc = if first & MAPPING_HAS_CCC_LCCC_WORD != 0 {
            (self.extra_data[off - 1] >> 8) as u8
        } else {
            0
        };
        Mapping {
            units: &self.extra_data[off + 1..off + 1 + len],
            lead_cc,
            trail_cc: (first >> 8) as u8,
        }
    }

    // Requires an algorithmic-no-no norm16.
    pub fn map_algorithmic(&self, c: u32, norm16: u16) -> u32 {
        (c as i32 + ((norm16 >> DELTA_SHIFT) as i32 - self.center_no_no_delta)) as u32
    }

    pub fn compositions_list_for_decomp_yes(&self, norm16: u16) -> Option<usize> {
        if norm16 < JAMO_L || MIN_NORMAL_MAYBE_YES <= norm16 {
            None
        } else {
            // standard data has no maybe-with-compositions section, so every
            // remaining decomp-yes list lives at the plain mapping offset
            Some(self.mapping_offset(norm16))
        }
    }
    pub fn compositions_list_for_composite(&self, norm16: u16) -> usize {
        let off = self.mapping_offset(norm16);
        off + 1 + (self.extra_data[off] & MAPPING_LENGTH_MASK) as usize
    }

    // Searches a compositions list for a backward-combining trail character.
    // Returns composite<<1 | combines-forward, or -1.
    pub fn combine(&self, mut list: usize, trail: u32) -> i32 {
        let e = &self.extra_data;
        if trail < COMP_1_TRAIL_LIMIT {
            // the trail character is 0..33FF; the entry may have 2 or 3 units
            let key1 = (trail << 1) as u16;
            let mut first = e[list];
            while key1 > first {
                list += 2 + (first & COMP_1_TRIPLE) as usize;
                first = e[list];
            }
            if key1 == first & COMP_1_TRAIL_MASK {
                if first & COMP_1_TRIPLE != 0 {
                    return ((e[list + 1] as i32) << 16) | e[list + 2] as i32;
                } else {
                    return e[list + 1] as i32;
                }
            }
        } else {
            // the trail character is 3400..10FFFF; the entry has 3 units
            let key1 = COMP_1_TRAIL_LIMIT as u16
                + (((trail >> COMP_1_TRAIL_SHIFT) as u16) & !COMP_1_TRIPLE);
            let key2 = (trail << COMP_2_TRAIL_SHIFT) as u16;
            loop {
                let first = e[list];
                if key1 > first {
                    list += 2 + (first & COMP_1_TRIPLE) as usize;
                } else if key1 == first & COMP_1_TRAIL_MASK {
                    let second = e[list + 1];
                    if key2 > second {
                        if first & COMP_1_LAST_TUPLE != 0 {
                            break;
                        }
                        list += 3;
                    } else if key2 == second & COMP_2_TRAIL_MASK {
                        return (((second & !COMP_2_TRAIL_MASK) as i32) << 16)
                            | e[list + 2] as i32;
                    } else {
                        break;
                    }
                } else {
                    break;
                }
            }
        }
        -1
    }

    pub fn has_comp_boundary_before_n16(&self, norm16: u16) -> bool {
        norm16 < self.min_no_no_comp_no_maybe_cc || self.is_algorithmic_no_no(norm16)
    }
    pub fn has_comp_boundary_before_cp(&self, c: u32) -> bool {
        c < self.min_comp_no_maybe_cp || self.has_comp_boundary_before_n16(self.norm16(c))
    }
    pub fn has_comp_boundary_after(&self, norm16: u16, only_contiguous: bool) -> bool {
        (norm16 & HAS_COMP_BOUNDARY_AFTER) != 0
            && (!only_contiguous || self.is_trail_cc01_for_comp_boundary_after(norm16))
    }
    // For FCC: given a norm16 with the boundary-after bit, is tccc <= 1?
    fn is_trail_cc01_for_comp_boundary_after(&self, norm16: u16) -> bool {
        Self::is_inert(norm16)
            || (if self.is_decomp_no_algorithmic(norm16) {
                (norm16 & DELTA_TCCC_MASK) <= DELTA_TCCC_1
            } else {
                self.extra_data[self.mapping_offset(norm16)] <= 0x1FF
            })
    }

    // lccc in bits 15..8, tccc in bits 7..0.
    pub fn fcd16(&self, c: u32) -> u16 {
        if c < self.min_decomp_no_cp {
            return 0;
        } else if c <= 0xFFFF && !self.single_lead_might_have_non_zero_fcd16(c) {
            return 0;
        }
        self.fcd16_from_norm_data(c)
    }
    fn single_lead_might_have_non_zero_fcd16(&self, lead: u32) -> bool {
        let bits = self.small_fcd[(lead >> 8) as usize];
        if bits == 0 {
            return false;
        }
        (bits >> ((lead >> 5) & 7)) & 1 != 0
    }
    fn fcd16_from_norm_data(&self, c: u32) -> u16 {
        let mut c = c;
        let mut norm16 = self.norm16(c);
        if norm16 >= self.limit_no_no {
            if norm16 >= MIN_NORMAL_MAYBE_YES {
                // combining mark
                let cc = Self::cc_from_normal_yes_or_maybe(norm16) as u16;
                return cc | (cc << 8);
            } else if norm16 >= self.min_maybe_yes {
                return 0;
            } else {
                // algorithmic: the delta bits carry the tccc class
                let delta_tccc = norm16 & DELTA_TCCC_MASK;
                if delta_tccc <= DELTA_TCCC_1 {
                    return delta_tccc >> OFFSET_SHIFT;
                }
                c = self.map_algorithmic(c, norm16);
                norm16 = self.raw_norm16(c);
            }
        }
        if norm16 <= self.min_yes_no || self.is_hangul_lvt(norm16) {
            return 0;
        }
        let off = self.mapping_offset(norm16);
        let first = self.extra_data[off];
        let mut fcd = first >> 8;
        if first & MAPPING_HAS_CCC_LCCC_WORD != 0 {
            fcd |= self.extra_data[off - 1] & 0xFF00;
        }
        fcd
    }

    pub fn previous_trail_cc_utf16(&self, units: &[u16]) -> u8 {
        if units.is_empty() {
            return 0;
        }
        let (c, _) = decode_utf16_prev(units, units.len());
        self.fcd16(c) as u8
    }
    pub fn previous_trail_cc_utf8(&self, bytes: &[u8]) -> u8 {
        if bytes.is_empty() {
            return 0;
        }
        let (c, _) = crate::helpers::decode_utf8_prev(bytes, bytes.len());
        match c {
            Some(c) => self.fcd16(c) as u8,
            None => 0,
        }
    }

    // ---------------------------------------------------------------- builder

    fn build() -> NormData {
        let decomp = &*ucd::DECOMPOSITION_MAPPINGS;
        let maybe = &*ucd::NFC_QC_M;
        let qc_no = &*ucd::NFC_QC_N;

        let mut by_lead: BTreeMap<u32, Vec<(u32, u32)>> = BTreeMap::new();
        let mut comp_map: HashMap<(u32, u32), u32> = HashMap::new();
        for &([lead, trail], composite) in ucd::PRIMARY_COMPOSITES.iter() {
            by_lead.entry(lead).or_default().push((trail, composite));
            comp_map.insert((lead, trail), composite);
        }
        for list in by_lead.values_mut() {
            list.sort_unstable();
        }

        let cc = ucd::combining_class;

        // every code point that needs a non-inert norm16
        let mut interesting: std::collections::BTreeSet<u32> = std::collections::BTreeSet::new();
        interesting.extend(decomp.keys());
        interesting.extend(maybe.iter());
        interesting.extend(by_lead.keys());
        for &(lo, hi, _) in ucd::nonzero_combining_classes() {
            interesting.extend(lo..hi);
        }
        interesting.retain(|&c| {
            !hangul::is_hangul(c)
                && !hangul::is_jamo_l(c)
                && !(hangul::JAMO_V_BASE..=0x11C2).contains(&c)
        });

        let mut yes_yes_list: Vec<u32> = Vec::new();
        let mut yes_no_with: Vec<u32> = Vec::new();
        let mut yes_no_plain: Vec<u32> = Vec::new();
        let mut no_no_d: Vec<u32> = Vec::new();
        let mut no_no_e: Vec<u32> = Vec::new();
        let mut no_no_f: Vec<u32> = Vec::new();
        let mut algorithmic: Vec<(u32, u32)> = Vec::new();

        let mut values = vec![INERT; 0x110000];

        for &c in &interesting {
            let is_maybe = maybe.contains(&c);
            let is_lead = by_lead.contains_key(&c);
            match decomp.get(&c) {
                None => {
                    let ccc = cc(c);
                    if is_maybe {
                        // backward-combining; standard data never combines
                        // both ways, so no compositions list is needed here
                        assert!(!is_lead, "maybe with compositions: U+{:04X}", c);
                        values[c as usize] = MIN_NORMAL_MAYBE_YES | ((ccc as u16) << OFFSET_SHIFT);
                    } else if ccc != 0 {
                        values[c as usize] = JAMO_VT | ((ccc as u16) << OFFSET_SHIFT);
                    } else if is_lead {
                        yes_yes_list.push(c);
                    }
                }
                Some(m) => {
                    assert!(!is_maybe, "decomposable maybe: U+{:04X}", c);
                    if !qc_no.contains(&c) {
                        if is_lead {
                            yes_no_with.push(c);
                        } else {
                            yes_no_plain.push(c);
                        }
                    } else {
                        let lead_cp = m[0];
                        let boundary_before = cc(lead_cp) == 0 && !maybe.contains(&lead_cp);
                        if m.len() == 1 {
                            let target = m[0];
                            let delta = target as i32 - c as i32;
                            let target_comp_yes = cc(target) == 0
                                && !maybe.contains(&target)
                                && !qc_no.contains(&target);
                            if target_comp_yes && delta.abs() <= MAX_DELTA {
                                algorithmic.push((c, target));
                                continue;
                            }
                        }
                        let comp_normalized = compose_canonical(m, &comp_map) == *m;
                        if comp_normalized && boundary_before {
                            no_no_d.push(c);
                        } else if boundary_before {
                            no_no_e.push(c);
                        } else {
                            no_no_f.push(c);
                        }
                    }
                }
            }
        }

        for c in hangul::JAMO_L_BASE..hangul::JAMO_L_BASE + hangul::JAMO_L_COUNT {
            values[c as usize] = JAMO_L;
        }
        for c in hangul::JAMO_V_BASE..hangul::JAMO_V_BASE + hangul::JAMO_V_COUNT {
            values[c as usize] = JAMO_VT;
        }
        for c in hangul::JAMO_T_BASE + 1..hangul::JAMO_T_BASE + hangul::JAMO_T_COUNT {
            values[c as usize] = JAMO_VT;
        }

        // reserved slots: offset 0 backs `inert`, offset 1 backs Jamo L's
        // harmless empty compositions list
        let mut extra: Vec<u16> = vec![0xFFFE, 0xFFFE];

        let write_comp_list = |c: u32, extra: &mut Vec<u16>| {
            let list = &by_lead[&c];
            for (i, &(trail, composite)) in list.iter().enumerate() {
                let last = if i + 1 == list.len() {
                    COMP_1_LAST_TUPLE
                } else {
                    0
                };
                let caf: u32 = (composite << 1) | by_lead.contains_key(&composite) as u32;
                if trail < COMP_1_TRAIL_LIMIT {
                    if caf <= 0xFFFF {
                        extra.push(last | ((trail << 1) as u16));
                        extra.push(caf as u16);
                    } else {
                        extra.push(last | ((trail << 1) as u16) | COMP_1_TRIPLE);
                        extra.push((caf >> 16) as u16);
                        extra.push(caf as u16);
                    }
                } else {
                    let key1 = COMP_1_TRAIL_LIMIT as u16
                        + (((trail >> COMP_1_TRAIL_SHIFT) as u16) & !COMP_1_TRIPLE);
                    extra.push(last | key1 | COMP_1_TRIPLE);
                    extra.push((((trail << COMP_2_TRAIL_SHIFT) as u16) & COMP_2_TRAIL_MASK)
                        | (caf >> 16) as u16);
                    extra.push(caf as u16);
                }
            }
        };

        // writes the optional ccc/lccc word plus the mapping, returning the
        // offset of the first unit and the mapping's trail cc
        let write_mapping = |c: u32, extra: &mut Vec<u16>| -> (usize, u8, u8) {
            let m = &decomp[&c];
            let lccc = cc(m[0]);
            let tccc = cc(*m.last().unwrap());
            let own_ccc = cc(c);
            let mut units: Vec<u16> = Vec::new();
            for &cp in m {
                encode_utf16_into(cp, &mut units);
            }
            assert!(units.len() <= MAPPING_LENGTH_MASK as usize);
            let mut first = ((tccc as u16) << 8) | units.len() as u16;
            if lccc != 0 || own_ccc != 0 {
                first |= MAPPING_HAS_CCC_LCCC_WORD;
                extra.push(((lccc as u16) << 8) | own_ccc as u16);
            }
            let off = extra.len();
            extra.push(first);
            extra.extend_from_slice(&units);
            (off, tccc, lccc)
        };

        // does text after this mapping compose independently of it?
        let mapping_boundary_after = |c: u32, tccc: u8| -> bool {
            let m = &decomp[&c];
            let last = *m.last().unwrap();
            tccc == 0
                && !by_lead.contains_key(&last)
                && !hangul::is_jamo_l(last)
                && !hangul::is_jamo_v(last)
        };

        for &c in &yes_yes_list {
            let off = extra.len();
            write_comp_list(c, &mut extra);
            values[c as usize] = (off as u16) << OFFSET_SHIFT;
        }

        let lv_off = extra.len();
        extra.push(0);
        let min_yes_no = (lv_off as u16) << OFFSET_SHIFT;

        for &c in &yes_no_with {
            let (off, _, _) = write_mapping(c, &mut extra);
            write_comp_list(c, &mut extra);
            // composes further, so no boundary after
            values[c as usize] = (off as u16) << OFFSET_SHIFT;
        }

        let lvt_off = extra.len();
        extra.push(0);
        let min_yes_no_mappings_only = (lvt_off as u16) << OFFSET_SHIFT;

        for &c in &yes_no_plain {
            let (off, tccc, _) = write_mapping(c, &mut extra);
            let bit = if mapping_boundary_after(c, tccc) {
                HAS_COMP_BOUNDARY_AFTER
            } else {
                0
            };
            values[c as usize] = ((off as u16) << OFFSET_SHIFT) | bit;
        }

        let min_no_no = (extra.len() as u16) << OFFSET_SHIFT;
        for &c in &no_no_d {
            let (off, tccc, _) = write_mapping(c, &mut extra);
            let bit = if mapping_boundary_after(c, tccc) {
                HAS_COMP_BOUNDARY_AFTER
            } else {
                0
            };
            values[c as usize] = ((off as u16) << OFFSET_SHIFT) | bit;
        }
        let min_no_no_comp_boundary_before = (extra.len() as u16) << OFFSET_SHIFT;
        for &c in &no_no_e {
            let (off, tccc, _) = write_mapping(c, &mut extra);
            let bit = if mapping_boundary_after(c, tccc) {
                HAS_COMP_BOUNDARY_AFTER
            } else {
                0
            };
            values[c as usize] = ((off as u16) << OFFSET_SHIFT) | bit;
        }
        let min_no_no_comp_no_maybe_cc = (extra.len() as u16) << OFFSET_SHIFT;
        for &c in &no_no_f {
            let (off, _, _) = write_mapping(c, &mut extra);
            values[c as usize] = (off as u16) << OFFSET_SHIFT;
        }
        // canonical data maps nothing to the empty string
        let limit_no_no = (extra.len() as u16) << OFFSET_SHIFT;
        let min_no_no_empty = limit_no_no;

        assert!((extra.len() << OFFSET_SHIFT) < 0xF7F8, "extra data overflow");

        let min_maybe_yes = MIN_NORMAL_MAYBE_YES;
        let center_no_no_delta = ((min_maybe_yes as u32 >> DELTA_SHIFT) as i32) - MAX_DELTA - 1;

        for &(c, target) in &algorithmic {
            let delta = target as i32 - c as i32;
            let bit = values[target as usize] & HAS_COMP_BOUNDARY_AFTER;
            // eligible targets have cc 0 and no decomposition, so tccc is 0
            values[c as usize] = (((delta + center_no_no_delta) as u16) << DELTA_SHIFT) | bit;
        }

        for c in (hangul::HANGUL_BASE..hangul::HANGUL_LIMIT).step_by(hangul::JAMO_T_COUNT as usize)
        {
            values[c as usize] = min_yes_no;
            for t in 1..hangul::JAMO_T_COUNT {
                values[(c + t) as usize] = min_yes_no_mappings_only | HAS_COMP_BOUNDARY_AFTER;
            }
        }

        let mut min_comp_no_maybe_cp = 0x110000u32;
        let mut min_decomp_no_cp = 0x110000u32;
        for (c, &v) in values.iter().enumerate() {
            if v >= min_no_no && min_comp_no_maybe_cp == 0x110000 {
                min_comp_no_maybe_cp = c as u32;
            }
            if !(v < min_yes_no || v == MIN_NORMAL_MAYBE_YES || v == JAMO_VT)
                && min_decomp_no_cp == 0x110000
            {
                min_decomp_no_cp = c as u32;
            }
            if min_comp_no_maybe_cp != 0x110000 && min_decomp_no_cp != 0x110000 {
                break;
            }
        }

        let trie = CodePointTrie::from_values(&values, INERT, 0);

        let mut data = NormData {
            trie,
            extra_data: extra,
            min_decomp_no_cp,
            min_comp_no_maybe_cp,
            min_yes_no,
            min_yes_no_mappings_only,
            min_no_no,
            min_no_no_comp_boundary_before,
            min_no_no_comp_no_maybe_cc,
            min_no_no_empty,
            limit_no_no,
            min_maybe_yes,
            center_no_no_delta,
            small_fcd: [0u8; 256],
        };

        let mut small_fcd = [0u8; 256];
        for c in 0..0x10000u32 {
            if data.fcd16_from_norm_data(c) != 0 {
                small_fcd[(c >> 8) as usize] |= 1 << ((c >> 5) & 7);
            }
        }
        data.small_fcd = small_fcd;
        data
    }
}

// Build-time canonical composition of an already-decomposed sequence; used
// to decide whether a no-no mapping is itself in composed form.
fn compose_canonical(nfd: &[u32], comp: &HashMap<(u32, u32), u32>) -> Vec<u32> {
    let mut out: Vec<u32> = Vec::new();
    let mut last_starter: Option<usize> = None;
    let mut last_cc = 0u8;
    for &c in nfd {
        let ccc = ucd::combining_class(c);
        if let Some(si) = last_starter {
            let not_blocked = out.len() - 1 == si || (last_cc != 0 && last_cc < ccc);
            if not_blocked {
                let s = out[si];
                let composite = if hangul::is_jamo_l(s) && hangul::is_jamo_v(c) {
                    Some(hangul::compose_lv(s, c))
                } else if hangul::is_hangul_lv(s) && hangul::is_jamo_t(c) {
                    Some(s + (c - hangul::JAMO_T_BASE))
                } else {
                    comp.get(&(s, c)).copied()
                };
                if let Some(composite) = composite {
                    out[si] = composite;
                    continue;
                }
            }
        }
        if ccc == 0 {
            last_starter = Some(out.len());
        }
        out.push(c);
        last_cc = ccc;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thresholds_partition() {
        let d = norm_data();
        assert!(JAMO_L < d.min_yes_no);
        assert!(d.min_yes_no < d.min_yes_no_mappings_only);
        assert!(d.min_yes_no_mappings_only < d.min_no_no);
        assert!(d.min_no_no <= d.min_no_no_comp_boundary_before);
        assert!(d.min_no_no_comp_boundary_before <= d.min_no_no_comp_no_maybe_cc);
        assert!(d.min_no_no_comp_no_maybe_cc <= d.limit_no_no);
        assert!(d.limit_no_no < d.min_maybe_yes);
        assert_eq!(d.min_maybe_yes, MIN_NORMAL_MAYBE_YES);
        assert_eq!(d.min_comp_no_maybe_cp, 0x300);
        assert_eq!(d.min_decomp_no_cp, 0xC0);
    }

    #[test]
    fn test_classification() {
        let d = norm_data();
        // inert letters
        assert_eq!(d.norm16(0x62), INERT);
        // 'a' combines forward only
        let a = d.norm16(0x61);
        assert!(d.is_comp_yes_and_zero_cc(a));
        assert!(d.is_decomp_yes(a));
        assert!(d.compositions_list_for_decomp_yes(a).is_some());
        // é is composed and composes no further
        let e_acute = d.norm16(0xE9);
        assert!(d.is_comp_yes_and_zero_cc(e_acute));
        assert!(!d.is_decomp_yes(e_acute));
        // ê composes further (ê + acute = ế)
        let e_circ = d.norm16(0xEA);
        assert!(d.is_comp_yes_and_zero_cc(e_circ));
        assert_eq!(
            d.combine(d.compositions_list_for_composite(e_circ), 0x301) >> 1,
            0x1EBF
        );
        // combining acute combines backward
        let acute = d.norm16(0x301);
        assert!(d.is_maybe_or_non_zero_cc(acute));
        assert!(d.is_maybe(acute));
        assert_eq!(d.cc(acute), 230);
        // 0344 is a decomposing combining mark (no boundary before)
        let n344 = d.norm16(0x344);
        assert!(!d.is_comp_yes_and_zero_cc(n344));
        assert!(!d.has_comp_boundary_before_n16(n344));
        assert_eq!(d.cc(n344), 230);
        let m = d.mapping(n344);
        assert_eq!(m.units, &[0x308, 0x301]);
        assert_eq!(m.lead_cc, 230);
        assert_eq!(m.trail_cc, 230);
        // Hangul
        assert!(NormData::is_jamo_l(d.norm16(0x1100)));
        assert!(NormData::is_jamo_vt(d.norm16(0x1161)));
        assert!(NormData::is_jamo_vt(d.norm16(0x11A8)));
        assert!(d.is_hangul_lv(d.norm16(0xAC00)));
        assert!(d.is_hangul_lvt(d.norm16(0xAC01)));
        // lead surrogate code points are inert
        assert_eq!(d.norm16(0xD800), INERT);
    }

    #[test]
    fn test_algorithmic_mapping() {
        let d = norm_data();
        // U+2000 EN QUAD -> U+2002 EN SPACE, a tiny delta
        let n = d.norm16(0x2000);
        assert!(d.is_algorithmic_no_no(n));
        assert_eq!(d.map_algorithmic(0x2000, n), 0x2002);
        // U+212B ANGSTROM SIGN is far from U+00C5, so it gets a mapping
        let n = d.norm16(0x212B);
        assert!(!d.is_algorithmic_no_no(n));
        assert!(!d.is_comp_yes_and_zero_cc(n));
        assert_eq!(d.mapping(n).units, &[0x41, 0x30A]);
    }

    #[test]
    fn test_combine_supplementary_trail() {
        let d = norm_data();
        // U+1D157 + U+1D165 -> U+1D15E (musical symbols, trail above 0x3400)
        let lead = d.norm16(0x1D157);
        let list = d
            .compositions_list_for_decomp_yes(lead)
            .expect("1D157 combines forward");
        assert_eq!(d.combine(list, 0x1D165) >> 1, 0x1D15E);
        assert_eq!(d.combine(list, 0x1D166), -1);
    }

    #[test]
    fn test_fcd16() {
        let d = norm_data();
        assert_eq!(d.fcd16(0x61), 0);
        assert_eq!(d.fcd16(0x300), 0xE6E6);
        assert_eq!(d.fcd16(0xE9), 0x00E6); // lccc 0, tccc 230
        assert_eq!(d.fcd16(0x344), 0xE6E6);
        assert_eq!(d.fcd16(0xAC00), 0);
        assert_eq!(d.fcd16(0x2000), 0);
    }
}
