// NFC / FCC / NFD normalization over UTF-8 and UTF-16 input.
// https://www.unicode.org/reports/tr15/
//
// The composing forms run the Normalizer2 algorithm: a fast scan copies
// runs that are already composed and in canonical order, a handful of
// medium paths handle mappings that sit between composition boundaries
// (including arithmetic Hangul), and everything else falls back to
// decompose-into-scratch + recompose. With no sink attached the same loops
// answer is-normalized instead, comparing the recomposed segment against
// the input.

use crate::buffer::ReorderingBuffer;
use crate::helpers::{
    combine_surrogates, decode_utf8, decode_utf8_prev, decode_utf16, encode_utf8_into,
    is_lead_surrogate, is_trail_surrogate, utf16_len, utf16_to_utf32, utf32_to_utf16,
};
use crate::norm_data::{hangul, norm_data, NormData, JAMO_VT, MIN_YES_YES_WITH_CC};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Form {
    Nfc,
    // Fast C Contiguous: compose only when nothing intervenes between the
    // starter and the combining mark. http://www.unicode.org/notes/tn5/#FCC
    Fcc,
    Nfd,
    // NFKC/NFKD intentionally absent: this crate carries canonical data only.
}

#[derive(Debug, PartialEq)]
pub enum IsNormalised {
    Yes,
    No,
    Maybe,
}

pub trait Utf16Sink {
    fn write_utf16(&mut self, units: &[u16]);
}

impl Utf16Sink for Vec<u16> {
    fn write_utf16(&mut self, units: &[u16]) {
        self.extend_from_slice(units);
    }
}

pub trait Utf8Sink {
    fn write_utf8(&mut self, bytes: &[u8]);
}

impl Utf8Sink for Vec<u8> {
    fn write_utf8(&mut self, bytes: &[u8]) {
        self.extend_from_slice(bytes);
    }
}

// Transcoding adapter so the UTF-16 engines can feed a UTF-8 sink.
struct Utf16ToUtf8<'a> {
    out: &'a mut dyn Utf8Sink,
}

impl<'a> Utf16Sink for Utf16ToUtf8<'a> {
    fn write_utf16(&mut self, units: &[u16]) {
        let mut bytes = Vec::with_capacity(units.len() * 3);
        let mut pos = 0;
        while pos < units.len() {
            let (cp, next) = decode_utf16(units, pos);
            pos = next;
            if crate::helpers::is_surrogate(cp) {
                encode_utf8_into(0xFFFD, &mut bytes);
            } else {
                encode_utf8_into(cp, &mut bytes);
            }
        }
        self.out.write_utf8(&bytes);
    }
}

// ---------------------------------------------------------------- public API

pub fn normalize_utf16_to(form: Form, src: &[u16], sink: &mut dyn Utf16Sink) {
    let n = Normalizer::new();
    match form {
        Form::Nfc => {
            n.compose_utf16(src, false, Some(sink));
        }
        Form::Fcc => {
            n.compose_utf16(src, true, Some(sink));
        }
        Form::Nfd => {
            n.decompose_utf16_to(src, sink);
        }
    }
}

pub fn is_normalized_utf16(form: Form, src: &[u16]) -> bool {
    let n = Normalizer::new();
    match form {
        Form::Nfc => n.compose_utf16(src, false, None),
        Form::Fcc => n.compose_utf16(src, true, None),
        Form::Nfd => n.decompose_utf16(src, None),
    }
}

pub fn normalize_utf8_to(form: Form, src: &[u8], sink: &mut dyn Utf8Sink) {
    let n = Normalizer::new();
    match form {
        Form::Nfc => {
            n.compose_utf8(src, false, Some(sink));
        }
        Form::Fcc => {
            n.compose_utf8(src, true, Some(sink));
        }
        Form::Nfd => {
            // ill-formed bytes degrade to U+FFFD on this path
            let units: Vec<u16> =
                utf32_to_utf16(&crate::cp_iter::code_points(src));
            let mut adapter = Utf16ToUtf8 { out: sink };
            n.decompose_utf16_to(&units, &mut adapter);
        }
    }
}

pub fn is_normalized_utf8(form: Form, src: &[u8]) -> bool {
    let n = Normalizer::new();
    match form {
        Form::Nfc => n.compose_utf8(src, false, None),
        Form::Fcc => n.compose_utf8(src, true, None),
        Form::Nfd => {
            let units: Vec<u16> =
                utf32_to_utf16(&crate::cp_iter::code_points(src));
            n.decompose_utf16(&units, None)
        }
    }
}

pub fn normalize_utf32(form: Form, cps: &[u32]) -> Vec<u32> {
    let units = utf32_to_utf16(cps);
    let mut out: Vec<u16> = Vec::with_capacity(units.len());
    normalize_utf16_to(form, &units, &mut out);
    utf16_to_utf32(&out)
}

pub fn is_normalized_utf32(form: Form, cps: &[u32]) -> bool {
    is_normalized_utf16(form, &utf32_to_utf16(cps))
}

pub fn to_nfc_bytes(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len());
    normalize_utf8_to(Form::Nfc, bytes, &mut out);
    out
}

pub fn to_fcc_bytes(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len());
    normalize_utf8_to(Form::Fcc, bytes, &mut out);
    out
}

pub fn to_nfd_bytes(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len() * 2);
    normalize_utf8_to(Form::Nfd, bytes, &mut out);
    out
}

// Property-level quick check over code points, per
// https://www.unicode.org/reports/tr15/#Detecting_Normalization_Forms.
// Composing forms can answer Maybe; NFD never does.
pub fn quick_check(code_points: &[u32], form: Form) -> IsNormalised {
    let d = norm_data();
    let mut last_cc = 0u8;
    let mut result = IsNormalised::Yes;
    for &cp in code_points {
        let norm16 = d.norm16(cp);
        let cc = d.cc(norm16);
        if last_cc > cc && cc != 0 {
            return IsNormalised::No;
        }
        match form {
            Form::Nfd => {
                if !d.is_decomp_yes(norm16) {
                    return IsNormalised::No;
                }
            }
            Form::Nfc | Form::Fcc => {
                if d.is_comp_yes_and_zero_cc(norm16) || norm16 >= MIN_YES_YES_WITH_CC {
                    // yes
                } else if d.is_maybe_or_non_zero_cc(norm16) {
                    result = IsNormalised::Maybe;
                } else {
                    return IsNormalised::No;
                }
            }
        }
        last_cc = cc;
    }
    result
}

// ---------------------------------------------------------------- the engine

struct Normalizer {
    data: &'static NormData,
}

impl Normalizer {
    fn new() -> Self {
        Normalizer { data: norm_data() }
    }

    fn decompose_utf16_to(&self, src: &[u16], sink: &mut dyn Utf16Sink) {
        let mut buffer = ReorderingBuffer::new(self.data, sink);
        self.decompose_utf16_impl(src, true, &mut buffer);
        buffer.flush();
    }

    fn decompose_utf16(&self, src: &[u16], sink: Option<&mut dyn Utf16Sink>) -> bool {
        match sink {
            Some(sink) => {
                self.decompose_utf16_to(src, sink);
                true
            }
            None => {
                let mut dummy: Vec<u16> = Vec::new();
                let mut buffer = ReorderingBuffer::new(self.data, &mut dummy);
                self.decompose_utf16_impl(src, false, &mut buffer)
            }
        }
    }

    // Dual mode: write=true decomposes into the buffer, write=false answers
    // is-NFD without touching it.
    fn decompose_utf16_impl(
        &self,
        src: &[u16],
        write: bool,
        buffer: &mut ReorderingBuffer,
    ) -> bool {
        let d = self.data;
        let n = src.len();
        let min_no_cp = d.min_decomp_no_cp;

        let mut pos = 0usize;
        let mut prev_cc = 0u8;

        loop {
            // scan code units below the minimum or with irrelevant data
            let prev_src = pos;
            let mut c = 0u32;
            let mut norm16 = 0u16;
            while pos != n {
                c = src[pos] as u32;
                if c < min_no_cp {
                    pos += 1;
                    continue;
                }
                if !is_lead_surrogate(c) {
                    norm16 = d.trie().fast_bmp_get(c);
                    if d.is_most_decomp_yes_and_zero_cc(norm16) {
                        pos += 1;
                        continue;
                    }
                    break;
                }
                if pos + 1 < n && is_trail_surrogate(src[pos + 1] as u32) {
                    let cp = combine_surrogates(c, src[pos + 1] as u32);
                    norm16 = d.trie().fast_supp_get(cp);
                    if d.is_most_decomp_yes_and_zero_cc(norm16) {
                        pos += 2;
                        continue;
                    }
                    c = cp;
                    break;
                }
                pos += 1; // unpaired lead surrogate: inert
            }
            if pos != prev_src {
                if write {
                    buffer.append_zero_cc(&src[prev_src..pos]);
                } else {
                    prev_cc = 0;
                }
            }
            if pos == n {
                break;
            }

            // one above-minimum, relevant code point
            pos += utf16_len(c);
            if write {
                self.decompose_cp(c, norm16, buffer);
            } else {
                if d.is_decomp_yes(norm16) {
                    let cc = NormData::cc_from_yes_or_maybe(norm16);
                    if prev_cc <= cc || cc == 0 {
                        prev_cc = cc;
                        continue;
                    }
                }
                return false; // "no", or cc out of order
            }
        }
        true
    }

    fn decompose_cp(&self, c: u32, norm16: u16, buffer: &mut ReorderingBuffer) {
        let d = self.data;
        let mut c = c;
        let mut norm16 = norm16;
        if norm16 >= d.limit_no_no {
            if d.is_maybe_or_non_zero_cc(norm16) {
                buffer.append(c, NormData::cc_from_yes_or_maybe(norm16));
                return;
            }
            // maps to a single comp-yes-and-zero-cc code point
            c = d.map_algorithmic(c, norm16);
            norm16 = d.raw_norm16(c);
        }
        if norm16 < d.min_yes_no {
            // c does not decompose
            buffer.append(c, 0);
        } else if d.is_hangul_lv(norm16) || d.is_hangul_lvt(norm16) {
            let mut jamos: Vec<u16> = Vec::with_capacity(3);
            hangul::decompose(c, &mut jamos);
            buffer.append_zero_cc(&jamos);
        } else {
            let m = d.mapping(norm16);
            buffer.append_mapping(m.units, m.lead_cc, m.trail_cc);
        }
    }

    fn compose_utf16(&self, src: &[u16], only_contiguous: bool, sink: Option<&mut dyn Utf16Sink>) -> bool {
        match sink {
            Some(sink) => {
                let mut buffer = ReorderingBuffer::new(self.data, sink);
                let r = self.compose_utf16_impl(src, only_contiguous, true, &mut buffer);
                buffer.flush();
                r
            }
            None => {
                let mut dummy: Vec<u16> = Vec::new();
                let mut buffer = ReorderingBuffer::new(self.data, &mut dummy);
                self.compose_utf16_impl(src, only_contiguous, false, &mut buffer)
            }
        }
    }

    fn compose_utf16_impl(
        &self,
        src: &[u16],
        only_contiguous: bool,
        write: bool,
        buffer: &mut ReorderingBuffer,
    ) -> bool {
        let d = self.data;
        let n = src.len();
        let min_no_maybe_cp = d.min_comp_no_maybe_cp;
        let mut prev_boundary = 0usize;
        let mut pos = 0usize;

        'outer: loop {
            // Fast path: scan over characters below the minimum no-or-maybe
            // code point or with compYes && ccc==0 properties.
            let mut c = 0u32;
            let mut norm16 = 0u16;
            let mut prev_src = 0usize;
            loop {
                if pos == n {
                    if prev_boundary != n && write {
                        buffer.append_zero_cc(&src[prev_boundary..n]);
                    }
                    return true;
                }
                c = src[pos] as u32;
                if c < min_no_maybe_cp {
                    pos += 1;
                    continue;
                }
                if !is_lead_surrogate(c) {
                    norm16 = d.trie().fast_bmp_get(c);
                    if d.is_comp_yes_and_zero_cc(norm16) {
                        pos += 1;
                        continue;
                    }
                    prev_src = pos;
                    pos += 1;
                    break;
                }
                if pos + 1 < n && is_trail_surrogate(src[pos + 1] as u32) {
                    let cp = combine_surrogates(c, src[pos + 1] as u32);
                    norm16 = d.trie().fast_supp_get(cp);
                    if d.is_comp_yes_and_zero_cc(norm16) {
                        pos += 2;
                        continue;
                    }
                    c = cp;
                    prev_src = pos;
                    pos += 2;
                    break;
                }
                pos += 1; // unpaired lead surrogate: inert
            }

            // The current character is a no-no (has a mapping), a maybe-yes
            // (combines backward), or a yes-yes with ccc != 0. Handle the
            // cases that do not need full decompose + recompose first.
            if !d.is_maybe_or_non_zero_cc(norm16) {
                if !write {
                    return false;
                }
                if d.is_decomp_no_algorithmic(norm16) {
                    // maps to a single comp-yes-and-zero-cc character
                    if d.has_comp_boundary_after(norm16, only_contiguous)
                        || self.has_comp_boundary_before_utf16(src, pos)
                    {
                        if prev_boundary != prev_src {
                            buffer.append_zero_cc(&src[prev_boundary..prev_src]);
                        }
                        buffer.append(d.map_algorithmic(c, norm16), 0);
                        prev_boundary = pos;
                        continue 'outer;
                    }
                } else if norm16 < d.min_no_no_comp_boundary_before {
                    // the mapping is comp-normalized
                    if d.has_comp_boundary_after(norm16, only_contiguous)
                        || self.has_comp_boundary_before_utf16(src, pos)
                    {
                        if prev_boundary != prev_src {
                            buffer.append_zero_cc(&src[prev_boundary..prev_src]);
                        }
                        let units = d.mapping(norm16).units.to_vec();
                        buffer.append_zero_cc(&units);
                        prev_boundary = pos;
                        continue 'outer;
                    }
                } else if norm16 >= d.min_no_no_empty {
                    // maps to nothing: omit it if a boundary is adjacent
                    if self.has_comp_boundary_before_utf16(src, pos)
                        || self.has_comp_boundary_after_utf16(
                            &src[prev_boundary..prev_src],
                            only_contiguous,
                        )
                    {
                        if prev_boundary != prev_src {
                            buffer.append_zero_cc(&src[prev_boundary..prev_src]);
                        }
                        prev_boundary = pos;
                        continue 'outer;
                    }
                }
                // other no-no type: fall through to the slow path
            } else if NormData::is_jamo_vt(norm16) && prev_boundary != prev_src {
                let prev = src[prev_src - 1] as u32;
                if c < hangul::JAMO_T_BASE {
                    // Jamo V: compose with the previous Jamo L and an
                    // optional following Jamo T
                    if hangul::is_jamo_l(prev) {
                        if !write {
                            return false;
                        }
                        let mut t: i32 = -1;
                        if pos < n {
                            let nt = (src[pos] as i32) - hangul::JAMO_T_BASE as i32;
                            if 0 < nt && nt < hangul::JAMO_T_COUNT as i32 {
                                t = nt;
                                pos += 1;
                            }
                        }
                        if t < 0 && self.has_comp_boundary_before_utf16(src, pos) {
                            // no Jamo T follows, not even via decomposition
                            t = 0;
                        }
                        if t >= 0 {
                            let syllable = hangul::compose_lv(prev, c) + t as u32;
                            let new_prev_src = prev_src - 1; // replace the Jamo L too
                            if prev_boundary != new_prev_src {
                                buffer.append_zero_cc(&src[prev_boundary..new_prev_src]);
                            }
                            buffer.append(syllable, 0);
                            prev_boundary = pos;
                            continue 'outer;
                        }
                        // L+V+x with x a non-T: use the slow path
                    }
                } else if hangul::is_hangul_lv(prev) {
                    // Jamo T after an LV syllable
                    if !write {
                        return false;
                    }
                    let syllable = prev + (c - hangul::JAMO_T_BASE);
                    let new_prev_src = prev_src - 1; // replace the LV too
                    if prev_boundary != new_prev_src {
                        buffer.append_zero_cc(&src[prev_boundary..new_prev_src]);
                    }
                    buffer.append(syllable, 0);
                    prev_boundary = pos;
                    continue 'outer;
                }
                // no matching context: fall through to the slow path
            } else if norm16 > JAMO_VT {
                // One or more combining marks that do not combine back:
                // copy unchanged if they are in canonical order and followed
                // by a boundary.
                let mut cc = NormData::cc_from_normal_yes_or_maybe(norm16);
                if only_contiguous
                    && d.previous_trail_cc_utf16(&src[prev_boundary..prev_src]) > cc
                {
                    // fails the FCD test: decompose and recompose
                    if !write {
                        return false;
                    }
                } else {
                    let mut n16;
                    let mut after_stop;
                    loop {
                        if pos == n {
                            if write {
                                buffer.append_zero_cc(&src[prev_boundary..n]);
                            }
                            return true;
                        }
                        let prev_cc = cc;
                        let mut tmp = pos;
                        let (_, v) = d.trie().fast_u16_next(src, &mut tmp);
                        n16 = v;
                        after_stop = tmp;
                        if n16 >= MIN_YES_YES_WITH_CC {
                            cc = NormData::cc_from_normal_yes_or_maybe(n16);
                            if prev_cc > cc {
                                if !write {
                                    return false;
                                }
                                break;
                            }
                        } else {
                            break;
                        }
                        pos = tmp;
                    }
                    // pos is after the last in-order combining mark
                    if d.has_comp_boundary_before_n16(n16) {
                        if d.is_comp_yes_and_zero_cc(n16) {
                            pos = after_stop;
                        }
                        continue 'outer;
                    }
                    // no boundary in [prev_src, pos): slow path
                }
            }

            // Slow path: find the nearest boundaries around the current
            // character, decompose, and recompose.
            if prev_boundary != prev_src && !d.has_comp_boundary_before_n16(norm16) {
                let mut p = prev_src;
                let (_, n2) = d.trie().fast_u16_prev(src, &mut p);
                if !d.has_comp_boundary_after(n2, only_contiguous) {
                    prev_src = p;
                }
            }
            if write && prev_boundary != prev_src {
                buffer.append_zero_cc(&src[prev_boundary..prev_src]);
            }
            buffer.begin_no_flush();
            let recompose_start = buffer.len();
            self.decompose_short_utf16(src, prev_src, pos, false, only_contiguous, buffer);
            pos = self.decompose_short_utf16(src, pos, n, true, only_contiguous, buffer);
            self.recompose(buffer, recompose_start, only_contiguous);
            buffer.end_no_flush();
            if !write {
                if !buffer.equals_utf16(&src[prev_src..pos]) {
                    return false;
                }
                buffer.remove();
            }
            prev_boundary = pos;
        }
    }

    // Decomposes [pos, limit), optionally stopping at the first composition
    // boundary. Returns the position it stopped at.
    fn decompose_short_utf16(
        &self,
        src: &[u16],
        pos: usize,
        limit: usize,
        stop_at_comp_boundary: bool,
        only_contiguous: bool,
        buffer: &mut ReorderingBuffer,
    ) -> usize {
        let d = self.data;
        let mut pos = pos;
        while pos != limit {
            if stop_at_comp_boundary && (src[pos] as u32) < d.min_comp_no_maybe_cp {
                return pos;
            }
            let prev_pos = pos;
            let (c, norm16) = d.trie().fast_u16_next(&src[..limit], &mut pos);
            if stop_at_comp_boundary && d.has_comp_boundary_before_n16(norm16) {
                return prev_pos;
            }
            self.decompose_cp(c, norm16, buffer);
            if stop_at_comp_boundary && d.has_comp_boundary_after(norm16, only_contiguous) {
                return pos;
            }
        }
        pos
    }

    fn decompose_short_utf8(
        &self,
        src: &[u8],
        pos: usize,
        limit: usize,
        stop_at_comp_boundary: bool,
        only_contiguous: bool,
        buffer: &mut ReorderingBuffer,
    ) -> usize {
        let d = self.data;
        let mut pos = pos;
        while pos != limit {
            let prev_pos = pos;
            let mut norm16 = d.trie().fast_u8_next(&src[..limit], &mut pos);
            let mut c: Option<u32> = None;
            if norm16 >= d.limit_no_no {
                if d.is_maybe_or_non_zero_cc(norm16) {
                    let cp = cp_from_utf8(src, prev_pos, pos);
                    buffer.append(cp, NormData::cc_from_yes_or_maybe(norm16));
                    continue;
                }
                // algorithmic mapping, which implies a boundary before
                if stop_at_comp_boundary {
                    return prev_pos;
                }
                let cp = d.map_algorithmic(cp_from_utf8(src, prev_pos, pos), norm16);
                norm16 = d.raw_norm16(cp);
                c = Some(cp);
            } else if stop_at_comp_boundary && norm16 < d.min_no_no_comp_no_maybe_cc {
                return prev_pos;
            }
            if norm16 < d.min_yes_no {
                let cp = c.unwrap_or_else(|| cp_from_utf8(src, prev_pos, pos));
                buffer.append(cp, 0);
            } else if d.is_hangul_lv(norm16) || d.is_hangul_lvt(norm16) {
                let cp = c.unwrap_or_else(|| cp_from_utf8(src, prev_pos, pos));
                let mut jamos: Vec<u16> = Vec::with_capacity(3);
                hangul::decompose(cp, &mut jamos);
                buffer.append_zero_cc(&jamos);
            } else {
                let m = d.mapping(norm16);
                buffer.append_mapping(m.units, m.lead_cc, m.trail_cc);
            }
            if stop_at_comp_boundary && d.has_comp_boundary_after(norm16, only_contiguous) {
                return pos;
            }
        }
        pos
    }

    // Recomposes the buffered NFD segment starting at `start` in place and
    // truncates the buffer. Recomposition never lengthens the text.
    fn recompose(&self, buffer: &mut ReorderingBuffer, start: usize, only_contiguous: bool) {
        let d = self.data;
        let mut limit = buffer.len();
        let mut p = start;
        if p == limit {
            return;
        }

        let buf = buffer.raw_mut();
        let mut starter: Option<usize> = None;
        let mut starter_is_supplementary = false;
        let mut compositions_list: Option<usize> = None;
        let mut prev_cc = 0u8;

        loop {
            let (c, next_p) = decode_utf16(&buf[..limit], p);
            p = next_p;
            let norm16 = d.norm16(c);
            let cc = NormData::cc_from_yes_or_maybe(norm16);
            if d.is_maybe(norm16)
                && compositions_list.is_some()
                && (prev_cc < cc || prev_cc == 0)
            {
                if NormData::is_jamo_vt(norm16) {
                    // c is a Jamo V/T
                    if c < hangul::JAMO_T_BASE {
                        // Jamo V: compose with a previous Jamo L and an
                        // optional following Jamo T
                        let si = starter.unwrap();
                        let l = buf[si] as u32;
                        if hangul::is_jamo_l(l) {
                            let p_remove = p - 1;
                            let mut syllable = hangul::compose_lv(l, c);
                            if p != limit {
                                let t = (buf[p] as u32).wrapping_sub(hangul::JAMO_T_BASE);
                                if t < hangul::JAMO_T_COUNT {
                                    p += 1;
                                    syllable += t;
                                }
                            }
                            buf[si] = syllable as u16;
                            // remove the Jamo V (and T)
                            buf.copy_within(p..limit, p_remove);
                            limit -= p - p_remove;
                            p = p_remove;
                        }
                        // No Jamo-T-after-LV case: the input is NFD, so
                        // every Jamo T was consumed just above.
                    }
                    if p == limit {
                        break;
                    }
                    compositions_list = None;
                    continue;
                }
                let caf = d.combine(compositions_list.unwrap(), c);
                if caf >= 0 {
                    // the starter and the combining mark do combine
                    let composite = (caf >> 1) as u32;
                    let mut p_remove = p - utf16_len(c);
                    let si = starter.unwrap();
                    if starter_is_supplementary {
                        if composite > 0xFFFF {
                            buf[si] = crate::helpers::lead_surrogate(composite);
                            buf[si + 1] = crate::helpers::trail_surrogate(composite);
                        } else {
                            // the composite got shorter; close the gap
                            buf[si] = composite as u16;
                            buf.copy_within(si + 2..p_remove, si + 1);
                            starter_is_supplementary = false;
                            p_remove -= 1;
                        }
                    } else if composite > 0xFFFF {
                        // the composite got longer; shift right into the
                        // space the removed mark frees up
                        starter_is_supplementary = true;
                        buf.copy_within(si + 1..p_remove, si + 2);
                        p_remove += 1;
                        buf[si] = crate::helpers::lead_surrogate(composite);
                        buf[si + 1] = crate::helpers::trail_surrogate(composite);
                    } else {
                        buf[si] = composite as u16;
                    }
                    // remove the combining mark
                    if p_remove < p {
                        buf.copy_within(p..limit, p_remove);
                        limit -= p - p_remove;
                        p = p_remove;
                    }
                    // keep prev_cc: the mark is gone
                    if p == limit {
                        break;
                    }
                    if caf & 1 != 0 {
                        // the composite itself combines forward
                        compositions_list = Some(
                            d.compositions_list_for_composite(d.raw_norm16(composite)),
                        );
                    } else {
                        compositions_list = None;
                    }
                    continue;
                }
            }

            // no combination this time
            prev_cc = cc;
            if p == limit {
                break;
            }

            if cc == 0 {
                compositions_list = d.compositions_list_for_decomp_yes(norm16);
                if compositions_list.is_some() {
                    starter_is_supplementary = c > 0xFFFF;
                    starter = Some(p - utf16_len(c));
                }
            } else if only_contiguous {
                // FCC: any intervening character blocks compositions
                compositions_list = None;
            }
        }
        buffer.set_reordering_limit(limit);
    }

    fn compose_utf8(&self, src: &[u8], only_contiguous: bool, mut sink: Option<&mut dyn Utf8Sink>) -> bool {
        let d = self.data;
        let n = src.len();
        let min_no_maybe_lead = lead_byte_for_cp(d.min_comp_no_maybe_cp);
        let mut prev_boundary = 0usize;
        let mut pos = 0usize;
        let write = sink.is_some();

        macro_rules! emit {
            ($bytes:expr) => {
                if let Some(s) = sink.as_mut() {
                    s.write_utf8($bytes);
                }
            };
        }

        'outer: loop {
            let mut norm16 = 0u16;
            let mut prev_src = 0usize;
            loop {
                if pos == n {
                    if prev_boundary != n && write {
                        emit!(&src[prev_boundary..n]);
                    }
                    return true;
                }
                if src[pos] < min_no_maybe_lead {
                    pos += 1;
                } else {
                    prev_src = pos;
                    norm16 = d.trie().fast_u8_next(src, &mut pos);
                    if !d.is_comp_yes_and_zero_cc(norm16) {
                        break;
                    }
                }
            }

            if !d.is_maybe_or_non_zero_cc(norm16) {
                if !write {
                    return false;
                }
                if d.is_decomp_no_algorithmic(norm16) {
                    if d.has_comp_boundary_after(norm16, only_contiguous)
                        || self.has_comp_boundary_before_utf8(src, pos)
                    {
                        if prev_boundary != prev_src {
                            emit!(&src[prev_boundary..prev_src]);
                        }
                        let mapped = d.map_algorithmic(cp_from_utf8(src, prev_src, pos), norm16);
                        let mut bytes = Vec::with_capacity(4);
                        encode_utf8_into(mapped, &mut bytes);
                        emit!(&bytes);
                        prev_boundary = pos;
                        continue 'outer;
                    }
                } else if norm16 < d.min_no_no_comp_boundary_before {
                    if d.has_comp_boundary_after(norm16, only_contiguous)
                        || self.has_comp_boundary_before_utf8(src, pos)
                    {
                        if prev_boundary != prev_src {
                            emit!(&src[prev_boundary..prev_src]);
                        }
                        let units = d.mapping(norm16).units.to_vec();
                        let bytes = utf16_units_to_utf8(&units);
                        emit!(&bytes);
                        prev_boundary = pos;
                        continue 'outer;
                    }
                } else if norm16 >= d.min_no_no_empty {
                    if self.has_comp_boundary_before_utf8(src, pos)
                        || self.has_comp_boundary_after_utf8(
                            &src[prev_boundary..prev_src],
                            only_contiguous,
                        )
                    {
                        if prev_boundary != prev_src {
                            emit!(&src[prev_boundary..prev_src]);
                        }
                        prev_boundary = pos;
                        continue 'outer;
                    }
                }
                // fall through to the slow path
            } else if NormData::is_jamo_vt(norm16) {
                let c = cp_from_utf8(src, prev_src, pos);
                let prev = if prev_boundary < prev_src {
                    let (p, start) = decode_utf8_prev(src, prev_src);
                    p.map(|p| (p, start))
                } else {
                    None
                };
                if let Some((prev, prev_start)) = prev {
                    if c < hangul::JAMO_T_BASE {
                        if hangul::is_jamo_l(prev) {
                            if !write {
                                return false;
                            }
                            let mut t: i32 = -1;
                            if pos < n {
                                if let (Some(nc), np) = decode_utf8(src, pos) {
                                    if hangul::is_jamo_t(nc) {
                                        t = (nc - hangul::JAMO_T_BASE) as i32;
                                        pos = np;
                                    }
                                }
                            }
                            if t < 0 && self.has_comp_boundary_before_utf8(src, pos) {
                                t = 0;
                            }
                            if t >= 0 {
                                let syllable = hangul::compose_lv(prev, c) + t as u32;
                                if prev_boundary != prev_start {
                                    emit!(&src[prev_boundary..prev_start]);
                                }
                                let mut bytes = Vec::with_capacity(4);
                                encode_utf8_into(syllable, &mut bytes);
                                emit!(&bytes);
                                prev_boundary = pos;
                                continue 'outer;
                            }
                        }
                    } else if hangul::is_hangul_lv(prev) {
                        if !write {
                            return false;
                        }
                        let syllable = prev + (c - hangul::JAMO_T_BASE);
                        if prev_boundary != prev_start {
                            emit!(&src[prev_boundary..prev_start]);
                        }
                        let mut bytes = Vec::with_capacity(4);
                        encode_utf8_into(syllable, &mut bytes);
                        emit!(&bytes);
                        prev_boundary = pos;
                        continue 'outer;
                    }
                }
                // no matching context: slow path
            } else if norm16 > JAMO_VT {
                let mut cc = NormData::cc_from_normal_yes_or_maybe(norm16);
                if only_contiguous
                    && d.previous_trail_cc_utf8(&src[prev_boundary..prev_src]) > cc
                {
                    if !write {
                        return false;
                    }
                } else {
                    let mut n16;
                    let mut after_stop;
                    loop {
                        if pos == n {
                            if write {
                                emit!(&src[prev_boundary..n]);
                            }
                            return true;
                        }
                        let prev_cc = cc;
                        let mut tmp = pos;
                        n16 = d.trie().fast_u8_next(src, &mut tmp);
                        after_stop = tmp;
                        if n16 >= MIN_YES_YES_WITH_CC {
                            cc = NormData::cc_from_normal_yes_or_maybe(n16);
                            if prev_cc > cc {
                                if !write {
                                    return false;
                                }
                                break;
                            }
                        } else {
                            break;
                        }
                        pos = tmp;
                    }
                    if d.has_comp_boundary_before_n16(n16) {
                        if d.is_comp_yes_and_zero_cc(n16) {
                            pos = after_stop;
                        }
                        continue 'outer;
                    }
                }
            }

            // slow path
            if prev_boundary != prev_src && !d.has_comp_boundary_before_n16(norm16) {
                let mut p = prev_src;
                let n2 = d.trie().fast_u8_prev(src, &mut p);
                if !d.has_comp_boundary_after(n2, only_contiguous) {
                    prev_src = p;
                }
            }
            let mut dummy: Vec<u16> = Vec::new();
            let (seg_end, composed) = {
                let mut buffer = ReorderingBuffer::new(d, &mut dummy);
                buffer.begin_no_flush();
                self.decompose_short_utf8(src, prev_src, pos, false, only_contiguous, &mut buffer);
                let seg_end =
                    self.decompose_short_utf8(src, pos, n, true, only_contiguous, &mut buffer);
                self.recompose(&mut buffer, 0, only_contiguous);
                if buffer.equals_utf8(&src[prev_src..seg_end]) {
                    (seg_end, None)
                } else {
                    (seg_end, Some(buffer.as_slice().to_vec()))
                }
            };
            pos = seg_end;
            if let Some(composed) = composed {
                if !write {
                    return false;
                }
                if prev_boundary != prev_src {
                    emit!(&src[prev_boundary..prev_src]);
                }
                let bytes = utf16_units_to_utf8(&composed);
                emit!(&bytes);
                prev_boundary = pos;
            }
        }
    }

    fn has_comp_boundary_before_utf16(&self, src: &[u16], pos: usize) -> bool {
        if pos == src.len() || (src[pos] as u32) < self.data.min_comp_no_maybe_cp {
            return true;
        }
        let mut p = pos;
        let (_, norm16) = self.data.trie().fast_u16_next(src, &mut p);
        self.data.has_comp_boundary_before_n16(norm16)
    }

    fn has_comp_boundary_after_utf16(&self, src: &[u16], only_contiguous: bool) -> bool {
        if src.is_empty() {
            return true;
        }
        let mut p = src.len();
        let (_, norm16) = self.data.trie().fast_u16_prev(src, &mut p);
        self.data.has_comp_boundary_after(norm16, only_contiguous)
    }

    fn has_comp_boundary_before_utf8(&self, src: &[u8], pos: usize) -> bool {
        if pos == src.len() {
            return true;
        }
        let mut p = pos;
        let norm16 = self.data.trie().fast_u8_next(src, &mut p);
        self.data.has_comp_boundary_before_n16(norm16)
    }

    fn has_comp_boundary_after_utf8(&self, src: &[u8], only_contiguous: bool) -> bool {
        if src.is_empty() {
            return true;
        }
        let mut p = src.len();
        let norm16 = self.data.trie().fast_u8_prev(src, &mut p);
        self.data.has_comp_boundary_after(norm16, only_contiguous)
    }
}

// The code point from one well-formed UTF-8 sequence in [start, end).
fn cp_from_utf8(src: &[u8], start: usize, _end: usize) -> u32 {
    decode_utf8(src, start).0.unwrap_or(0xFFFD)
}

fn utf16_units_to_utf8(units: &[u16]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(units.len() * 3);
    let mut pos = 0;
    while pos < units.len() {
        let (cp, next) = decode_utf16(units, pos);
        pos = next;
        if crate::helpers::is_surrogate(cp) {
            encode_utf8_into(0xFFFD, &mut bytes);
        } else {
            encode_utf8_into(cp, &mut bytes);
        }
    }
    bytes
}

// UTF-8 lead byte for the fast-scan threshold; can be lower than the actual
// lead byte for the code point.
fn lead_byte_for_cp(c: u32) -> u8 {
    if c <= 0x7F {
        c as u8
    } else if c <= 0x7FF {
        0xC0 + (c >> 6) as u8
    } else {
        0xE0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load_cases() -> Vec<(Vec<u32>, Vec<u32>, Vec<u32>)> {
        let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("resources/normalization-cases.json");
        let f = std::fs::File::open(path).unwrap();
        let cases: Vec<(Vec<u32>, Vec<u32>, Vec<u32>)> =
            serde_json::from_reader(std::io::BufReader::new(f)).unwrap();
        cases
    }

    fn utf8(cps: &[u32]) -> Vec<u8> {
        let mut out = Vec::new();
        for &cp in cps {
            crate::helpers::encode_utf8_into(cp, &mut out);
        }
        out
    }

    #[test]
    fn test_nfc_conformance_utf16() {
        for (src, nfc, _) in load_cases() {
            let got = normalize_utf32(Form::Nfc, &src);
            assert_eq!(got, nfc, "NFC of {:04X?}", src);
            // idempotence
            assert_eq!(normalize_utf32(Form::Nfc, &nfc), nfc);
            // is_normalized agrees with normalize, byte for byte
            assert_eq!(is_normalized_utf32(Form::Nfc, &src), src == nfc, "{:04X?}", src);
            assert!(is_normalized_utf32(Form::Nfc, &nfc));
        }
    }

    #[test]
    fn test_nfd_conformance_utf16() {
        for (src, _, nfd) in load_cases() {
            let got = normalize_utf32(Form::Nfd, &src);
            assert_eq!(got, nfd, "NFD of {:04X?}", src);
            assert_eq!(normalize_utf32(Form::Nfd, &nfd), nfd);
            assert_eq!(is_normalized_utf32(Form::Nfd, &src), src == nfd, "{:04X?}", src);
            assert!(is_normalized_utf32(Form::Nfd, &nfd));
        }
    }

    #[test]
    fn test_nfc_conformance_utf8() {
        for (src, nfc, nfd) in load_cases() {
            let got = to_nfc_bytes(&utf8(&src));
            assert_eq!(got, utf8(&nfc), "NFC utf8 of {:04X?}", src);
            assert_eq!(is_normalized_utf8(Form::Nfc, &utf8(&src)), src == nfc);
            let got = to_nfd_bytes(&utf8(&src));
            assert_eq!(got, utf8(&nfd), "NFD utf8 of {:04X?}", src);
        }
    }

    #[test]
    fn test_decompose_then_recompose() {
        for (src, nfc, _) in load_cases() {
            let nfd = normalize_utf32(Form::Nfd, &src);
            assert_eq!(normalize_utf32(Form::Nfc, &nfd), nfc, "{:04X?}", src);
        }
    }

    #[test]
    fn test_hangul() {
        assert_eq!(normalize_utf32(Form::Nfc, &[0x1100, 0x1161]), vec![0xAC00]);
        assert_eq!(
            normalize_utf32(Form::Nfc, &[0x1100, 0x1161, 0x11A8]),
            vec![0xAC01]
        );
        assert_eq!(normalize_utf32(Form::Nfc, &[0xAC00, 0x11A8]), vec![0xAC01]);
        assert_eq!(
            normalize_utf32(Form::Nfd, &[0xAC01]),
            vec![0x1100, 0x1161, 0x11A8]
        );
        // the UTF-8 path composes Hangul too
        assert_eq!(
            to_nfc_bytes(&utf8(&[0x1100, 0x1161, 0x11A8])),
            utf8(&[0xAC01])
        );
    }

    #[test]
    fn test_fcc_contiguous_only() {
        // a + U+05AE (cc 228) + grave (cc 230): NFC composes the grave
        // discontiguously, FCC does not compose at all
        let src = vec![0x61, 0x5AE, 0x300];
        assert_eq!(normalize_utf32(Form::Nfc, &src), vec![0xE0, 0x5AE]);
        assert_eq!(normalize_utf32(Form::Fcc, &src), src);
        assert!(is_normalized_utf32(Form::Fcc, &src));
        assert!(!is_normalized_utf32(Form::Nfc, &src));
        // contiguous compositions still happen under FCC
        assert_eq!(
            normalize_utf32(Form::Fcc, &[0x65, 0x301]),
            vec![0xE9]
        );
        assert_eq!(
            normalize_utf32(Form::Fcc, &[0x64, 0x323, 0x307]),
            vec![0x1E0D, 0x307]
        );
    }

    #[test]
    fn test_ill_formed_passthrough() {
        // ill-formed bytes are normalization-inert and copied through
        let src = b"a\xC2\x41\xFFb".to_vec();
        assert_eq!(to_nfc_bytes(&src), src);
        assert!(is_normalized_utf8(Form::Nfc, &src));
        // unpaired surrogates in UTF-16 likewise
        let units = vec![0x61, 0xD800, 0x62, 0xDC00, 0x63];
        let mut out: Vec<u16> = Vec::new();
        normalize_utf16_to(Form::Nfc, &units, &mut out);
        assert_eq!(out, units);
    }

    #[test]
    fn test_quick_check() {
        // "å" composed
        assert_eq!(quick_check(&[0xE5], Form::Nfc), IsNormalised::Yes);
        // "å" decomposed: the combining mark could continue a composition
        assert_eq!(quick_check(&[0x61, 0x30A], Form::Nfc), IsNormalised::Maybe);
        assert_eq!(quick_check(&[0x344], Form::Nfc), IsNormalised::No);
        assert_eq!(quick_check(&[0x61, 0x30A], Form::Nfd), IsNormalised::Yes);
        assert_eq!(quick_check(&[0xE5], Form::Nfd), IsNormalised::No);
        // out-of-order marks are No for every form
        assert_eq!(
            quick_check(&[0x61, 0x301, 0x328], Form::Nfd),
            IsNormalised::No
        );
        for (_, nfc, nfd) in load_cases() {
            assert_ne!(quick_check(&nfc, Form::Nfc), IsNormalised::No, "{:04X?}", nfc);
            assert_eq!(quick_check(&nfd, Form::Nfd), IsNormalised::Yes, "{:04X?}", nfd);
        }
    }

    #[test]
    fn test_empty_and_ascii() {
        assert_eq!(to_nfc_bytes(b""), b"");
        assert_eq!(to_nfd_bytes(b"hello, world"), b"hello, world");
        assert!(is_normalized_utf8(Form::Nfc, b"hello"));
        assert!(is_normalized_utf8(Form::Nfd, b"hello"));
    }

    #[test]
    fn test_random_idempotence() {
        use rand::{Rng, SeedableRng};
        let mut rng = rand::rngs::StdRng::seed_from_u64(0x5EED);
        let pool: Vec<u32> = vec![
            0x41, 0x61, 0xE9, 0x65, 0x1100, 0x1161, 0x11A8, 0xAC00, 0x300, 0x301, 0x308, 0x30A,
            0x323, 0x304, 0x591, 0x5AE, 0x327, 0x328, 0x344, 0x212B, 0x2126, 0x2000, 0x1E0B,
            0x1EBF, 0xEA, 0xCC6, 0xCD5, 0x1D157, 0x1D165, 0x1D15E, 0xF71, 0xF72, 0x3099, 0x30D5,
        ];
        for _ in 0..500 {
            let len = rng.gen_range(0..12);
            let src: Vec<u32> = (0..len).map(|_| pool[rng.gen_range(0..pool.len())]).collect();
            for form in [Form::Nfc, Form::Fcc, Form::Nfd] {
                let once = normalize_utf32(form, &src);
                let twice = normalize_utf32(form, &once);
                assert_eq!(once, twice, "{:?} of {:04X?}", form, src);
                assert!(is_normalized_utf32(form, &once), "{:?} of {:04X?}", form, src);
            }
        }
    }
}
