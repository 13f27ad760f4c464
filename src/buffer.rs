// Scratch buffer for canonical ordering. Code points inside the buffer are
// always in canonical order; last_cc is the cc of the final code point and
// reorder_start marks the last known cc<=1 boundary, which bounds the
// backward scan when a mark has to be inserted out of order. Zero-cc
// appends flush the buffer through the sink unless a recomposition is in
// progress (no-flush mode), so the scratch never has to hold more than one
// composition segment.

use crate::helpers::{
    decode_utf8, decode_utf16, decode_utf16_prev, encode_utf16_into, is_lead_surrogate,
    is_trail_surrogate, utf16_len,
};
use crate::norm_data::NormData;
use crate::normalise::Utf16Sink;

pub const SCRATCH_CAPACITY: usize = 1024;

pub struct ReorderingBuffer<'a> {
    data: &'a NormData,
    sink: &'a mut dyn Utf16Sink,
    buf: Vec<u16>,
    reorder_start: usize,
    last_cc: u8,
    inhibit_flushes: bool,
}

impl<'a> ReorderingBuffer<'a> {
    pub fn new(data: &'a NormData, sink: &'a mut dyn Utf16Sink) -> Self {
        ReorderingBuffer {
            data,
            sink,
            buf: Vec::with_capacity(SCRATCH_CAPACITY),
            reorder_start: 0,
            last_cc: 0,
            inhibit_flushes: false,
        }
    }

    // Explicit begin/end pair instead of a scope guard: a guard would hold
    // the mutable borrow and lock the buffer for the duration.
    pub fn begin_no_flush(&mut self) {
        self.inhibit_flushes = true;
    }
    pub fn end_no_flush(&mut self) {
        self.inhibit_flushes = false;
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
    pub fn as_slice(&self) -> &[u16] {
        &self.buf
    }

    pub fn flush(&mut self) {
        if !self.buf.is_empty() {
            self.sink.write_utf16(&self.buf);
        }
        self.remove();
    }

    pub fn remove(&mut self) {
        self.buf.clear();
        self.reorder_start = 0;
        self.last_cc = 0;
    }

    // Truncates after an in-place recomposition.
    pub fn set_reordering_limit(&mut self, new_len: usize) {
        self.buf.truncate(new_len);
        self.reorder_start = new_len;
        self.last_cc = 0;
    }

    // The recompose pass edits the scratch in place and then calls
    // set_reordering_limit with the shortened length.
    pub fn raw_mut(&mut self) -> &mut Vec<u16> {
        &mut self.buf
    }

    pub fn equals_utf16(&self, other: &[u16]) -> bool {
        self.buf == other
    }
    pub fn equals_utf8(&self, other: &[u8]) -> bool {
        let mut pos = 0;
        let mut i = 0;
        while pos < other.len() {
            let (cp, next) = decode_utf8(other, pos);
            let cp = match cp {
                Some(cp) => cp,
                None => return false,
            };
            pos = next;
            if cp <= 0xFFFF {
                if i >= self.buf.len() || self.buf[i] as u32 != cp {
                    return false;
                }
                i += 1;
            } else {
                if i + 1 >= self.buf.len()
                    || crate::helpers::combine_surrogates(
                        self.buf[i] as u32,
                        self.buf[i + 1] as u32,
                    ) != cp
                {
                    return false;
                }
                i += 2;
            }
        }
        i == self.buf.len()
    }

    pub fn append(&mut self, c: u32, cc: u8) {
        if self.last_cc <= cc || cc == 0 {
            if cc == 0 && !self.inhibit_flushes {
                self.flush();
            }
            encode_utf16_into(c, &mut self.buf);
            self.last_cc = cc;
            if cc <= 1 {
                self.reorder_start = self.buf.len();
            }
        } else {
            self.insert(c, cc);
        }
    }

    // Bulk append of a run that is known to begin and end at cc==0
    // boundaries. All but the final code point go straight to the sink; the
    // tail stays in the buffer as context for the next append.
    pub fn append_zero_cc(&mut self, units: &[u16]) {
        if units.is_empty() {
            return;
        }
        if !self.inhibit_flushes {
            self.flush();
            let mut split = units.len() - 1;
            if split > 0
                && is_trail_surrogate(units[split] as u32)
                && is_lead_surrogate(units[split - 1] as u32)
            {
                split -= 1;
            }
            if split > 0 {
                self.sink.write_utf16(&units[..split]);
            }
            self.buf.extend_from_slice(&units[split..]);
        } else {
            self.buf.extend_from_slice(units);
        }
        self.last_cc = 0;
        self.reorder_start = self.buf.len();
    }

    // Bulk append of a pre-decomposed mapping with its encoded lead and
    // trail cc. The fast case tacks the whole mapping on; otherwise each
    // code point goes through the reordering append.
    pub fn append_mapping(&mut self, units: &[u16], lead_cc: u8, trail_cc: u8) {
        debug_assert!(!units.is_empty());
        if self.last_cc <= lead_cc || lead_cc == 0 {
            if trail_cc <= 1 {
                self.reorder_start = self.buf.len() + units.len();
            } else if lead_cc <= 1 {
                // ok if not a code point boundary
                self.reorder_start = self.buf.len() + 1;
            }
            self.buf.extend_from_slice(units);
            self.last_cc = trail_cc;
        } else {
            let (c, mut i) = decode_utf16(units, 0);
            self.insert(c, lead_cc);
            while i < units.len() {
                let (c, next) = decode_utf16(units, i);
                let cc = if next < units.len() {
                    // the mapping is NFD, so the raw norm16 carries the cc
                    NormData::cc_from_yes_or_maybe(self.data.raw_norm16(c))
                } else {
                    trail_cc
                };
                i = next;
                self.append(c, cc);
            }
        }
    }

    // Inserts c before trailing code points whose cc is larger. Requires
    // 0 < cc < last_cc, which implies reorder_start < len.
    fn insert(&mut self, c: u32, cc: u8) {
        let mut ip = self.buf.len();
        while ip > self.reorder_start {
            let (prev_c, prev_pos) = decode_utf16_prev(&self.buf, ip);
            if self.data.cc_from_yes_or_maybe_cp(prev_c) > cc {
                ip = prev_pos;
            } else {
                break;
            }
        }
        if c <= 0xFFFF {
            self.buf.insert(ip, c as u16);
        } else {
            self.buf.insert(ip, crate::helpers::lead_surrogate(c));
            self.buf.insert(ip + 1, crate::helpers::trail_surrogate(c));
        }
        if cc <= 1 {
            self.reorder_start = ip + utf16_len(c);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::norm_data::norm_data;

    #[test]
    fn test_reordering_insert() {
        let mut out: Vec<u16> = Vec::new();
        {
            let mut buf = ReorderingBuffer::new(norm_data(), &mut out);
            buf.begin_no_flush();
            buf.append(0x61, 0); // a
            buf.append(0x308, 230); // diaeresis
            buf.append(0x323, 220); // dot below sorts before the diaeresis
            assert_eq!(buf.as_slice(), &[0x61, 0x323, 0x308]);
            buf.end_no_flush();
            buf.flush();
        }
        assert_eq!(out, vec![0x61, 0x323, 0x308]);
    }

    #[test]
    fn test_equal_cc_keeps_order() {
        let mut out: Vec<u16> = Vec::new();
        let mut buf = ReorderingBuffer::new(norm_data(), &mut out);
        buf.begin_no_flush();
        buf.append(0x61, 0);
        buf.append(0x300, 230);
        buf.append(0x301, 230);
        assert_eq!(buf.as_slice(), &[0x61, 0x300, 0x301]);
    }

    // Lets the test peek at the sink's contents while the buffer still
    // holds its mutable borrow, which a bare `&mut Vec<u16>` can't do.
    struct SharedSink(std::rc::Rc<std::cell::RefCell<Vec<u16>>>);
    impl Utf16Sink for SharedSink {
        fn write_utf16(&mut self, units: &[u16]) {
            self.0.borrow_mut().extend_from_slice(units);
        }
    }

    #[test]
    fn test_append_zero_cc_keeps_tail() {
        let out = std::rc::Rc::new(std::cell::RefCell::new(Vec::<u16>::new()));
        let mut sink = SharedSink(out.clone());
        let mut buf = ReorderingBuffer::new(norm_data(), &mut sink);
        buf.append_zero_cc(&[0x61, 0x62, 0x63]);
        // the final code point stays buffered as context
        assert_eq!(*out.borrow(), vec![0x61, 0x62]);
        assert_eq!(buf.as_slice(), &[0x63]);
        // a supplementary tail is kept whole
        buf.append_zero_cc(&[0x64, 0xD834, 0xDD57]);
        assert_eq!(*out.borrow(), vec![0x61, 0x62, 0x63, 0x64]);
        assert_eq!(buf.as_slice(), &[0xD834, 0xDD57]);
    }

    #[test]
    fn test_equals_utf8() {
        let mut out: Vec<u16> = Vec::new();
        let mut buf = ReorderingBuffer::new(norm_data(), &mut out);
        buf.begin_no_flush();
        buf.append(0xE9, 0);
        buf.append(0x1D157, 0);
        let mut bytes = Vec::new();
        crate::helpers::encode_utf8_into(0xE9, &mut bytes);
        crate::helpers::encode_utf8_into(0x1D157, &mut bytes);
        assert!(buf.equals_utf8(&bytes));
        bytes.pop();
        assert!(!buf.equals_utf8(&bytes));
    }
}
