// Raw Unicode Character Database tables. The JSON files under resources/
// are extracted from the UCD (combining classes and full canonical
// decompositions from UnicodeData, quick-check sets derived from the
// composite closure, break properties from the UAX #29/#14 property files,
// bidi classes from DerivedBidiClass, paired brackets from BidiBrackets).
// Loading happens once, behind lazy_static; everything after that is
// immutable shared data.

use lazy_static::lazy_static;
use std::collections::{HashMap, HashSet};

fn read_json<T: serde::de::DeserializeOwned>(name: &str) -> T {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("resources")
        .join(name);
    let f = std::fs::File::open(&path)
        .unwrap_or_else(|e| panic!("missing resource {}: {}", path.display(), e));
    let rdr = std::io::BufReader::new(f);
    serde_json::from_reader(rdr).unwrap_or_else(|e| panic!("bad resource {}: {}", name, e))
}

lazy_static! {
    // [lo, hi) intervals carrying a nonzero canonical combining class
    static ref COMBINING_CLASSES: Vec<(u32, u32, u8)> = read_json("combining-classes.json");

    // full canonical (NFD) decompositions, Hangul excluded
    pub static ref DECOMPOSITION_MAPPINGS: HashMap<u32, Vec<u32>> =
        read_json("decomposition-mappings.json");

    // D114 primary composites: canonical pairs minus the full composition
    // exclusions, Hangul excluded
    pub static ref PRIMARY_COMPOSITES: Vec<([u32; 2], u32)> =
        read_json("primary-composites.json");

    // NFC_QC=No: code points that never survive composition
    pub static ref NFC_QC_N: HashSet<u32> = read_json::<Vec<u32>>("nfc-quick-check-no.json")
        .into_iter()
        .collect();

    // NFC_QC=Maybe: backward-combining code points (composite trails plus
    // the Jamo V/T ranges)
    pub static ref NFC_QC_M: HashSet<u32> = read_json::<Vec<u32>>("nfc-quick-check-maybe.json")
        .into_iter()
        .collect();

    // per-kind break property intervals, keyed by property name
    pub static ref GRAPHEME_PROPS: HashMap<String, Vec<[u32; 2]>> =
        read_json("grapheme-props.json");
    pub static ref WORD_PROPS: HashMap<String, Vec<[u32; 2]>> = read_json("word-props.json");
    pub static ref SENTENCE_PROPS: HashMap<String, Vec<[u32; 2]>> =
        read_json("sentence-props.json");
    pub static ref LINE_PROPS: HashMap<String, Vec<[u32; 2]>> = read_json("line-props.json");
    pub static ref BIDI_PROPS: HashMap<String, Vec<[u32; 2]>> = read_json("bidi-props.json");

    pub static ref BRACKETS: BracketData = read_json("bracket-pairs.json");
}

#[derive(serde::Deserialize)]
pub struct BracketData {
    pub pairs: Vec<[u32; 2]>,
    pub canonical: Vec<[u32; 2]>,
}

pub fn combining_class(code_point: u32) -> u8 {
    let ivs = &*COMBINING_CLASSES;
    let mut lo = 0usize;
    let mut hi = ivs.len();
    while lo < hi {
        let mid = (lo + hi) / 2;
        let (l, h, cc) = ivs[mid];
        if code_point < l {
            hi = mid;
        } else if code_point >= h {
            lo = mid + 1;
        } else {
            return cc;
        }
    }
    0
}

pub fn is_starter(code_point: u32) -> bool {
    combining_class(code_point) == 0
}

// The raw nonzero-cc intervals, for table builders that need to enumerate.
pub fn nonzero_combining_classes() -> &'static [(u32, u32, u8)] {
    &COMBINING_CLASSES
}

pub fn decomposition_mapping(code_point: u32) -> Option<&'static [u32]> {
    DECOMPOSITION_MAPPINGS.get(&code_point).map(|m| m.as_slice())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combining_class() {
        assert_eq!(combining_class(0x61), 0);
        assert_eq!(combining_class(0x300), 230);
        assert_eq!(combining_class(0x316), 220);
        assert_eq!(combining_class(0x31B), 216);
        assert_eq!(combining_class(0x94D), 9);
        assert_eq!(combining_class(0x10FFFF), 0);
        assert!(is_starter(0xAC00));
        assert!(!is_starter(0x308));
    }

    #[test]
    fn test_decompositions() {
        assert_eq!(decomposition_mapping(0xE9), Some(&[0x65, 0x301][..]));
        // full decomposition, not just one level
        assert_eq!(
            decomposition_mapping(0x1EBF),
            Some(&[0x65, 0x302, 0x301][..])
        );
        // singleton
        assert_eq!(decomposition_mapping(0x212B), Some(&[0x41, 0x30A][..]));
        assert_eq!(decomposition_mapping(0x61), None);
        // Hangul is decomposed arithmetically, not via the table
        assert_eq!(decomposition_mapping(0xAC00), None);
    }

    #[test]
    fn test_quick_check_sets() {
        assert!(NFC_QC_M.contains(&0x301));
        assert!(NFC_QC_M.contains(&0x1161)); // jamo V
        assert!(!NFC_QC_M.contains(&0x61));
        assert!(NFC_QC_N.contains(&0x344));
        assert!(NFC_QC_N.contains(&0x212B));
        assert!(!NFC_QC_N.contains(&0xE9));
    }

    #[test]
    fn test_composites() {
        let map: HashMap<[u32; 2], u32> = PRIMARY_COMPOSITES.iter().cloned().collect();
        assert_eq!(map.get(&[0x65, 0x301]), Some(&0xE9));
        assert_eq!(map.get(&[0x41, 0x30A]), Some(&0xC5));
        // composition exclusion: no primary composite for 0344's pair
        assert_eq!(map.get(&[0x308, 0x301]), None);
    }
}
