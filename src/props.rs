// Break and bidi property lookup. Each kind keeps singleton code points in
// a hash map and contiguous ranges in a sorted interval array; lookups try
// the map, then binary-search the intervals, then fall back to the kind's
// default. Hangul syllables get their classes arithmetically instead of
// eight hundred alternating LV/LVT intervals.
// https://www.unicode.org/reports/tr29/  https://www.unicode.org/reports/tr14/

use crate::norm_data::hangul;
use crate::ucd;
use lazy_static::lazy_static;
use std::collections::HashMap;

pub struct PropertyTable<P: Copy> {
    singles: HashMap<u32, P>,
    intervals: Vec<(u32, u32, P)>,
    default: P,
}

impl<P: Copy> PropertyTable<P> {
    fn new(raw: &HashMap<String, Vec<[u32; 2]>>, parse: fn(&str) -> P, default: P) -> Self {
        let mut singles = HashMap::new();
        let mut intervals = Vec::new();
        for (name, ranges) in raw {
            let p = parse(name);
            for &[lo, hi] in ranges {
                if hi - lo == 1 {
                    singles.insert(lo, p);
                } else {
                    intervals.push((lo, hi, p));
                }
            }
        }
        intervals.sort_unstable_by_key(|iv| iv.0);
        PropertyTable {
            singles,
            intervals,
            default,
        }
    }

    pub fn get(&self, cp: u32) -> P {
        if let Some(&p) = self.singles.get(&cp) {
            return p;
        }
        let mut lo = 0usize;
        let mut hi = self.intervals.len();
        while lo < hi {
            let mid = (lo + hi) / 2;
            let (l, h, p) = self.intervals[mid];
            if cp < l {
                hi = mid;
            } else if cp >= h {
                lo = mid + 1;
            } else {
                return p;
            }
        }
        self.default
    }
}

macro_rules! parse_enum {
    ($name:ident { $($variant:ident => $s:expr),+ $(,)? }) => {
        impl $name {
            fn parse(s: &str) -> $name {
                match s {
                    $($s => $name::$variant,)+
                    _ => panic!("unknown {} property {:?}", stringify!($name), s),
                }
            }
        }
    };
}

// https://unicode.org/reports/tr29/#Grapheme_Cluster_Break_Property_Values
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum GraphemeProperty {
    Other,
    CR,
    LF,
    Control,
    Extend,
    ZWJ,
    RI,
    Prepend,
    SpacingMark,
    L,
    V,
    T,
    LV,
    LVT,
    ExtPict,
}

parse_enum!(GraphemeProperty {
    CR => "CR", LF => "LF", Control => "Control", Extend => "Extend",
    ZWJ => "ZWJ", RI => "RI", Prepend => "Prepend",
    SpacingMark => "SpacingMark", L => "L", V => "V", T => "T",
    ExtPict => "ExtPict",
});

// https://unicode.org/reports/tr29/#Word_Boundary_Rules
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum WordProperty {
    Other,
    CR,
    LF,
    Newline,
    Katakana,
    ALetter,
    MidLetter,
    MidNum,
    MidNumLet,
    Numeric,
    ExtendNumLet,
    RI,
    HebrewLetter,
    DoubleQuote,
    SingleQuote,
    ExtPict,
    WSegSpace,
    Format,
    Extend,
    ZWJ,
}

parse_enum!(WordProperty {
    CR => "CR", LF => "LF", Newline => "Newline", Katakana => "Katakana",
    ALetter => "ALetter", MidLetter => "MidLetter", MidNum => "MidNum",
    MidNumLet => "MidNumLet", Numeric => "Numeric",
    ExtendNumLet => "ExtendNumLet", RI => "RI",
    HebrewLetter => "HebrewLetter", DoubleQuote => "DoubleQuote",
    SingleQuote => "SingleQuote", ExtPict => "ExtPict",
    WSegSpace => "WSegSpace", Format => "Format", Extend => "Extend",
    ZWJ => "ZWJ",
});

// https://unicode.org/reports/tr29/#Sentence_Boundary_Rules
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SentenceProperty {
    Other,
    CR,
    LF,
    Sep,
    Sp,
    Lower,
    Upper,
    OLetter,
    Numeric,
    ATerm,
    STerm,
    Close,
    SContinue,
    Extend,
    Format,
}

parse_enum!(SentenceProperty {
    CR => "CR", LF => "LF", Sep => "Sep", Sp => "Sp", Lower => "Lower",
    Upper => "Upper", OLetter => "OLetter", Numeric => "Numeric",
    ATerm => "ATerm", STerm => "STerm", Close => "Close",
    SContinue => "SContinue", Extend => "Extend", Format => "Format",
});

// https://www.unicode.org/reports/tr14/#Table1 (after LB1 resolution)
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[allow(clippy::upper_case_acronyms)]
pub enum LineProperty {
    AL,
    BK,
    CR,
    LF,
    NL,
    SP,
    ZW,
    ZWJ,
    WJ,
    GL,
    CM,
    BA,
    BB,
    B2,
    CB,
    EX,
    HY,
    SY,
    IS,
    IN,
    NS,
    QU,
    OP,
    CL,
    CP,
    PR,
    PO,
    NU,
    HL,
    JL,
    JV,
    JT,
    H2,
    H3,
    RI,
    EB,
    EM,
    CJ,
    ID,
}

parse_enum!(LineProperty {
    BK => "BK", CR => "CR", LF => "LF", NL => "NL", SP => "SP", ZW => "ZW",
    ZWJ => "ZWJ", WJ => "WJ", GL => "GL", CM => "CM", BA => "BA", BB => "BB",
    B2 => "B2", CB => "CB", EX => "EX", HY => "HY", SY => "SY", IS => "IS",
    IN => "IN", NS => "NS", QU => "QU", OP => "OP", CL => "CL", CP => "CP",
    PR => "PR", PO => "PO", NU => "NU", HL => "HL", JL => "JL", JV => "JV",
    JT => "JT", RI => "RI", EB => "EB", EM => "EM", CJ => "CJ", ID => "ID",
});

// https://www.unicode.org/reports/tr9/#Bidirectional_Character_Types
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[allow(clippy::upper_case_acronyms)]
pub enum BidiProperty {
    L,
    R,
    AL,
    EN,
    ES,
    ET,
    AN,
    CS,
    NSM,
    BN,
    B,
    S,
    WS,
    ON,
    LRE,
    RLE,
    LRO,
    RLO,
    PDF,
    LRI,
    RLI,
    FSI,
    PDI,
}

parse_enum!(BidiProperty {
    R => "R", AL => "AL", EN => "EN", ES => "ES", ET => "ET", AN => "AN",
    CS => "CS", NSM => "NSM", BN => "BN", B => "B", S => "S", WS => "WS",
    ON => "ON", LRE => "LRE", RLE => "RLE", LRO => "LRO", RLO => "RLO",
    PDF => "PDF", LRI => "LRI", RLI => "RLI", FSI => "FSI", PDI => "PDI",
});

lazy_static! {
    static ref GRAPHEME: PropertyTable<GraphemeProperty> = PropertyTable::new(
        &ucd::GRAPHEME_PROPS,
        GraphemeProperty::parse,
        GraphemeProperty::Other
    );
    static ref WORD: PropertyTable<WordProperty> =
        PropertyTable::new(&ucd::WORD_PROPS, WordProperty::parse, WordProperty::Other);
    static ref SENTENCE: PropertyTable<SentenceProperty> = PropertyTable::new(
        &ucd::SENTENCE_PROPS,
        SentenceProperty::parse,
        SentenceProperty::Other
    );
    static ref LINE: PropertyTable<LineProperty> =
        PropertyTable::new(&ucd::LINE_PROPS, LineProperty::parse, LineProperty::AL);
    static ref BIDI: PropertyTable<BidiProperty> =
        PropertyTable::new(&ucd::BIDI_PROPS, BidiProperty::parse, BidiProperty::L);
}

pub fn grapheme_prop(cp: u32) -> GraphemeProperty {
    if hangul::is_hangul(cp) {
        return if hangul::is_hangul_lv(cp) {
            GraphemeProperty::LV
        } else {
            GraphemeProperty::LVT
        };
    }
    GRAPHEME.get(cp)
}

pub fn word_prop(cp: u32) -> WordProperty {
    WORD.get(cp)
}

pub fn sentence_prop(cp: u32) -> SentenceProperty {
    SENTENCE.get(cp)
}

pub fn line_prop(cp: u32) -> LineProperty {
    if hangul::is_hangul(cp) {
        return if hangul::is_hangul_lv(cp) {
            LineProperty::H2
        } else {
            LineProperty::H3
        };
    }
    LINE.get(cp)
}

pub fn bidi_prop(cp: u32) -> BidiProperty {
    BIDI.get(cp)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grapheme_props() {
        assert_eq!(grapheme_prop(0x0D), GraphemeProperty::CR);
        assert_eq!(grapheme_prop(0x0A), GraphemeProperty::LF);
        assert_eq!(grapheme_prop(0x61), GraphemeProperty::Other);
        assert_eq!(grapheme_prop(0x308), GraphemeProperty::Extend);
        assert_eq!(grapheme_prop(0x1F3FB), GraphemeProperty::Extend);
        assert_eq!(grapheme_prop(0x200D), GraphemeProperty::ZWJ);
        assert_eq!(grapheme_prop(0x1F1E6), GraphemeProperty::RI);
        assert_eq!(grapheme_prop(0x1100), GraphemeProperty::L);
        assert_eq!(grapheme_prop(0x1161), GraphemeProperty::V);
        assert_eq!(grapheme_prop(0x11A8), GraphemeProperty::T);
        assert_eq!(grapheme_prop(0xAC00), GraphemeProperty::LV);
        assert_eq!(grapheme_prop(0xAC01), GraphemeProperty::LVT);
        assert_eq!(grapheme_prop(0x1F600), GraphemeProperty::ExtPict);
        assert_eq!(grapheme_prop(0x903), GraphemeProperty::SpacingMark);
        assert_eq!(grapheme_prop(0x200B), GraphemeProperty::Control);
    }

    #[test]
    fn test_word_props() {
        assert_eq!(word_prop(0x61), WordProperty::ALetter);
        assert_eq!(word_prop(0x5F), WordProperty::ExtendNumLet);
        assert_eq!(word_prop(0x2E), WordProperty::MidNumLet);
        assert_eq!(word_prop(0x3A), WordProperty::MidLetter);
        assert_eq!(word_prop(0x2C), WordProperty::MidNum);
        assert_eq!(word_prop(0x30), WordProperty::Numeric);
        assert_eq!(word_prop(0x27), WordProperty::SingleQuote);
        assert_eq!(word_prop(0x22), WordProperty::DoubleQuote);
        assert_eq!(word_prop(0x5D0), WordProperty::HebrewLetter);
        assert_eq!(word_prop(0x30A2), WordProperty::Katakana);
        assert_eq!(word_prop(0x20), WordProperty::WSegSpace);
        assert_eq!(word_prop(0x2D), WordProperty::Other);
        // Han and Hiragana stay unclassified for word breaking
        assert_eq!(word_prop(0x5B57), WordProperty::Other);
        assert_eq!(word_prop(0x3042), WordProperty::Other);
    }

    #[test]
    fn test_sentence_props() {
        assert_eq!(sentence_prop(0x61), SentenceProperty::Lower);
        assert_eq!(sentence_prop(0x41), SentenceProperty::Upper);
        assert_eq!(sentence_prop(0x5B57), SentenceProperty::OLetter);
        assert_eq!(sentence_prop(0x3002), SentenceProperty::STerm);
        assert_eq!(sentence_prop(0x2E), SentenceProperty::ATerm);
        assert_eq!(sentence_prop(0x29), SentenceProperty::Close);
        assert_eq!(sentence_prop(0x20), SentenceProperty::Sp);
        assert_eq!(sentence_prop(0x2C), SentenceProperty::SContinue);
    }

    #[test]
    fn test_line_props() {
        assert_eq!(line_prop(0x200B), LineProperty::ZW);
        assert_eq!(line_prop(0x20), LineProperty::SP);
        assert_eq!(line_prop(0x30), LineProperty::NU);
        assert_eq!(line_prop(0x61), LineProperty::AL);
        assert_eq!(line_prop(0x2D), LineProperty::HY);
        assert_eq!(line_prop(0x4E00), LineProperty::ID);
        assert_eq!(line_prop(0x28), LineProperty::OP);
        assert_eq!(line_prop(0x29), LineProperty::CP);
        assert_eq!(line_prop(0x7D), LineProperty::CL);
        assert_eq!(line_prop(0x2C), LineProperty::IS);
        assert_eq!(line_prop(0xAC00), LineProperty::H2);
        assert_eq!(line_prop(0xAC01), LineProperty::H3);
        assert_eq!(line_prop(0x1100), LineProperty::JL);
        assert_eq!(line_prop(0x308), LineProperty::CM);
        assert_eq!(line_prop(0xA0), LineProperty::GL);
    }

    #[test]
    fn test_bidi_props() {
        assert_eq!(bidi_prop(0x61), BidiProperty::L);
        assert_eq!(bidi_prop(0x5D0), BidiProperty::R);
        assert_eq!(bidi_prop(0x627), BidiProperty::AL);
        assert_eq!(bidi_prop(0x31), BidiProperty::EN);
        assert_eq!(bidi_prop(0x660), BidiProperty::AN);
        assert_eq!(bidi_prop(0x20), BidiProperty::WS);
        assert_eq!(bidi_prop(0x28), BidiProperty::ON);
        assert_eq!(bidi_prop(0x202B), BidiProperty::RLE);
        assert_eq!(bidi_prop(0x2066), BidiProperty::LRI);
        assert_eq!(bidi_prop(0x2069), BidiProperty::PDI);
        assert_eq!(bidi_prop(0x300), BidiProperty::NSM);
        assert_eq!(bidi_prop(0x9), BidiProperty::S);
        assert_eq!(bidi_prop(0xA), BidiProperty::B);
    }
}
