use std::collections::BTreeSet;

use regex::Regex;

lazy_static! {
    static ref NON_WORD_RE: Regex = Regex::new(r"\W+").unwrap();
}

pub const NORMALIZED_NAME_DELIMITER: &str = ".";

/// Turn a chemical or term name into a key for name matching: split on runs
/// of non-word characters, lowercase, remove duplicate words, sort and rejoin.
/// "Acetic Acid, sodium salt" and "sodium salt of acetic-acid" give the same
/// key.
pub fn normalize_term_name(name: &str) -> String {
    let words: BTreeSet<String> = NON_WORD_RE.split(name)
        .filter(|word| !word.is_empty())
        .map(|word| word.to_lowercase())
        .collect();

    itertools::join(words, NORMALIZED_NAME_DELIMITER)
}

#[test]
fn test_normalize_term_name() {
    assert_eq!(normalize_term_name("Acetic Acid, sodium salt"), "acetic.acid.salt.sodium");
    assert_eq!(normalize_term_name("sodium  salt of acetic-acid"), "acetic.acid.of.salt.sodium");
    assert_eq!(normalize_term_name("2,4-dinitrophenol"), "2.4.dinitrophenol");
    assert_eq!(normalize_term_name("acid ACID acid"), "acid");
    assert_eq!(normalize_term_name(""), "");
    assert_eq!(normalize_term_name("  --  "), "");
}

#[test]
fn test_normalize_ignores_order_and_punctuation() {
    assert_eq!(normalize_term_name("benzo(a)pyrene"),
               normalize_term_name("Pyrene, BENZO A"));
}

#[test]
fn test_normalize_idempotent() {
    for name in ["Acetic Acid, sodium salt", "bisphenol A", "N,N-dimethyl-formamide",
                 "", "tetrachlorodibenzodioxin", "Vitamin B 12"] {
        let once = normalize_term_name(name);
        assert_eq!(normalize_term_name(&once), once);
    }
}
