use flexstr::{SharedStr as FlexStr, ToSharedStr};

pub fn join(v: &[FlexStr], connector: &str) -> FlexStr {
    let result = itertools::join(v.iter().map(FlexStr::as_str), connector);
    result.into()
}

// split a '|' delimited CTD column, dropping empty parts
pub fn split_list(value: &str) -> Vec<FlexStr> {
    value.split('|')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.to_shared_str())
        .collect()
}

pub fn eq_ignore_case(s1: &str, s2: &str) -> bool {
    s1 == s2 || s1.to_lowercase() == s2.to_lowercase()
}

#[test]
fn test_split_list() {
    assert_eq!(split_list("a|b||c "), vec![FlexStr::from("a"), FlexStr::from("b"), FlexStr::from("c")]);
    assert!(split_list("").is_empty());
}

#[test]
fn test_eq_ignore_case() {
    assert!(eq_ignore_case("CYP1A1", "Cyp1a1"));
    assert!(!eq_ignore_case("CYP1A1", "Cyp1a2"));
}
