use std::collections::BTreeMap;
use std::fmt::Display;

/// Named run counters.  Workers return tagged results and only the
/// coordinating task counts them, so no locking is needed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Counters {
    counts: BTreeMap<String, u64>,
}

impl Counters {
    pub fn new() -> Counters {
        Counters::default()
    }

    pub fn increment(&mut self, name: impl Display) {
        self.add(name, 1);
    }

    pub fn add(&mut self, name: impl Display, count: u64) {
        *self.counts.entry(name.to_string()).or_insert(0) += count;
    }

    pub fn get(&self, name: &str) -> u64 {
        self.counts.get(name).copied().unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.counts.iter().map(|(name, count)| (name.as_str(), *count))
    }

    pub fn dump_alphabetically(&self) -> String {
        let mut result = String::new();
        for (name, count) in self.iter() {
            result.push_str(&format!("{}: {}\n", name, count));
        }
        result
    }
}

#[test]
fn test_counters() {
    let mut counters = Counters::new();
    counters.increment("SINGLE MATCH");
    counters.increment("SINGLE MATCH");
    counters.add("ANNOTATIONS_EXP_INSERTED", 5);
    assert_eq!(counters.get("SINGLE MATCH"), 2);
    assert_eq!(counters.get("MULTIMATCH"), 0);

    counters.add("ANNOTATIONS_EXP_INSERTED", 3);
    counters.increment(format!("INTERACTIONS_FOR_SPECIES {}", "RAT"));

    assert_eq!(counters.get("ANNOTATIONS_EXP_INSERTED"), 8);
    assert_eq!(counters.dump_alphabetically(),
               "ANNOTATIONS_EXP_INSERTED: 8\nINTERACTIONS_FOR_SPECIES RAT: 1\nSINGLE MATCH: 2\n");
}
