pub mod term;
pub mod gene;

pub use self::term::{TermResolver, TermMatch, TermIndexStats};
pub use self::gene::{GeneCaches, GeneResolver, GeneResolution, MatchKind, SkipReason};
