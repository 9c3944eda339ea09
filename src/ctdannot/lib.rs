#[macro_use] extern crate lazy_static;
#[macro_use] extern crate tracing;

pub mod types;
pub mod utils;
pub mod config;
pub mod data_types;
pub mod counters;
pub mod normalize;
pub mod cache;
pub mod workers;
pub mod store;
pub mod resolve;
pub mod synonym;
pub mod synthesize;
pub mod reconcile;
pub mod sweep;
pub mod source;
pub mod pipeline;
