//! Model catalog: per-endpoint fetchers and the aggregator joining them.

pub mod aggregator;
pub mod fetchers;
