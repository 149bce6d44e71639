pub mod config;
pub mod deduplicator;
pub mod normalize;
pub mod planner;
