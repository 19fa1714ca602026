// packline - rule-driven asset pipeline
// Walks an entry's dependency graph, runs one pipeline per asset and
// writes content-fingerprinted artifacts.

pub mod cli;
pub mod core;
pub mod infrastructure;
pub mod plugins;
pub mod utils;
