//! Cross-module scenarios.

#[cfg(test)]
mod fixtures;

mod concurrency;
mod failure_modes;
mod funding_flows;
