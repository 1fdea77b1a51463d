//! Domain logic for the vitrine product-search gateway.
//!
//! This crate has no I/O: query normalization, cache-key construction,
//! engine DSL building, cursor encoding, variant-to-product grouping,
//! suggestion merging, the circuit-breaker state machine, and in-process
//! metrics all live here so they can be unit-tested without a running
//! engine, database, or cache.

pub mod breaker;
pub mod cursor;
pub mod document;
pub mod dsl;
pub mod error;
pub mod facets;
pub mod group;
pub mod metrics;
pub mod query;
pub mod suggest;
pub mod types;
