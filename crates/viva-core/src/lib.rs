//! viva-core — Attempt lifecycle, scoring pipeline, and dashboard aggregation.
//!
//! This crate defines the data model, the attempt state machine, the
//! asynchronous scoring pipeline, and the read-side aggregations that the
//! rest of the viva system builds on.

pub mod assessment;
pub mod dashboard;
pub mod engine;
pub mod error;
pub mod memory;
pub mod model;
pub mod parser;
pub mod scoring;
pub mod traits;
