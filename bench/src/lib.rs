//! Benchmark utilities for latch.
//!
//! This crate provides the fixtures shared by the container and factory
//! benchmarks:
//!
//! - **Components**: representative component types with real codec impls
//! - **Populations**: registries and kind sets shaped like modded processes
//!
//! # Running Benchmarks
//!
//! ```bash
//! # Run all benchmarks
//! cargo bench -p latch_bench
//!
//! # Run specific benchmark group
//! cargo bench -p latch_bench -- get
//! ```
//!
//! Results are written to `target/criterion/` with HTML reports for
//! visualization.

pub mod components;
pub mod populations;
