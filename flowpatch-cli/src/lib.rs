//! Library half of the `flowpatch` binary: configuration loading and merging.

pub mod config;
