//! Tooling primitives for deterministic agent decision making.
//!
//! This crate is intentionally lightweight and engine-agnostic. Inspectors and renderers should
//! live in dedicated adapter crates.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod trace;

pub use trace::{emit, NullTraceSink, SharedTraceLog, TraceEvent, TraceLog, TraceSink};
