//! Bounded, parallel ingestion of candidate facts into a spatial store.
//!
//! A single reader thread pulls facts from a [`FactSource`] and hands them to
//! a fixed pool of workers over a bounded channel, so memory stays flat no
//! matter how large the source is. Each worker resolves, scope-checks,
//! decodes, and deduplicates a fact before saving it. Per-fact failures are
//! counted in the [`IngestSummary`]; only stream failures and fatal store
//! errors end a run early.
#![forbid(unsafe_code)]

mod dedup;
mod pipeline;
mod progress;
mod source;

pub use dedup::DedupSet;
pub use pipeline::{IngestError, IngestOptions, IngestPipeline, IngestSummary};
pub use source::{FactFilter, FactSource, FactStream, FactStreamError, VecFactSource};
