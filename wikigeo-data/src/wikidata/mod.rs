//! Wikidata JSON dumps as fact streams and concept indexes.
//!
//! A dump is read twice during ingestion: once by [`load_concept_index`] to
//! learn which Wikipedia editions cover each item, and once by
//! [`DumpFactSource`] to stream coordinate claims into the pipeline. Both
//! passes parse one entity per line and never hold the whole dump in memory.
#![forbid(unsafe_code)]

mod concepts;
mod entity;
mod facts;

use std::io;

use thiserror::Error;

pub use concepts::{load_concept_index, sitelink_language};
pub use facts::{DumpFactSource, DumpReader, open_dump};

/// Errors raised while indexing a dump.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WikidataError {
    /// Reading the dump failed.
    #[error("failed to read Wikidata dump at line {line}: {source}")]
    Read {
        /// One-based line number where reading failed.
        line: u64,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
}

#[cfg(test)]
mod tests;
