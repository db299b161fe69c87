//! Data acquisition and ingestion for the wikigeo toolkit.
//!
//! Responsibilities:
//! - Fetch reference datasets once and stage them into canonical storage
//!   ([`dataset`]).
//! - Stream candidate facts through a bounded worker pool into a spatial
//!   store ([`ingest`]).
//! - Read Wikidata JSON dumps as fact streams and concept indexes
//!   ([`wikidata`]).
//!
//! Boundaries:
//! - Do not encode domain rules (live in `wikigeo-core`).
//! - Keep blocking I/O off async executors; the HTTP fetcher is the only
//!   async surface.
//!
//! Invariants:
//! - Staged datasets are either complete or absent.
//! - At most one accepted record per entity per ingestion run.
//! - No global mutable state.

pub mod dataset;
pub mod ingest;
pub mod wikidata;
