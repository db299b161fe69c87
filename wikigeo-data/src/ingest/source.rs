//! Lazily evaluated streams of candidate facts.

use std::io;

use thiserror::Error;
use wikigeo_core::{CandidateFact, PropertyId};

/// Iterator of candidate facts borrowed from a [`FactSource`].
pub type FactStream<'a> = Box<dyn Iterator<Item = Result<CandidateFact, FactStreamError>> + 'a>;

/// Selects the facts an ingestion run cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FactFilter {
    /// Property every accepted fact must assert.
    pub property: PropertyId,
}

impl FactFilter {
    /// Filter on `property`.
    #[must_use]
    pub const fn property(property: PropertyId) -> Self {
        Self { property }
    }

    /// Return whether `fact` passes the filter.
    #[must_use]
    pub fn matches(&self, fact: &CandidateFact) -> bool {
        fact.property == self.property
    }
}

impl Default for FactFilter {
    /// Coordinate location (`P625`) claims.
    fn default() -> Self {
        Self::property(PropertyId::COORDINATE_LOCATION)
    }
}

/// Failures raised by a fact stream.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FactStreamError {
    /// The underlying input could not be opened.
    #[error("failed to open fact source {name}: {source}")]
    Open {
        /// Human-readable name of the source, usually a path.
        name: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// Reading from an open stream failed; no further facts can be produced.
    #[error("failed to read fact source at line {line}: {source}")]
    Read {
        /// One-based line number where reading failed.
        line: u64,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// A single record could not be parsed; the stream can continue.
    #[error("skipping malformed record at line {line}: {message}")]
    Parse {
        /// One-based line number of the record.
        line: u64,
        /// Parser message.
        message: String,
    },
}

impl FactStreamError {
    /// Return `true` when the stream can keep producing facts after this
    /// error.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Parse { .. })
    }
}

/// Produces candidate facts for ingestion.
///
/// Streams are lazy: a source over a multi-gigabyte dump must never hold
/// more than a bounded window of facts in memory.
pub trait FactSource {
    /// Return `true` when [`FactSource::facts`] applies the filter itself.
    ///
    /// When `false`, the pipeline discards non-matching facts.
    fn supports_pushdown(&self) -> bool {
        false
    }

    /// Open a stream of facts, applying `filter` when pushdown is supported.
    fn facts(&mut self, filter: &FactFilter) -> Result<FactStream<'_>, FactStreamError>;
}

/// Fact source over an in-memory list.
///
/// The list is consumed by the first call to [`FactSource::facts`]. Errors
/// may be interleaved to exercise recovery paths.
///
/// # Examples
/// ```
/// use serde_json::json;
/// use wikigeo_core::{CandidateFact, EntityId, PropertyId};
/// use wikigeo_data::ingest::{FactFilter, FactSource, VecFactSource};
///
/// let mut source = VecFactSource::new([CandidateFact::new(
///     EntityId::new(1),
///     PropertyId::COORDINATE_LOCATION,
///     json!({}),
/// )]);
/// let facts: Vec<_> = source.facts(&FactFilter::default())?.collect();
/// assert_eq!(facts.len(), 1);
/// # Ok::<(), wikigeo_data::ingest::FactStreamError>(())
/// ```
#[derive(Debug, Default)]
pub struct VecFactSource {
    items: Vec<Result<CandidateFact, FactStreamError>>,
    pushdown: bool,
}

impl VecFactSource {
    /// Serve `facts` in order.
    pub fn new(facts: impl IntoIterator<Item = CandidateFact>) -> Self {
        Self {
            items: facts.into_iter().map(Ok).collect(),
            pushdown: false,
        }
    }

    /// Append a stream error after the facts queued so far.
    #[must_use]
    pub fn with_error(mut self, error: FactStreamError) -> Self {
        self.items.push(Err(error));
        self
    }

    /// Append a fact after the items queued so far.
    #[must_use]
    pub fn with_fact(mut self, fact: CandidateFact) -> Self {
        self.items.push(Ok(fact));
        self
    }

    /// Apply the filter inside the source.
    #[must_use]
    pub fn with_pushdown(mut self) -> Self {
        self.pushdown = true;
        self
    }
}

impl FactSource for VecFactSource {
    fn supports_pushdown(&self) -> bool {
        self.pushdown
    }

    fn facts(&mut self, filter: &FactFilter) -> Result<FactStream<'_>, FactStreamError> {
        let items = std::mem::take(&mut self.items).into_iter();
        if !self.pushdown {
            return Ok(Box::new(items));
        }
        let filter = *filter;
        Ok(Box::new(items.filter(move |item| match item {
            Ok(fact) => filter.matches(fact),
            Err(_) => true,
        })))
    }
}
