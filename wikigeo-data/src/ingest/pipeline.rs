//! Bounded worker pool that turns candidate facts into stored geometries.

use std::{
    any::Any,
    io,
    num::{NonZeroU64, NonZeroUsize},
    panic::{self, AssertUnwindSafe},
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicBool, Ordering},
        mpsc::{self, Receiver, SyncSender},
    },
    thread,
};

use log::{debug, info, warn};
use thiserror::Error;
use wikigeo_core::{
    AcceptedRecord, CandidateFact, ConceptResolver, CounterKind, EARTH_REFERENCE_SYSTEM,
    GeometryDecoder, LanguageSet, SpatialStore, StoreError, WIKIDATA_LAYER,
};

use super::progress::{Discard, IngestCounters};
use super::{DedupSet, FactFilter, FactSource, FactStream, FactStreamError};

const DEFAULT_BACKLOG: usize = 100;
const DEFAULT_PROGRESS_INTERVAL: NonZeroU64 = match NonZeroU64::new(10_000) {
    Some(interval) => interval,
    None => NonZeroU64::MIN,
};

/// Tuning knobs for [`IngestPipeline::run`].
#[derive(Debug, Clone)]
pub struct IngestOptions {
    workers: NonZeroUsize,
    backlog: usize,
    progress_interval: NonZeroU64,
    layer: String,
    reference_system: String,
    cancellation: Option<Arc<AtomicBool>>,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            workers: thread::available_parallelism().unwrap_or(NonZeroUsize::MIN),
            backlog: DEFAULT_BACKLOG,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            layer: WIKIDATA_LAYER.to_owned(),
            reference_system: EARTH_REFERENCE_SYSTEM.to_owned(),
            cancellation: None,
        }
    }
}

impl IngestOptions {
    /// Number of worker threads.
    #[must_use]
    pub fn with_workers(mut self, workers: NonZeroUsize) -> Self {
        self.workers = workers;
        self
    }

    /// Capacity of the queue between the reader and the workers.
    ///
    /// The reader blocks once this many facts are waiting. Zero makes every
    /// hand-off a rendezvous.
    #[must_use]
    pub fn with_backlog(mut self, backlog: usize) -> Self {
        self.backlog = backlog;
        self
    }

    /// Number of processed facts between progress log lines.
    #[must_use]
    pub fn with_progress_interval(mut self, interval: NonZeroU64) -> Self {
        self.progress_interval = interval;
        self
    }

    /// Layer accepted records are written to.
    #[must_use]
    pub fn with_layer(mut self, layer: impl Into<String>) -> Self {
        self.layer = layer.into();
        self
    }

    /// Reference system recorded on accepted records.
    #[must_use]
    pub fn with_reference_system(mut self, reference_system: impl Into<String>) -> Self {
        self.reference_system = reference_system.into();
        self
    }

    /// Stop reading new facts once `flag` becomes `true`.
    ///
    /// Facts already queued are still processed.
    #[must_use]
    pub fn with_cancellation(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancellation = Some(flag);
        self
    }

    /// Configured worker count.
    #[must_use]
    pub const fn workers(&self) -> NonZeroUsize {
        self.workers
    }

    /// Configured queue capacity.
    #[must_use]
    pub const fn backlog(&self) -> usize {
        self.backlog
    }

    /// Configured progress interval.
    #[must_use]
    pub const fn progress_interval(&self) -> NonZeroU64 {
        self.progress_interval
    }

    /// Layer accepted records are written to.
    #[must_use]
    pub fn layer(&self) -> &str {
        &self.layer
    }

    /// Reference system recorded on accepted records.
    #[must_use]
    pub fn reference_system(&self) -> &str {
        &self.reference_system
    }

    fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }
}

/// Aggregate outcome of an ingestion run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestSummary {
    /// Facts handed to workers.
    pub total: u64,
    /// Facts stored as accepted records.
    pub matched: u64,
    /// Facts whose entity the resolver did not know.
    pub unresolved: u64,
    /// Facts whose concept had no article in the requested languages.
    pub out_of_scope: u64,
    /// Facts whose payload was malformed or not an Earth geometry.
    pub undecodable: u64,
    /// Facts for an entity already accepted in this run.
    pub duplicates: u64,
    /// Records the store rejected.
    pub failed_writes: u64,
    /// Malformed source records skipped by the reader.
    pub skipped_records: u64,
    /// Whether the run stopped early because cancellation was requested.
    pub cancelled: bool,
}

impl IngestSummary {
    fn log(&self) {
        info!(
            "ingested {} of {} facts ({} unresolved, {} out of scope, {} undecodable, {} duplicates, {} failed writes, {} skipped records{})",
            self.matched,
            self.total,
            self.unresolved,
            self.out_of_scope,
            self.undecodable,
            self.duplicates,
            self.failed_writes,
            self.skipped_records,
            if self.cancelled { ", cancelled" } else { "" }
        );
    }
}

/// Errors that abort an ingestion run.
///
/// Records written before the failure remain in the store.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum IngestError {
    /// The fact stream could not be opened.
    #[error("failed to open fact stream: {source}")]
    OpenSource {
        /// Stream failure.
        #[source]
        source: FactStreamError,
    },
    /// The fact stream failed part way through.
    #[error("fact stream failed after {processed} facts: {source}")]
    ReadFact {
        /// Facts processed before the failure.
        processed: u64,
        /// Stream failure.
        #[source]
        source: FactStreamError,
    },
    /// The store reported an error no further write can recover from.
    #[error("spatial store failed: {source}")]
    Store {
        /// Store failure.
        #[source]
        source: StoreError,
    },
    /// A worker thread could not be started.
    #[error("failed to spawn ingestion worker: {source}")]
    SpawnWorker {
        /// OS failure.
        #[source]
        source: io::Error,
    },
}

/// Streams facts through resolve, scope, decode, dedup, and save stages.
///
/// # Examples
/// ```
/// use serde_json::json;
/// use wikigeo_core::test_support::MemoryStore;
/// use wikigeo_core::{
///     CandidateFact, Concept, ConceptIndex, EntityId, Language, PropertyId,
///     WikidataCoordinateDecoder,
/// };
/// use wikigeo_data::ingest::{FactFilter, IngestPipeline, VecFactSource};
///
/// let berlin = EntityId::new(64);
/// let index: ConceptIndex = [Concept::new(berlin, [Language::new("de")?])]
///     .into_iter()
///     .collect();
/// let pipeline = IngestPipeline::new(index, WikidataCoordinateDecoder, MemoryStore::default());
/// let mut source = VecFactSource::new([CandidateFact::new(
///     berlin,
///     PropertyId::COORDINATE_LOCATION,
///     json!({"latitude": 52.52, "longitude": 13.40, "globe": "http://www.wikidata.org/entity/Q2"}),
/// )]);
///
/// let summary = pipeline.run(&mut source, &FactFilter::default(), &"de".parse()?)?;
/// assert_eq!(summary.matched, 1);
/// assert_eq!(pipeline.store().records_for(berlin).len(), 1);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct IngestPipeline<R, D, S> {
    resolver: R,
    decoder: D,
    store: S,
    options: IngestOptions,
}

/// State shared by the reader and every worker for one run.
struct RunState<'a> {
    queue: Mutex<Receiver<CandidateFact>>,
    seen: DedupSet,
    counters: IngestCounters,
    abort: AtomicBool,
    fatal: Mutex<Option<StoreError>>,
    panic: Mutex<Option<Box<dyn Any + Send>>>,
    languages: &'a LanguageSet,
}

impl RunState<'_> {
    fn record_fatal(&self, err: StoreError) {
        self.abort.store(true, Ordering::SeqCst);
        let mut slot = self.fatal.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_none() {
            warn!("aborting ingestion: {err}");
            *slot = Some(err);
        }
    }

    fn record_panic(&self, payload: Box<dyn Any + Send>) {
        self.abort.store(true, Ordering::SeqCst);
        let mut slot = self.panic.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_none() {
            warn!("aborting ingestion: a worker panicked");
            *slot = Some(payload);
        }
    }
}

/// How the reader stopped.
enum ReadOutcome {
    Exhausted,
    Cancelled,
    Failed(FactStreamError),
    Aborted,
}

impl<R, D, S> IngestPipeline<R, D, S>
where
    R: ConceptResolver + Sync,
    D: GeometryDecoder + Sync,
    S: SpatialStore + Sync,
{
    /// Build a pipeline with default options.
    pub fn new(resolver: R, decoder: D, store: S) -> Self {
        Self {
            resolver,
            decoder,
            store,
            options: IngestOptions::default(),
        }
    }

    /// Replace the pipeline options.
    #[must_use]
    pub fn with_options(mut self, options: IngestOptions) -> Self {
        self.options = options;
        self
    }

    /// Options in effect.
    pub fn options(&self) -> &IngestOptions {
        &self.options
    }

    /// Resolver consulted for each fact.
    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    /// Store accepted records are written to.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Take the resolver, decoder, and store back.
    pub fn into_parts(self) -> (R, D, S) {
        (self.resolver, self.decoder, self.store)
    }

    /// Drain `source` through the worker pool and report what happened.
    ///
    /// Facts are resolved, checked against `languages`, decoded, and
    /// deduplicated before being saved. Per-fact failures are counted in the
    /// summary; only stream and fatal store errors end the run early.
    ///
    /// # Panics
    ///
    /// A panic raised by the resolver, decoder, or store stops reading. The
    /// workers drain what is queued and the panic resumes on the calling
    /// thread.
    pub fn run<F>(
        &self,
        source: &mut F,
        filter: &FactFilter,
        languages: &LanguageSet,
    ) -> Result<IngestSummary, IngestError>
    where
        F: FactSource + ?Sized,
    {
        let pushdown = source.supports_pushdown();
        let stream = source
            .facts(filter)
            .map_err(|source| IngestError::OpenSource { source })?;

        let (sender, receiver) = mpsc::sync_channel(self.options.backlog);
        let state = RunState {
            queue: Mutex::new(receiver),
            seen: DedupSet::new(),
            counters: IngestCounters::new(self.options.progress_interval),
            abort: AtomicBool::new(false),
            fatal: Mutex::new(None),
            panic: Mutex::new(None),
            languages,
        };
        info!(
            "ingesting facts for {} with {} workers",
            filter.property,
            self.options.workers
        );

        let outcome = thread::scope(|threads| {
            let state = &state;
            let mut handles = Vec::with_capacity(self.options.workers.get());
            for index in 0..self.options.workers.get() {
                let spawned = thread::Builder::new()
                    .name(format!("ingest-worker-{index}"))
                    .spawn_scoped(threads, move || self.work(state));
                match spawned {
                    Ok(handle) => handles.push(handle),
                    Err(source) => {
                        state.abort.store(true, Ordering::SeqCst);
                        drop(sender);
                        return Err(IngestError::SpawnWorker { source });
                    }
                }
            }

            let outcome = self.read(stream, sender, filter, pushdown, state);
            for handle in handles {
                if let Err(payload) = handle.join() {
                    panic::resume_unwind(payload);
                }
            }
            Ok(outcome)
        })?;

        if let Some(payload) = state
            .panic
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
        {
            panic::resume_unwind(payload);
        }
        let fatal = state
            .fatal
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(source) = fatal {
            return Err(IngestError::Store { source });
        }
        let summary = state
            .counters
            .summary(matches!(outcome, ReadOutcome::Cancelled));
        match outcome {
            ReadOutcome::Failed(source) => Err(IngestError::ReadFact {
                processed: summary.total,
                source,
            }),
            ReadOutcome::Exhausted | ReadOutcome::Cancelled | ReadOutcome::Aborted => {
                summary.log();
                Ok(summary)
            }
        }
    }

    fn read(
        &self,
        stream: FactStream<'_>,
        sender: SyncSender<CandidateFact>,
        filter: &FactFilter,
        pushdown: bool,
        state: &RunState<'_>,
    ) -> ReadOutcome {
        for item in stream {
            if state.abort.load(Ordering::SeqCst) {
                return ReadOutcome::Aborted;
            }
            if self.options.is_cancelled() {
                info!("ingestion cancelled; draining queued facts");
                return ReadOutcome::Cancelled;
            }
            match item {
                Ok(fact) => {
                    if !pushdown && !filter.matches(&fact) {
                        continue;
                    }
                    if sender.send(fact).is_err() {
                        return ReadOutcome::Aborted;
                    }
                }
                Err(err) if err.is_recoverable() => {
                    debug!("{err}");
                    state.counters.skipped();
                }
                Err(err) => return ReadOutcome::Failed(err),
            }
        }
        ReadOutcome::Exhausted
    }

    fn work(&self, state: &RunState<'_>) {
        loop {
            let next = state
                .queue
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .recv();
            let Ok(fact) = next else {
                break;
            };
            // After a fatal error or a panic the queue is drained so the
            // reader never blocks on a full channel.
            if state.abort.load(Ordering::SeqCst) {
                continue;
            }
            match panic::catch_unwind(AssertUnwindSafe(|| self.process(fact, state))) {
                Ok(Ok(())) => {}
                Ok(Err(err)) => state.record_fatal(err),
                Err(payload) => state.record_panic(payload),
            }
        }
    }

    fn process(&self, fact: CandidateFact, state: &RunState<'_>) -> Result<(), StoreError> {
        let counters = &state.counters;
        counters.processed();

        let Some(concept) = self.resolver.resolve(&fact.entity) else {
            debug!("dropping {}: entity not resolved", fact.entity);
            counters.dropped(Discard::Unresolved);
            return Ok(());
        };
        if !self.resolver.in_language_scope(&concept, state.languages) {
            debug!("dropping {}: no article in {}", fact.entity, state.languages);
            counters.dropped(Discard::OutOfScope);
            return Ok(());
        }
        let geometry = match self.decoder.decode(&fact.payload) {
            Ok(Some(geometry)) => geometry,
            Ok(None) => {
                debug!("dropping {}: payload is not an Earth geometry", fact.entity);
                counters.dropped(Discard::Undecodable);
                return Ok(());
            }
            Err(err) => {
                debug!("dropping {}: {err}", fact.entity);
                counters.dropped(Discard::Undecodable);
                return Ok(());
            }
        };
        if !state.seen.test_and_insert(fact.entity) {
            counters.dropped(Discard::Duplicate);
            return Ok(());
        }

        let record = AcceptedRecord::new(
            fact.entity,
            self.options.layer.as_str(),
            self.options.reference_system.as_str(),
            geometry,
        );
        match self.store.save(&record) {
            Ok(()) => counters.matched(),
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => {
                debug!("failed to store {}: {err}", fact.entity);
                counters.dropped(Discard::FailedWrite);
                return Ok(());
            }
        }
        match self.store.increment_counter(CounterKind::Geometry) {
            Err(err) if err.is_fatal() => Err(err),
            Err(err) => {
                debug!("failed to bump geometry counter: {err}");
                Ok(())
            }
            Ok(()) => Ok(()),
        }
    }
}
