//! Streaming candidate facts out of a Wikidata JSON dump.

use std::{
    collections::VecDeque,
    io::{self, BufRead, BufReader},
};

use bzip2::read::MultiBzDecoder;
use camino::Utf8Path;
use flate2::read::MultiGzDecoder;
use wikigeo_core::CandidateFact;

use super::entity::{RawEntity, entity_json};
use crate::ingest::{FactFilter, FactSource, FactStream, FactStreamError};

const READ_BUFFER: usize = 1 << 20;

/// Buffered reader over a possibly compressed dump.
pub type DumpReader = Box<dyn BufRead + Send>;

/// Open a dump, decompressing `.bz2` and `.gz` files on the fly.
pub fn open_dump(path: &Utf8Path) -> io::Result<DumpReader> {
    let file = wikigeo_fs::open_utf8_file(path)?.into_std();
    let reader: DumpReader = match path.extension() {
        Some("bz2") => Box::new(BufReader::with_capacity(
            READ_BUFFER,
            MultiBzDecoder::new(file),
        )),
        Some("gz") => Box::new(BufReader::with_capacity(
            READ_BUFFER,
            MultiGzDecoder::new(file),
        )),
        _ => Box::new(BufReader::with_capacity(READ_BUFFER, file)),
    };
    Ok(reader)
}

/// [`FactSource`] over a line-delimited Wikidata JSON dump.
///
/// The property filter is applied while parsing, so only matching claims
/// ever leave the source. Each call to [`FactSource::facts`] continues from
/// where the previous stream stopped.
///
/// # Examples
/// ```
/// use std::io::Cursor;
/// use wikigeo_data::ingest::{FactFilter, FactSource};
/// use wikigeo_data::wikidata::DumpFactSource;
///
/// let dump = "[\n{\"id\":\"Q64\",\"claims\":{\"P625\":[{\"mainsnak\":{\"snaktype\":\"value\",\"datavalue\":{\"type\":\"globecoordinate\",\"value\":{\"latitude\":52.5,\"longitude\":13.4}}}}]}}\n]\n";
/// let mut source = DumpFactSource::new(Cursor::new(dump));
/// let facts: Vec<_> = source.facts(&FactFilter::default())?.collect::<Result<_, _>>()?;
/// assert_eq!(facts.len(), 1);
/// # Ok::<(), wikigeo_data::ingest::FactStreamError>(())
/// ```
#[derive(Debug)]
pub struct DumpFactSource<R> {
    reader: R,
    line: u64,
}

impl<R: BufRead> DumpFactSource<R> {
    /// Stream facts from `reader`.
    pub const fn new(reader: R) -> Self {
        Self { reader, line: 0 }
    }
}

impl DumpFactSource<DumpReader> {
    /// Open the dump at `path`.
    pub fn open(path: &Utf8Path) -> Result<Self, FactStreamError> {
        open_dump(path)
            .map(Self::new)
            .map_err(|source| FactStreamError::Open {
                name: path.to_string(),
                source,
            })
    }
}

impl<R: BufRead> FactSource for DumpFactSource<R> {
    fn supports_pushdown(&self) -> bool {
        true
    }

    fn facts(&mut self, filter: &FactFilter) -> Result<FactStream<'_>, FactStreamError> {
        Ok(Box::new(DumpFacts {
            reader: &mut self.reader,
            line: &mut self.line,
            filter: *filter,
            buffer: String::new(),
            pending: VecDeque::new(),
            finished: false,
        }))
    }
}

struct DumpFacts<'a, R> {
    reader: &'a mut R,
    line: &'a mut u64,
    filter: FactFilter,
    buffer: String,
    pending: VecDeque<CandidateFact>,
    finished: bool,
}

impl<R: BufRead> Iterator for DumpFacts<'_, R> {
    type Item = Result<CandidateFact, FactStreamError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(fact) = self.pending.pop_front() {
                return Some(Ok(fact));
            }
            if self.finished {
                return None;
            }
            self.buffer.clear();
            match self.reader.read_line(&mut self.buffer) {
                Ok(0) => {
                    self.finished = true;
                    return None;
                }
                Ok(_) => *self.line += 1,
                Err(source) => {
                    self.finished = true;
                    return Some(Err(FactStreamError::Read {
                        line: *self.line + 1,
                        source,
                    }));
                }
            }
            let Some(json) = entity_json(&self.buffer) else {
                continue;
            };
            match RawEntity::parse(json) {
                Ok(entity) => self
                    .pending
                    .extend(entity.into_facts(self.filter.property)),
                Err(err) => {
                    return Some(Err(FactStreamError::Parse {
                        line: *self.line,
                        message: err.to_string(),
                    }));
                }
            }
        }
    }
}
