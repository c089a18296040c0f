use super::digest::hash_file;
use crate::config::positive;
use crate::error::{Error, Result};
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use tracing::{debug, trace};

/// A successfully hashed item.
#[derive(Debug)]
pub struct Hashed<T> {
    pub item: T,
    pub digest: String,
}

/// A per-item hashing failure. Other items are unaffected.
#[derive(Debug)]
pub struct HashFailure<T> {
    pub item: T,
    pub error: io::Error,
}

impl<T: AsRef<Path>> HashFailure<T> {
    pub fn path(&self) -> &Path {
        self.item.as_ref()
    }

    pub fn into_error(self) -> Error {
        Error::Hash {
            path: self.item.as_ref().to_path_buf(),
            source: self.error,
        }
    }
}

impl<T: AsRef<Path>> fmt::Display for HashFailure<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path().display(), self.error)
    }
}

type Completion<T> = (T, io::Result<String>);

/// Worker pool that hashes files with a cap on outstanding tasks.
///
/// Workers only read files and compute digests; results flow back to the
/// thread iterating the [`HashStream`], which is the only place callers see
/// them.
pub struct HashPipeline {
    pool: ThreadPool,
    max_in_flight: usize,
    chunk_size: usize,
}

impl HashPipeline {
    pub fn new(max_workers: usize, max_in_flight: usize, chunk_size: usize) -> Result<Self> {
        positive("max_workers", max_workers)?;
        positive("max_in_flight", max_in_flight)?;
        positive("chunk_size", chunk_size)?;

        let pool = ThreadPoolBuilder::new()
            .num_threads(max_workers)
            .thread_name(|i| format!("idem-hash-{i}"))
            .build()?;
        debug!(
            "Hash pipeline ready: {} workers, {} in flight, {} byte chunks",
            max_workers, max_in_flight, chunk_size
        );

        Ok(Self {
            pool,
            max_in_flight,
            chunk_size,
        })
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight
    }

    /// Hash every item lazily. Items are pulled from `items` only while fewer
    /// than `max_in_flight` tasks are outstanding; results are yielded in
    /// completion order.
    pub fn hash_all<I, T>(&self, items: I) -> HashStream<'_, I::IntoIter, T>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<Path> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        HashStream {
            pipeline: self,
            input: items.into_iter(),
            tx,
            rx,
            in_flight: 0,
            peak_in_flight: 0,
            exhausted: false,
        }
    }

    /// Convenience wrapper: hash every path and collect `(path, digest)` pairs,
    /// failures included, in completion order.
    pub fn hash_paths(&self, paths: Vec<PathBuf>) -> Vec<(PathBuf, io::Result<String>)> {
        self.hash_all(paths)
            .map(|result| match result {
                Ok(hashed) => (hashed.item, Ok(hashed.digest)),
                Err(failure) => (failure.item, Err(failure.error)),
            })
            .collect()
    }
}

pub struct HashStream<'p, I, T> {
    pipeline: &'p HashPipeline,
    input: I,
    tx: Sender<Completion<T>>,
    rx: Receiver<Completion<T>>,
    in_flight: usize,
    peak_in_flight: usize,
    exhausted: bool,
}

impl<I, T> HashStream<'_, I, T>
where
    I: Iterator<Item = T>,
    T: AsRef<Path> + Send + 'static,
{
    /// Tasks submitted but not yet handed back to the caller.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Highest value `in_flight` has reached so far.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight
    }

    fn fill(&mut self) {
        while !self.exhausted && self.in_flight < self.pipeline.max_in_flight {
            match self.input.next() {
                Some(item) => self.submit(item),
                None => self.exhausted = true,
            }
        }
    }

    fn submit(&mut self, item: T) {
        let tx = self.tx.clone();
        let chunk_size = self.pipeline.chunk_size;
        self.pipeline.pool.spawn(move || {
            let result = hash_file(item.as_ref(), chunk_size);
            // The receiver is gone only when the stream was dropped early.
            let _ = tx.send((item, result));
        });
        self.in_flight += 1;
        self.peak_in_flight = self.peak_in_flight.max(self.in_flight);
    }
}

impl<I, T> Iterator for HashStream<'_, I, T>
where
    I: Iterator<Item = T>,
    T: AsRef<Path> + Send + 'static,
{
    type Item = std::result::Result<Hashed<T>, HashFailure<T>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.fill();
        if self.in_flight == 0 {
            return None;
        }

        // `self.tx` keeps the channel open, so this only returns once a worker reports.
        let (item, result) = self.rx.recv().ok()?;
        self.in_flight -= 1;

        Some(match result {
            Ok(digest) => {
                trace!("Hashed {} -> {}", item.as_ref().display(), digest);
                Ok(Hashed { item, digest })
            }
            Err(error) => Err(HashFailure { item, error }),
        })
    }
}
