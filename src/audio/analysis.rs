//! Per-file analysis: duration plus optional silence map.
//!
//! Files can be analysed on several threads at once. Results are handed out
//! strictly in enumeration order because the planner's debt depends on every
//! file before the current one.

use crate::audio::probe::DurationProbe;
use crate::audio::silence::SilenceDetector;
use crate::error::{BookcastError, Result};
use crate::planner::{AnalyzedFile, AudioFile};
use crossbeam_channel::{Receiver, bounded};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, warn};

/// Produces `AnalyzedFile`s from plain `AudioFile`s.
#[derive(Clone)]
pub struct Analyzer {
    probe: DurationProbe,
    silence: Option<SilenceDetector>,
}

impl Analyzer {
    pub fn new(probe: DurationProbe) -> Self {
        Self {
            probe,
            silence: None,
        }
    }

    /// Enables silence detection.
    pub fn with_silence(mut self, detector: SilenceDetector) -> Self {
        self.silence = Some(detector);
        self
    }

    pub fn analyze(&self, file: AudioFile) -> Result<AnalyzedFile> {
        let duration = self.probe.duration_of(&file)?;
        let silences = match &self.silence {
            Some(detector) => detector.detect(file.path())?,
            None => Vec::new(),
        };
        debug!(
            file = %file.path().display(),
            duration_secs = duration.as_secs_f64(),
            silences = silences.len(),
            "analyzed"
        );
        Ok(AnalyzedFile::new(Arc::new(file), duration, silences))
    }

    /// Analyses `files` on `workers` threads, yielding results in input order.
    pub fn analyze_ordered<I>(self: Arc<Self>, files: I, workers: usize) -> OrderedAnalysis
    where
        I: IntoIterator<Item = AudioFile>,
        I::IntoIter: Send + 'static,
    {
        OrderedAnalysis::spawn(self, files.into_iter(), workers.max(1))
    }
}

/// What the feeder thread managed to hand out.
struct FeedSummary {
    sent: usize,
    exhausted: bool,
}

type Indexed<T> = (usize, T);

/// Ordered iterator over analysis results computed in parallel.
///
/// Dropping it stops the workers after their current file and joins them.
pub struct OrderedAnalysis {
    results: Option<Receiver<Indexed<Result<AnalyzedFile>>>>,
    pending: BTreeMap<usize, Result<AnalyzedFile>>,
    next: usize,
    feeder: Option<JoinHandle<FeedSummary>>,
    workers: Vec<JoinHandle<()>>,
    finished: bool,
}

impl OrderedAnalysis {
    fn spawn<I>(analyzer: Arc<Analyzer>, files: I, workers: usize) -> Self
    where
        I: Iterator<Item = AudioFile> + Send + 'static,
    {
        let (job_tx, job_rx) = bounded::<Indexed<AudioFile>>(workers);
        let (result_tx, result_rx) = bounded(workers * 2);

        let feeder = thread::spawn(move || {
            let mut sent = 0;
            for (index, file) in files.enumerate() {
                if job_tx.send((index, file)).is_err() {
                    return FeedSummary {
                        sent,
                        exhausted: false,
                    };
                }
                sent += 1;
            }
            FeedSummary {
                sent,
                exhausted: true,
            }
        });

        let handles = (0..workers)
            .map(|_| {
                let analyzer = Arc::clone(&analyzer);
                let jobs = job_rx.clone();
                let results = result_tx.clone();
                thread::spawn(move || {
                    while let Ok((index, file)) = jobs.recv() {
                        if results.send((index, analyzer.analyze(file))).is_err() {
                            break;
                        }
                    }
                })
            })
            .collect();

        Self {
            results: Some(result_rx),
            pending: BTreeMap::new(),
            next: 0,
            feeder: Some(feeder),
            workers: handles,
            finished: false,
        }
    }

    /// Called once every worker has hung up; detects lost files.
    fn check_complete(&mut self) -> Option<Result<AnalyzedFile>> {
        let summary = self.feeder.take().map(|handle| handle.join());
        match summary {
            Some(Ok(FeedSummary { sent, exhausted })) if exhausted && sent == self.next => None,
            Some(Ok(_)) | None => Some(Err(BookcastError::Other(format!(
                "analysis stopped before file #{}",
                self.next + 1
            )))),
            Some(Err(_)) => Some(Err(BookcastError::Other(
                "analysis feeder thread panicked".to_string(),
            ))),
        }
    }
}

impl Iterator for OrderedAnalysis {
    type Item = Result<AnalyzedFile>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        loop {
            if let Some(result) = self.pending.remove(&self.next) {
                self.next += 1;
                return Some(result);
            }
            let received = self.results.as_ref().and_then(|rx| rx.recv().ok());
            match received {
                Some((index, result)) => {
                    self.pending.insert(index, result);
                }
                None => {
                    self.finished = true;
                    return self.check_complete();
                }
            }
        }
    }
}

impl Drop for OrderedAnalysis {
    fn drop(&mut self) {
        // Hanging up makes every worker's next send fail.
        self.results.take();
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                warn!("analysis worker panicked");
            }
        }
        if let Some(feeder) = self.feeder.take()
            && feeder.join().is_err()
        {
            warn!("analysis feeder thread panicked");
        }
    }
}
