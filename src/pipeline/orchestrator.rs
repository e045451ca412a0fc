//! Episode pipeline: plans → merge → compress → publish.

use crate::audio::DurationProbe;
use crate::book::BookMeta;
use crate::error::{BookcastError, Result};
use crate::exec::CommandExecutor;
use crate::pipeline::compress::CompressStation;
use crate::pipeline::error::{ErrorReporter, FailureLog, FailurePolicy, LogReporter};
use crate::pipeline::merge::MergeStation;
use crate::pipeline::pool::run_workers;
use crate::pipeline::publish::Publisher;
use crate::pipeline::station::StationRunner;
use crate::pipeline::types::{MaterializedEpisode, PublishedEpisode, RunEvent, RunReport};
use crate::planner::EpisodePlan;
use crossbeam_channel::{Sender, bounded};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use tracing::{error, info};

/// How the stages are laid out over threads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PipelineMode {
    /// One thread per stage, connected by bounded channels.
    #[default]
    Staged,
    /// N workers, each running every stage for one episode.
    Pool,
}

/// Configuration for the pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub mode: PipelineMode,
    pub on_error: FailurePolicy,
    /// Worker count for the pool shape.
    pub workers: usize,
    /// Capacity of every inter-stage channel.
    pub channel_buffer: usize,
    /// LAME VBR quality passed to the compress stage.
    pub quality: u8,
    pub ffmpeg: String,
    pub ffprobe: String,
    /// Scratch directory; the system temp directory when unset.
    pub temp_dir: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            mode: PipelineMode::default(),
            on_error: FailurePolicy::default(),
            workers: crate::defaults::pool_workers(),
            channel_buffer: crate::defaults::CHANNEL_BUFFER,
            quality: crate::defaults::ENCODE_QUALITY,
            ffmpeg: crate::defaults::FFMPEG.to_string(),
            ffprobe: crate::defaults::FFPROBE.to_string(),
            temp_dir: None,
        }
    }
}

pub struct Pipeline {
    config: PipelineConfig,
    executor: Arc<dyn CommandExecutor>,
    book: Arc<BookMeta>,
    error_reporter: Arc<dyn ErrorReporter>,
    event_tx: Option<Sender<RunEvent>>,
}

impl Pipeline {
    /// Creates a new pipeline with the default error reporter.
    pub fn new(
        config: PipelineConfig,
        executor: Arc<dyn CommandExecutor>,
        book: Arc<BookMeta>,
    ) -> Self {
        Self {
            config,
            executor,
            book,
            error_reporter: Arc::new(LogReporter),
            event_tx: None,
        }
    }

    /// Sets a custom error reporter.
    pub fn with_error_reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.error_reporter = reporter;
        self
    }

    /// Progress events block on a full channel; pass an unbounded sender
    /// unless the receiver keeps up.
    pub fn with_event_sender(mut self, tx: Sender<RunEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    fn merge_station(&self) -> MergeStation {
        let station = MergeStation::new(self.executor.clone(), self.config.ffmpeg.clone())
            .with_policy(self.config.on_error);
        match &self.config.temp_dir {
            Some(dir) => station.with_temp_dir(dir),
            None => station,
        }
    }

    fn compress_station(&self) -> CompressStation {
        let probe = DurationProbe::new(self.executor.clone(), self.config.ffprobe.clone());
        let station = CompressStation::new(
            self.executor.clone(),
            self.config.ffmpeg.clone(),
            probe,
            self.book.clone(),
        )
        .with_quality(self.config.quality)
        .with_policy(self.config.on_error);
        match &self.config.temp_dir {
            Some(dir) => station.with_temp_dir(dir),
            None => station,
        }
    }

    fn emit(&self, event: RunEvent) {
        if let Some(tx) = &self.event_tx {
            // A dropped receiver only means nobody is watching.
            tx.send(event).ok();
        }
    }

    /// Runs every plan through the pipeline and publishes the results.
    ///
    /// A planning error always ends the run with that error. Episode
    /// failures follow the configured policy: the first one is returned
    /// under `fail-fast`, all of them are listed in the report under
    /// `skip-episode`. Whenever the run ends in an error, episodes it had
    /// already published are removed again.
    pub fn run<I>(&self, plans: I, publisher: &Publisher) -> Result<RunReport>
    where
        I: Iterator<Item = Result<EpisodePlan>> + Send,
    {
        let failures = Arc::new(FailureLog::new(self.error_reporter.clone()));
        info!(mode = ?self.config.mode, on_error = %self.config.on_error, "pipeline starting");

        let (published, planned) = match self.config.mode {
            PipelineMode::Staged => self.run_staged(plans, publisher, &failures),
            PipelineMode::Pool => self.run_pool(plans, publisher, &failures),
        };
        let planned = match planned {
            Ok(planned) => planned,
            Err(e) => {
                publisher.retract(&published);
                return Err(e);
            }
        };

        let failed = failures.failures();
        for failure in &failed {
            self.emit(RunEvent::Failed {
                position: failure.position,
                message: failure.message.clone(),
            });
        }

        if self.config.on_error == FailurePolicy::FailFast
            && let Some(first) = failures.first()
        {
            error!(position = first.position, "run aborted");
            publisher.retract(&published);
            return Err(BookcastError::EpisodeFailed {
                position: first.position,
                message: first.message,
            });
        }

        info!(
            planned,
            published = published.len(),
            failed = failed.len(),
            "pipeline finished"
        );
        Ok(RunReport { published, failed })
    }

    /// Returns what got published along with the number of plans fed, or
    /// the error that ended planning.
    fn run_staged<I>(
        &self,
        plans: I,
        publisher: &Publisher,
        failures: &Arc<FailureLog>,
    ) -> (Vec<PublishedEpisode>, Result<usize>)
    where
        I: Iterator<Item = Result<EpisodePlan>> + Send,
    {
        let buffer = self.config.channel_buffer.max(1);
        let (plan_tx, plan_rx) = bounded(buffer);
        let (merged_tx, merged_rx) = bounded(buffer);
        let (done_tx, done_rx) = bounded(buffer);

        let merge_runner =
            StationRunner::spawn(self.merge_station(), plan_rx, merged_tx, failures.clone());
        let compress_runner = StationRunner::spawn(
            self.compress_station(),
            merged_rx,
            done_tx,
            failures.clone(),
        );

        let (published, fed) = thread::scope(|scope| {
            let feeder = scope.spawn(|| self.feed(plans, plan_tx));

            let mut published = Vec::new();
            for episode in done_rx.iter() {
                if !self.publish(episode, publisher, failures, &mut published) {
                    break;
                }
            }
            // Unblocks compress, which unblocks merge, which unblocks the feeder.
            drop(done_rx);

            let fed = feeder
                .join()
                .unwrap_or_else(|_| Err(BookcastError::Other("plan feeder panicked".to_string())));
            (published, fed)
        });

        for result in [merge_runner.join(), compress_runner.join()] {
            if let Err(msg) = result {
                error!("{msg}");
                return (published, Err(BookcastError::Other(msg)));
            }
        }

        (published, fed)
    }

    fn run_pool<I>(
        &self,
        plans: I,
        publisher: &Publisher,
        failures: &Arc<FailureLog>,
    ) -> (Vec<PublishedEpisode>, Result<usize>)
    where
        I: Iterator<Item = Result<EpisodePlan>> + Send,
    {
        let (plan_tx, plan_rx) = bounded(self.config.channel_buffer.max(1));
        let merge = self.merge_station();
        let compress = self.compress_station();

        let (done, fed) = thread::scope(|scope| {
            let feeder = scope.spawn(|| self.feed(plans, plan_tx));
            let done = run_workers(
                plan_rx,
                self.config.workers,
                &merge,
                &compress,
                failures.as_ref(),
            );
            let fed = feeder
                .join()
                .unwrap_or_else(|_| Err(BookcastError::Other("plan feeder panicked".to_string())));
            (done, fed)
        });
        let mut published = Vec::with_capacity(done.len());
        if fed.is_err() {
            return (published, fed);
        }
        if failures.first().is_none() || self.config.on_error == FailurePolicy::SkipEpisode {
            for episode in done {
                if !self.publish(episode, publisher, failures, &mut published) {
                    break;
                }
            }
        }
        (published, fed)
    }

    /// Sends plans downstream until the planner or the pipeline is done.
    fn feed<I>(&self, plans: I, tx: Sender<EpisodePlan>) -> Result<usize>
    where
        I: Iterator<Item = Result<EpisodePlan>>,
    {
        let mut sent = 0;
        for plan in plans {
            let plan = plan?;
            let position = plan.position;
            if tx.send(plan).is_err() {
                // Downstream shut down after a fatal error.
                break;
            }
            self.emit(RunEvent::Planned { position });
            sent += 1;
        }
        Ok(sent)
    }

    /// Publishes one episode; returns false when the run must stop.
    fn publish(
        &self,
        episode: MaterializedEpisode,
        publisher: &Publisher,
        failures: &FailureLog,
        published: &mut Vec<PublishedEpisode>,
    ) -> bool {
        let position = episode.position;
        match publisher.publish(episode) {
            Ok(done) => {
                self.emit(RunEvent::Published(done.clone()));
                published.push(done);
                true
            }
            Err(e) => {
                let err = self.config.on_error.station_error(position, &e);
                failures.report("Publish", &err);
                !err.is_fatal()
            }
        }
    }
}
