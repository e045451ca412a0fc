//! Worker-pool shape: each worker merges and compresses whole episodes.
//!
//! Workers finish in any order, so the collector sorts by position before
//! anything is published.

use crate::pipeline::compress::CompressStation;
use crate::pipeline::error::{ErrorReporter, StationError};
use crate::pipeline::merge::MergeStation;
use crate::pipeline::station::Station;
use crate::pipeline::types::MaterializedEpisode;
use crate::planner::EpisodePlan;
use crossbeam_channel::{Receiver, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

/// Runs merge then compress for one plan, naming the stage that failed.
fn produce(
    merge: &mut MergeStation,
    compress: &mut CompressStation,
    plan: EpisodePlan,
) -> Result<MaterializedEpisode, (&'static str, StationError)> {
    let merged = merge.process(plan).map_err(|e| (merge.name(), e))?;
    compress.process(merged).map_err(|e| (compress.name(), e))
}

/// Processes plans from `plans` on `workers` threads.
///
/// Returns every produced episode sorted by position. Failures go to
/// `reporter`; a fatal one makes all workers stop taking new plans, which
/// in turn closes `plans` for the feeder.
pub fn run_workers(
    plans: Receiver<EpisodePlan>,
    workers: usize,
    merge: &MergeStation,
    compress: &CompressStation,
    reporter: &dyn ErrorReporter,
) -> Vec<MaterializedEpisode> {
    let workers = workers.max(1);
    let (done_tx, done_rx) = crossbeam_channel::unbounded();
    let stop = AtomicBool::new(false);

    thread::scope(|scope| {
        for _ in 0..workers {
            let plans = plans.clone();
            let done_tx: Sender<MaterializedEpisode> = done_tx.clone();
            let mut merge = merge.clone();
            let mut compress = compress.clone();
            let stop = &stop;

            scope.spawn(move || {
                while let Ok(plan) = plans.recv() {
                    if stop.load(Ordering::SeqCst) {
                        break;
                    }
                    match produce(&mut merge, &mut compress, plan) {
                        Ok(episode) => {
                            if done_tx.send(episode).is_err() {
                                break;
                            }
                        }
                        Err((station, err)) => {
                            reporter.report(station, &err);
                            if err.is_fatal() {
                                stop.store(true, Ordering::SeqCst);
                                break;
                            }
                        }
                    }
                }
            });
        }
        // Workers own the only remaining handles; the pool ends when they do.
        drop(plans);
        drop(done_tx);
    });

    let mut done: Vec<_> = done_rx.try_iter().collect();
    done.sort_by_key(|episode| episode.position);
    done
}
