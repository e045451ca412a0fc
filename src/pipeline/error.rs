//! Error types and reporting for pipeline stations.

use crate::error::BookcastError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex};
use tracing::{error, warn};

/// What happens to the run when one episode fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Stop at the first failure and return its error.
    #[default]
    FailFast,
    /// Report the failing episode and keep going with the rest.
    SkipEpisode,
}

impl FailurePolicy {
    /// Wraps a stage failure for `position` according to the policy.
    pub fn station_error(self, position: usize, error: &BookcastError) -> StationError {
        let message = error.to_string();
        match self {
            FailurePolicy::FailFast => StationError::Fatal { position, message },
            FailurePolicy::SkipEpisode => StationError::Recoverable { position, message },
        }
    }
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailurePolicy::FailFast => write!(f, "fail-fast"),
            FailurePolicy::SkipEpisode => write!(f, "skip-episode"),
        }
    }
}

/// Errors that can occur while a station processes one episode.
#[derive(Debug, Clone, PartialEq)]
pub enum StationError {
    /// The episode is lost; the station keeps processing.
    Recoverable { position: usize, message: String },
    /// The station shuts down, which drains the whole pipeline.
    Fatal { position: usize, message: String },
}

impl StationError {
    pub fn position(&self) -> usize {
        match self {
            StationError::Recoverable { position, .. } | StationError::Fatal { position, .. } => {
                *position
            }
        }
    }

    pub fn message(&self) -> &str {
        match self {
            StationError::Recoverable { message, .. } | StationError::Fatal { message, .. } => {
                message
            }
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, StationError::Fatal { .. })
    }
}

impl fmt::Display for StationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StationError::Recoverable { position, message } => {
                write!(f, "Episode {} skipped: {}", position, message)
            }
            StationError::Fatal { position, message } => {
                write!(f, "Episode {} failed: {}", position, message)
            }
        }
    }
}

impl std::error::Error for StationError {}

/// Trait for reporting station errors.
pub trait ErrorReporter: Send + Sync {
    /// Reports an error from a station.
    fn report(&self, station: &str, error: &StationError);
}

/// Default reporter: writes through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogReporter;

impl ErrorReporter for LogReporter {
    fn report(&self, station: &str, err: &StationError) {
        match err {
            StationError::Recoverable { position, message } => {
                warn!(station, position, "{}", message);
            }
            StationError::Fatal { position, message } => {
                error!(station, position, "{}", message);
            }
        }
    }
}

/// One failed episode as seen by the run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EpisodeFailure {
    pub position: usize,
    pub station: String,
    pub message: String,
}

/// Records every failure and forwards it to another reporter.
///
/// The orchestrator wraps the user's reporter in one of these so it can
/// build the run report without a second error path.
pub struct FailureLog {
    inner: Arc<dyn ErrorReporter>,
    failures: Mutex<Vec<EpisodeFailure>>,
}

impl FailureLog {
    pub fn new(inner: Arc<dyn ErrorReporter>) -> Self {
        Self {
            inner,
            failures: Mutex::new(Vec::new()),
        }
    }

    /// Failures so far, sorted by position.
    pub fn failures(&self) -> Vec<EpisodeFailure> {
        let mut failures = match self.failures.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        failures.sort_by_key(|f| f.position);
        failures
    }

    /// First failure in report order, if any.
    pub fn first(&self) -> Option<EpisodeFailure> {
        match self.failures.lock() {
            Ok(guard) => guard.first().cloned(),
            Err(poisoned) => poisoned.into_inner().first().cloned(),
        }
    }
}

impl ErrorReporter for FailureLog {
    fn report(&self, station: &str, error: &StationError) {
        let failure = EpisodeFailure {
            position: error.position(),
            station: station.to_string(),
            message: error.message().to_string(),
        };
        match self.failures.lock() {
            Ok(mut guard) => guard.push(failure),
            Err(poisoned) => poisoned.into_inner().push(failure),
        }
        self.inner.report(station, error);
    }
}
