//! Run exclusivity and cooperative cancellation.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::{SensorError, Stage};

/// Shared "a run is in progress" flag.
///
/// Clones observe the same flag, so pipelines sharing one status cannot run
/// concurrently.
#[derive(Debug, Clone, Default)]
pub struct PipelineStatus {
    running: Arc<AtomicBool>,
}

impl PipelineStatus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Marks a run as started.
    ///
    /// # Errors
    ///
    /// Returns [`SensorError::PipelineAlreadyRunning`] if a run holds the flag.
    pub fn try_start(&self) -> Result<RunGuard, SensorError> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| SensorError::PipelineAlreadyRunning)?;

        Ok(RunGuard {
            running: Arc::clone(&self.running),
        })
    }
}

/// Clears the running flag when dropped, whether the run succeeded, failed
/// or panicked.
#[derive(Debug)]
pub struct RunGuard {
    running: Arc<AtomicBool>,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
    }
}

/// Cancellation signal checked between stages.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Fails with [`SensorError::Cancelled`] if cancellation was requested.
    ///
    /// # Errors
    ///
    /// See above.
    pub fn check(&self, stage: Stage) -> Result<(), SensorError> {
        if self.is_cancelled() {
            return Err(SensorError::Cancelled { stage });
        }
        Ok(())
    }
}
