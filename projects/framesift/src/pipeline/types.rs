use crate::error::{MediaError, MediaResult};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Deadline and cancel flag for one request.
///
/// Clones share the cancel flag, so a handle kept by the caller can stop
/// work running on other threads. The producer and every worker call
/// [`JobControl::check`] between items.
#[derive(Debug, Clone)]
pub struct JobControl {
    cancelled: Arc<AtomicBool>,
    deadline: Option<(Instant, Duration)>,
}

impl JobControl {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            deadline: timeout.map(|t| (Instant::now() + t, t)),
        }
    }

    pub fn unbounded() -> Self {
        Self::new(None)
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    pub fn check(&self) -> MediaResult<()> {
        if self.is_cancelled() {
            return Err(MediaError::Cancelled);
        }
        if let Some((deadline, budget)) = self.deadline {
            if Instant::now() >= deadline {
                return Err(MediaError::TimedOut(budget));
            }
        }
        Ok(())
    }
}

impl Default for JobControl {
    fn default() -> Self {
        Self::unbounded()
    }
}
