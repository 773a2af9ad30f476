//! Batch scheduler for concurrency control.
//!
//! Bounds how many batches are fetched, chunked and stored at the same time
//! across every invocation served by one handler.

use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::error::AppError;

// ─────────────────────────────────────────────────────────────────────────────
// BatchScheduler
// ─────────────────────────────────────────────────────────────────────────────

/// Scheduler that limits the number of batches in flight.
///
/// One invocation never holds more permits than its buffered stream allows;
/// the semaphore is what bounds batches when several invocations share a
/// handler. Permits are released when dropped, so a batch that fails or is cancelled
/// always frees its slot.
#[derive(Clone)]
pub struct BatchScheduler {
    sem: Arc<Semaphore>,
    max: usize,
}

impl BatchScheduler {
    /// Creates a scheduler allowing `max_concurrent` batches at once.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `max_concurrent` is 0.
    pub fn new(max_concurrent: usize) -> Result<Self, AppError> {
        if max_concurrent == 0 {
            return Err(AppError::Config(
                "max_concurrent_batches must be greater than 0".into(),
            ));
        }

        Ok(Self {
            sem: Arc::new(Semaphore::new(max_concurrent)),
            max: max_concurrent,
        })
    }

    /// Acquires a permit, waiting if all slots are currently in use.
    pub async fn acquire(&self) -> Result<BatchPermit, AppError> {
        let permit = self
            .sem
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| AppError::Internal(format!("Batch scheduler closed: {}", e)))?;

        Ok(BatchPermit {
            _permit: permit,
            max: self.max,
            sem: self.sem.clone(),
        })
    }

    /// Returns the number of batches currently in flight.
    pub fn active_batches(&self) -> usize {
        self.max - self.sem.available_permits()
    }

    /// Returns the maximum number of batches in flight.
    pub fn max_batches(&self) -> usize {
        self.max
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// BatchPermit
// ─────────────────────────────────────────────────────────────────────────────

/// A slot held by one in-flight batch; released on drop.
pub struct BatchPermit {
    _permit: OwnedSemaphorePermit,
    max: usize,
    sem: Arc<Semaphore>,
}

impl BatchPermit {
    /// Returns the number of batches in flight (including this one).
    pub fn active_batches(&self) -> usize {
        self.max - self.sem.available_permits()
    }
}
