//! Single-flight guard for long-running operations.
//!
//! Optimization, validation and training each allow one pass in flight.
//! A second caller is rejected immediately with
//! [`TuningError::ConcurrentOperation`]; nothing is queued.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{TuningError, TuningResult};

/// Busy flag for one kind of operation.
#[derive(Debug)]
pub struct BusyFlag {
    operation: &'static str,
    busy: AtomicBool,
}

impl BusyFlag {
    pub const fn new(operation: &'static str) -> Self {
        Self {
            operation,
            busy: AtomicBool::new(false),
        }
    }

    /// Claim the flag, failing fast if it is already held.
    pub fn try_acquire(&self) -> TuningResult<BusyPermit<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| BusyPermit { flag: self })
            .map_err(|_| TuningError::ConcurrentOperation {
                operation: self.operation,
            })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub fn operation(&self) -> &'static str {
        self.operation
    }
}

/// Held while an operation runs. Releases the flag when dropped.
#[derive(Debug)]
pub struct BusyPermit<'a> {
    flag: &'a BusyFlag,
}

impl Drop for BusyPermit<'_> {
    fn drop(&mut self) {
        self.flag.busy.store(false, Ordering::Release);
    }
}
