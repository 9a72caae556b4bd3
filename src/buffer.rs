//! Bounded FIFO of decoded spectral rows.
//!
//! The transport-driven producer and the fixed-cadence render consumer run on
//! independent schedules and share only this buffer. Both sides go through a
//! mutex so neither ever observes a partially-mutated queue. Overflow is
//! resolved by dropping the oldest rows in one bulk operation rather than one
//! at a time; bounded loss under sustained overload is the design, not a
//! failure.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use crate::protocol::SpectralRow;

/// Length at which a push triggers the bulk drop.
pub const HARD_CAP: usize = 120;

/// Length the buffer is trimmed down to when the cap is exceeded.
pub const LOW_WATER: usize = 60;

/// Capacity-bounded queue of rows awaiting paint. Cleared on disconnect.
pub struct FrameBuffer {
    rows: Mutex<VecDeque<SpectralRow>>,
    hard_cap: usize,
    low_water: usize,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self::with_limits(HARD_CAP, LOW_WATER)
    }

    /// Caller picks the limits. `low_water` must not exceed `hard_cap`.
    pub fn with_limits(hard_cap: usize, low_water: usize) -> Self {
        assert!(low_water <= hard_cap);
        Self {
            rows: Mutex::new(VecDeque::with_capacity(hard_cap + 1)),
            hard_cap,
            low_water,
        }
    }

    /// Append a row at the tail, bulk-dropping from the head if the append
    /// pushed the length past the hard cap.
    pub fn push(&self, row: SpectralRow) {
        let mut rows = self.lock();
        rows.push_back(row);
        if rows.len() > self.hard_cap {
            let excess = rows.len() - self.low_water;
            rows.drain(..excess);
            log::debug!("frame buffer overflow, dropped {excess} oldest rows");
        }
    }

    /// Atomically remove and return every buffered row in FIFO order.
    pub fn drain_all(&self) -> Vec<SpectralRow> {
        self.lock().drain(..).collect()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<SpectralRow>> {
        self.rows.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}
