//! Live daisy counters shared by the life-cycle workers.

use daisy_core::DaisyColor;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::warn;

/// Per-colour population counters, safe to update from many workers at once
#[derive(Debug, Default)]
pub struct PopulationLedger {
    black: AtomicUsize,
    white: AtomicUsize,
}

impl PopulationLedger {
    pub fn new(black: usize, white: usize) -> Self {
        Self {
            black: AtomicUsize::new(black),
            white: AtomicUsize::new(white),
        }
    }

    fn counter(&self, color: DaisyColor) -> &AtomicUsize {
        match color {
            DaisyColor::Black => &self.black,
            DaisyColor::White => &self.white,
        }
    }

    pub fn record_birth(&self, color: DaisyColor) {
        self.counter(color).fetch_add(1, Ordering::AcqRel);
    }

    /// Decrement the colour's counter; never wraps below zero
    pub fn record_death(&self, color: DaisyColor) {
        let result = self
            .counter(color)
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
        if result.is_err() {
            warn!(color = %color, "Death recorded for a colour with no live daisies");
        }
    }

    pub fn count(&self, color: DaisyColor) -> usize {
        self.counter(color).load(Ordering::Acquire)
    }

    pub fn black(&self) -> usize {
        self.count(DaisyColor::Black)
    }

    pub fn white(&self) -> usize {
        self.count(DaisyColor::White)
    }

    pub fn total(&self) -> usize {
        self.black() + self.white()
    }
}
