//! Completion tracking delegate

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Mutex, PoisonError,
};
use chrono::{DateTime, Utc};
use tracing::info;

use crate::timer::{TimerDelegate, TimerStatus};

/// Counts completion ticks and remembers when the last one happened
#[derive(Debug, Default)]
pub struct CompletionCounter {
    count: AtomicU64,
    last_completed_at: Mutex<Option<DateTime<Utc>>>,
}

impl CompletionCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of completions observed so far
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::SeqCst)
    }

    pub fn last_completed_at(&self) -> Option<DateTime<Utc>> {
        *self
            .last_completed_at
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl TimerDelegate for CompletionCounter {
    fn timer_completed(&self, status: &TimerStatus) {
        let count = self.count.fetch_add(1, Ordering::SeqCst) + 1;
        *self
            .last_completed_at
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(Utc::now());
        info!(
            "Timer completed (#{}), {}",
            count,
            if status.is_running { "next cycle armed" } else { "now idle" }
        );
    }
}
