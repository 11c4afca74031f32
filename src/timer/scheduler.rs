//! Periodic schedulers that drive timer ticks
//!
//! A [`Scheduler`] invokes a callback every `period`, first firing one full
//! `period` after registration. Registrations are released through the
//! returned [`TickHandle`], either explicitly or when it is dropped.

use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, PoisonError,
    },
    time::Duration,
};
use tokio::{
    runtime::Handle,
    time::{interval_at, Instant, MissedTickBehavior},
};
use tracing::{debug, trace};

use crate::error::TimerError;

/// Deadline used for periods that overflow the clock, roughly thirty years
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Callback invoked on every tick
pub type TickFn = Box<dyn FnMut() + Send + 'static>;

/// A source of periodic callbacks
pub trait Scheduler: Send + Sync {
    /// Invoke `tick` every `period`, starting one `period` from now.
    fn schedule_repeating(&self, period: Duration, tick: TickFn) -> TickHandle;
}

/// Cancellation handle for a scheduled registration
///
/// Dropping the handle cancels the registration.
pub struct TickHandle {
    cancel: Option<Box<dyn FnOnce() + Send + 'static>>,
}

impl TickHandle {
    /// Wrap a cancellation routine
    pub fn new<F>(cancel: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Cancel the registration now
    pub fn cancel(mut self) {
        self.run_cancel();
    }

    fn run_cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for TickHandle {
    fn drop(&mut self) {
        self.run_cancel();
    }
}

impl fmt::Debug for TickHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TickHandle")
            .field("armed", &self.cancel.is_some())
            .finish()
    }
}

/// Scheduler backed by tokio interval tasks
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    runtime: Handle,
}

impl TokioScheduler {
    /// Bind to the runtime the caller is running in
    pub fn current() -> Result<Self, TimerError> {
        Handle::try_current()
            .map(Self::with_handle)
            .map_err(|_| TimerError::NoRuntime)
    }

    /// Bind to an explicit runtime handle
    pub fn with_handle(runtime: Handle) -> Self {
        Self { runtime }
    }
}

impl Scheduler for TokioScheduler {
    fn schedule_repeating(&self, period: Duration, mut tick: TickFn) -> TickHandle {
        debug!("Scheduling repeating tick every {:?}", period);

        // Periods too long to represent never fire
        let now = Instant::now();
        let first = now.checked_add(period).unwrap_or_else(|| now + FAR_FUTURE);
        let task = self.runtime.spawn(async move {
            let mut interval = interval_at(first, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                interval.tick().await;
                trace!("Interval elapsed, delivering tick");
                tick();
            }
        });

        TickHandle::new(move || task.abort())
    }
}

struct Registration {
    period: Duration,
    cancelled: Arc<AtomicBool>,
    tick: Arc<Mutex<TickFn>>,
}

/// Scheduler that only ticks when told to
///
/// Useful for driving a timer deterministically from tests.
#[derive(Clone, Default)]
pub struct ManualScheduler {
    registrations: Arc<Mutex<Vec<Registration>>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver one tick to every live registration, returning how many fired.
    ///
    /// Callbacks run without the scheduler lock held, so they may register
    /// or cancel while being invoked.
    pub fn fire(&self) -> usize {
        let due: Vec<(Arc<AtomicBool>, Arc<Mutex<TickFn>>)> = {
            let mut registrations = self
                .registrations
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            registrations.retain(|r| !r.cancelled.load(Ordering::SeqCst));
            registrations
                .iter()
                .map(|r| (Arc::clone(&r.cancelled), Arc::clone(&r.tick)))
                .collect()
        };

        let mut fired = 0;
        for (cancelled, tick) in due {
            // An earlier callback in this round may have cancelled this one
            if cancelled.load(Ordering::SeqCst) {
                continue;
            }
            let mut tick = tick.lock().unwrap_or_else(PoisonError::into_inner);
            (*tick)();
            fired += 1;
        }
        fired
    }

    /// Number of registrations that have not been cancelled
    pub fn live(&self) -> usize {
        self.registrations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|r| !r.cancelled.load(Ordering::SeqCst))
            .count()
    }

    /// Periods of the live registrations, oldest first
    pub fn periods(&self) -> Vec<Duration> {
        self.registrations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|r| !r.cancelled.load(Ordering::SeqCst))
            .map(|r| r.period)
            .collect()
    }
}

impl Scheduler for ManualScheduler {
    fn schedule_repeating(&self, period: Duration, tick: TickFn) -> TickHandle {
        let cancelled = Arc::new(AtomicBool::new(false));
        self.registrations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Registration {
                period,
                cancelled: Arc::clone(&cancelled),
                tick: Arc::new(Mutex::new(tick)),
            });

        TickHandle::new(move || cancelled.store(true, Ordering::SeqCst))
    }
}

impl fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualScheduler")
            .field("live", &self.live())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counter() -> (Arc<AtomicUsize>, TickFn) {
        let count = Arc::new(AtomicUsize::new(0));
        let inner = Arc::clone(&count);
        let tick: TickFn = Box::new(move || {
            inner.fetch_add(1, Ordering::SeqCst);
        });
        (count, tick)
    }

    #[test]
    fn manual_fire_reaches_live_registrations() {
        let scheduler = ManualScheduler::new();
        let (count, tick) = counter();
        let _handle = scheduler.schedule_repeating(Duration::from_secs(1), tick);

        assert_eq!(scheduler.fire(), 1);
        assert_eq!(scheduler.fire(), 1);
        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert_eq!(scheduler.periods(), vec![Duration::from_secs(1)]);
    }

    #[test]
    fn dropping_handle_cancels_registration() {
        let scheduler = ManualScheduler::new();
        let (count, tick) = counter();
        let handle = scheduler.schedule_repeating(Duration::from_secs(1), tick);
        assert_eq!(scheduler.live(), 1);

        drop(handle);
        assert_eq!(scheduler.live(), 0);
        assert_eq!(scheduler.fire(), 0);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn explicit_cancel_is_equivalent_to_drop() {
        let scheduler = ManualScheduler::new();
        let (_count, tick) = counter();
        scheduler
            .schedule_repeating(Duration::from_millis(10), tick)
            .cancel();
        assert_eq!(scheduler.live(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn tokio_scheduler_first_fires_after_one_period() {
        let scheduler = TokioScheduler::current().unwrap();
        let (count, tick) = counter();
        let start = Instant::now();
        let _handle = scheduler.schedule_repeating(Duration::from_millis(500), tick);

        tokio::time::sleep(Duration::from_millis(499)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        tokio::time::sleep_until(start + Duration::from_millis(1_600)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn tokio_scheduler_stops_after_cancel() {
        let scheduler = TokioScheduler::current().unwrap();
        let (count, tick) = counter();
        let handle = scheduler.schedule_repeating(Duration::from_millis(100), tick);

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        handle.cancel();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn tokio_scheduler_accepts_unrepresentable_period() {
        let scheduler = TokioScheduler::current().unwrap();
        let (count, tick) = counter();
        let handle = scheduler.schedule_repeating(Duration::MAX, tick);

        tokio::time::sleep(Duration::from_secs(86_400)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
        handle.cancel();
    }

    #[test]
    fn tokio_scheduler_requires_runtime() {
        assert_eq!(TokioScheduler::current().unwrap_err(), TimerError::NoRuntime);
    }
}
