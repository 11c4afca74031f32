//! Timer state machine
//!
//! A [`Timer`] owns at most one scheduler registration at a time. Every
//! operation runs under a single lock, so actions from one logical event
//! (`Completed` then `Idle`, for instance) are published back to back and in
//! order.
//!
//! ```text
//! Idle -> Running -> (Paused -> Running)* -> Idle | Stopped
//! ```
//!
//! Elapsed time is what the timer tracks: `time_remaining` reports time since
//! the run began, and a pause remembers the elapsed time, which `resume` then
//! uses as the length of the next run.

use std::{
    fmt,
    sync::{Arc, Mutex, MutexGuard, PoisonError, Weak},
    time::Duration,
};
use futures::stream::{self, Stream};
use tokio::{
    sync::{
        broadcast::{self, error::RecvError},
        watch,
    },
    time::Instant,
};
use tracing::{debug, trace, warn};

use super::{
    action::{round_to_millis, TimerAction, TimerStatus},
    scheduler::{Scheduler, TickHandle, TokioScheduler},
};
use crate::error::TimerError;

/// Default buffer size of the action and completion feeds
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Shortest run a resume will arm; a pause taken at zero elapsed time would
/// otherwise ask the scheduler for a zero period.
pub const MIN_RESUME_PERIOD: Duration = Duration::from_millis(1);

/// Single-event listener invoked on every completion tick
///
/// The timer only keeps a weak reference, so registering a delegate never
/// extends its lifetime.
pub trait TimerDelegate: Send + Sync {
    fn timer_completed(&self, status: &TimerStatus);
}

/// Builder for [`Timer`]
pub struct TimerBuilder {
    duration: Duration,
    repeats: bool,
    autostart: bool,
    delegate: Option<Weak<dyn TimerDelegate>>,
    scheduler: Option<Arc<dyn Scheduler>>,
    channel_capacity: usize,
}

impl TimerBuilder {
    fn new(duration: Duration) -> Self {
        Self {
            duration,
            repeats: false,
            autostart: true,
            delegate: None,
            scheduler: None,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }

    /// Re-run the timer every `duration` instead of going idle after one run
    pub fn repeats(mut self, repeats: bool) -> Self {
        self.repeats = repeats;
        self
    }

    /// Start the first run as part of `build`
    pub fn autostart(mut self, autostart: bool) -> Self {
        self.autostart = autostart;
        self
    }

    pub fn delegate<D: TimerDelegate + 'static>(mut self, delegate: &Arc<D>) -> Self {
        let weak = Arc::downgrade(delegate) as Weak<dyn TimerDelegate>;
        self.delegate = Some(weak);
        self
    }

    /// Drive ticks from a custom scheduler instead of the tokio runtime
    pub fn scheduler(mut self, scheduler: Arc<dyn Scheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    pub fn build(self) -> Result<Timer, TimerError> {
        if self.duration.is_zero() {
            return Err(TimerError::ZeroDuration);
        }

        let scheduler = match self.scheduler {
            Some(scheduler) => scheduler,
            None => Arc::new(TokioScheduler::current()?),
        };

        let capacity = self.channel_capacity.max(1);
        let (actions, _) = broadcast::channel(capacity);
        let (completions, _) = broadcast::channel(capacity);
        let (state, _) = watch::channel(TimerAction::Idle);

        let timer = Timer {
            shared: Arc::new(Shared {
                core: Mutex::new(TimerCore {
                    duration: self.duration,
                    repeats: self.repeats,
                    started_at: None,
                    paused_remaining: None,
                    active: None,
                    generation: 0,
                    action: TimerAction::Idle,
                    channels: Some(Channels {
                        actions,
                        completions,
                        state,
                    }),
                }),
                scheduler,
                delegate: Mutex::new(self.delegate),
            }),
        };

        debug!(
            "Created timer: duration={:?}, repeats={}, autostart={}",
            self.duration, self.repeats, self.autostart
        );

        if self.autostart {
            timer.start();
        }

        Ok(timer)
    }
}

/// A pausable interval timer that publishes its lifecycle
///
/// Dropping the timer cancels any outstanding tick and closes every feed
/// without publishing further actions.
pub struct Timer {
    shared: Arc<Shared>,
}

struct Shared {
    core: Mutex<TimerCore>,
    scheduler: Arc<dyn Scheduler>,
    delegate: Mutex<Option<Weak<dyn TimerDelegate>>>,
}

struct TimerCore {
    duration: Duration,
    repeats: bool,
    started_at: Option<Instant>,
    paused_remaining: Option<Duration>,
    active: Option<ActiveRun>,
    /// Bumped on every arm so stale ticks can be told apart
    generation: u64,
    action: TimerAction,
    /// `None` once stopped or dropped
    channels: Option<Channels>,
}

struct ActiveRun {
    generation: u64,
    _handle: TickHandle,
}

struct Channels {
    actions: broadcast::Sender<TimerAction>,
    completions: broadcast::Sender<()>,
    state: watch::Sender<TimerAction>,
}

impl Timer {
    /// Create a one-shot timer that starts immediately on the current tokio runtime
    pub fn new(duration: Duration) -> Result<Self, TimerError> {
        Self::builder(duration).build()
    }

    pub fn builder(duration: Duration) -> TimerBuilder {
        TimerBuilder::new(duration)
    }

    /// Start a run of the configured duration, discarding any run in progress.
    pub fn start(&self) {
        let mut core = self.shared.lock_core();
        if core.is_stopped() {
            debug!("Ignoring start on a stopped timer");
            return;
        }
        Shared::arm(&self.shared, &mut core);
    }

    /// Stop the timer for good and close every feed.
    pub fn stop(&self) {
        let mut core = self.shared.lock_core();
        if core.is_stopped() {
            return;
        }

        core.cancel();
        core.emit(TimerAction::Stop);
        core.channels = None;
        debug!("Timer stopped, feeds closed");
    }

    /// Pause the active run, remembering how long it had been running.
    pub fn pause(&self) {
        let mut core = self.shared.lock_core();
        if core.active.is_none() {
            return;
        }

        let elapsed = core
            .started_at
            .map(|started_at| started_at.elapsed())
            .unwrap_or_default();
        core.cancel();
        core.paused_remaining = Some(elapsed);
        core.emit(TimerAction::Pause(elapsed));
    }

    /// Start a new run whose length is the elapsed time remembered by `pause`.
    pub fn resume(&self) {
        let mut core = self.shared.lock_core();
        let Some(paused) = core.paused_remaining.take() else {
            return;
        };

        core.duration = paused.max(MIN_RESUME_PERIOD);
        debug!("Resuming with duration {:?}", core.duration);
        Shared::arm(&self.shared, &mut core);
    }

    pub fn is_running(&self) -> bool {
        self.shared.lock_core().active.is_some()
    }

    pub fn is_paused(&self) -> bool {
        self.shared.lock_core().paused_remaining.is_some()
    }

    pub fn is_stopped(&self) -> bool {
        self.shared.lock_core().is_stopped()
    }

    /// Time elapsed since the active run began, rounded to milliseconds.
    ///
    /// `None` unless a run is active.
    pub fn time_remaining(&self) -> Option<Duration> {
        self.shared.lock_core().time_remaining()
    }

    /// Length of the current run; updated by `resume`
    pub fn duration(&self) -> Duration {
        self.shared.lock_core().duration
    }

    pub fn repeats(&self) -> bool {
        self.shared.lock_core().repeats
    }

    /// Most recently published action
    pub fn action(&self) -> TimerAction {
        self.shared.lock_core().action
    }

    pub fn status(&self) -> TimerStatus {
        self.shared.lock_core().status()
    }

    /// Receive every action in publication order.
    ///
    /// A one-shot completion publishes `Completed` then `Idle`. A repeating
    /// timer publishes `Completed` then `Start` on every cycle, since the next
    /// run begins at that tick.
    ///
    /// The receiver reports `Closed` once the timer is stopped or dropped; a
    /// receiver created after that point is closed from the start.
    pub fn subscribe(&self) -> broadcast::Receiver<TimerAction> {
        match &self.shared.lock_core().channels {
            Some(channels) => channels.actions.subscribe(),
            None => broadcast::channel(1).1,
        }
    }

    /// Every action as a stream that ends when the timer is stopped or dropped
    pub fn actions(&self) -> impl Stream<Item = TimerAction> + Send + 'static {
        stream::unfold(self.subscribe(), |mut rx| async move {
            loop {
                match rx.recv().await {
                    Ok(action) => return Some((action, rx)),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Action stream lagged, skipped {} actions", skipped);
                    }
                    Err(RecvError::Closed) => return None,
                }
            }
        })
    }

    /// Latest-value view of the published action
    ///
    /// New receivers see the current action immediately. Intermediate
    /// actions of a single tick may be coalesced.
    pub fn watch(&self) -> watch::Receiver<TimerAction> {
        let core = self.shared.lock_core();
        match &core.channels {
            Some(channels) => channels.state.subscribe(),
            None => watch::channel(core.action).1,
        }
    }

    /// Receive one `()` per completion tick
    pub fn subscribe_completions(&self) -> broadcast::Receiver<()> {
        match &self.shared.lock_core().channels {
            Some(channels) => channels.completions.subscribe(),
            None => broadcast::channel(1).1,
        }
    }

    pub fn set_delegate<D: TimerDelegate + 'static>(&self, delegate: &Arc<D>) {
        let weak = Arc::downgrade(delegate) as Weak<dyn TimerDelegate>;
        *self.shared.lock_delegate() = Some(weak);
    }

    pub fn clear_delegate(&self) {
        *self.shared.lock_delegate() = None;
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        let mut core = self.shared.lock_core();
        core.cancel();
        core.channels = None;
        trace!("Timer released");
    }
}

impl fmt::Debug for Timer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = self.status();
        f.debug_struct("Timer")
            .field("action", &status.action)
            .field("duration", &status.duration)
            .field("repeats", &status.repeats)
            .field("is_running", &status.is_running)
            .field("is_paused", &status.is_paused)
            .finish_non_exhaustive()
    }
}

impl Shared {
    fn lock_core(&self) -> MutexGuard<'_, TimerCore> {
        self.core.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_delegate(&self) -> MutexGuard<'_, Option<Weak<dyn TimerDelegate>>> {
        self.delegate.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace any registration with a fresh one for `core.duration`.
    fn arm(shared: &Arc<Shared>, core: &mut TimerCore) {
        core.cancel();
        core.generation = core.generation.wrapping_add(1);
        let generation = core.generation;

        let weak = Arc::downgrade(shared);
        let handle = shared.scheduler.schedule_repeating(
            core.duration,
            Box::new(move || {
                if let Some(shared) = weak.upgrade() {
                    Shared::handle_tick(&shared, generation);
                }
            }),
        );

        core.active = Some(ActiveRun {
            generation,
            _handle: handle,
        });
        core.started_at = Some(Instant::now());
        core.emit(TimerAction::Start);
    }

    fn handle_tick(shared: &Arc<Shared>, generation: u64) {
        let status = {
            let mut core = shared.lock_core();
            if core.active.as_ref().map(|run| run.generation) != Some(generation) {
                trace!("Dropping stale tick from generation {}", generation);
                return;
            }

            if core.repeats {
                core.emit(TimerAction::Completed);
                core.started_at = Some(Instant::now());
                core.emit(TimerAction::Start);
            } else {
                core.cancel();
                core.emit(TimerAction::Completed);
                core.emit(TimerAction::Idle);
            }

            if let Some(channels) = &core.channels {
                let _ = channels.completions.send(());
            }
            core.status()
        };

        // Outside the lock so the delegate may call back into the timer
        let delegate = shared.lock_delegate().as_ref().and_then(Weak::upgrade);
        if let Some(delegate) = delegate {
            delegate.timer_completed(&status);
        }
    }
}

impl TimerCore {
    fn is_stopped(&self) -> bool {
        self.channels.is_none()
    }

    /// Release the registration and clear run bookkeeping.
    fn cancel(&mut self) {
        if let Some(run) = self.active.take() {
            trace!("Cancelling tick registration {}", run.generation);
        }
        self.started_at = None;
        self.paused_remaining = None;
    }

    fn emit(&mut self, action: TimerAction) {
        debug!("Timer action: {}", action);
        self.action = action;

        if let Some(channels) = &self.channels {
            channels.state.send_replace(action);
            if channels.actions.send(action).is_err() {
                trace!("No subscribers for action {}", action);
            }
        }
    }

    fn time_remaining(&self) -> Option<Duration> {
        self.active.as_ref()?;
        self.started_at
            .map(|started_at| round_to_millis(started_at.elapsed()))
    }

    fn status(&self) -> TimerStatus {
        TimerStatus {
            action: self.action,
            duration: self.duration,
            repeats: self.repeats,
            is_running: self.active.is_some(),
            is_paused: self.paused_remaining.is_some(),
            time_remaining: self.time_remaining(),
        }
    }
}
