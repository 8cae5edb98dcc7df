//! Timer engine
//!
//! Owns the process-wide `TimerState` behind a single mutex and drives it
//! with at most one background ticker task.
//!
//! ## Locking
//!
//! The mutex is not reentrant. Public methods take it exactly once and never
//! call each other while holding it, and no `.await` happens inside a
//! critical section. The ticker's expiry transition runs in the same
//! critical section as the decrement that caused it.
//!
//! ## Ticker lifecycle
//!
//! ```text
//! start() --spawn--> [sleep tick_interval] --lock--> tick --unlock--> [sleep] ...
//!                          |                   |
//!             stop() cancel signal     stale generation / !running -> exit
//! ```
//!
//! Every `start()` bumps a generation counter. A ticker only mutates state
//! while its generation is current and the timer is running, so a ticker left
//! over from a quick stop/start never ticks alongside its replacement.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{DurationUpdate, Durations, Phase, TimerSnapshot, TimerState};

/// Default time between two ticks
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Handle to the live background ticker
struct Ticker {
    handle: JoinHandle<()>,
    cancel: oneshot::Sender<()>,
}

impl Ticker {
    /// Ask the ticker to leave its sleep and exit
    fn cancel(self) -> JoinHandle<()> {
        // Ignore error if the ticker already exited
        let _ = self.cancel.send(());
        self.handle
    }
}

/// Everything guarded by the engine lock
struct Inner {
    state: TimerState,
    /// Bumped on every start; identifies the ticker allowed to mutate state
    generation: u64,
    ticker: Option<Ticker>,
}

struct Shared {
    inner: Mutex<Inner>,
    tick_interval: Duration,
    /// Keep counting down into the next phase when a phase expires
    auto_continue: bool,
}

/// Shared handle to the interval timer
///
/// Cloning is cheap; all clones drive the same timer.
#[derive(Clone)]
pub struct TimerEngine {
    shared: Arc<Shared>,
}

impl Default for TimerEngine {
    fn default() -> Self {
        Self::new(Durations::default())
    }
}

impl std::fmt::Debug for TimerEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("TimerEngine")
            .field("state", &inner.state)
            .field("generation", &inner.generation)
            .field("ticker_alive", &inner.ticker.is_some())
            .field("tick_interval", &self.shared.tick_interval)
            .field("auto_continue", &self.shared.auto_continue)
            .finish()
    }
}

impl TimerEngine {
    /// Create a stopped timer at the start of a work phase
    pub fn new(durations: Durations) -> Self {
        Self::with_options(durations, DEFAULT_TICK_INTERVAL, false)
    }

    /// Create a timer with a custom tick interval and expiry behaviour
    ///
    /// With `auto_continue` off, the ticker stops after a phase expires and
    /// the timer waits at the start of the next phase for another `start()`.
    pub fn with_options(durations: Durations, tick_interval: Duration, auto_continue: bool) -> Self {
        Self {
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner {
                    state: TimerState::new(durations),
                    generation: 0,
                    ticker: None,
                }),
                tick_interval,
                auto_continue,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // Every critical section leaves the state consistent, so a panic
        // elsewhere does not invalidate it
        self.shared
            .inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// Get a consistent snapshot of the timer
    pub fn snapshot(&self) -> TimerSnapshot {
        self.lock().state.snapshot()
    }

    pub fn is_running(&self) -> bool {
        self.lock().state.is_running()
    }

    pub fn phase(&self) -> Phase {
        self.lock().state.phase()
    }

    pub fn durations(&self) -> Durations {
        self.lock().state.durations()
    }

    pub fn short_break_count(&self) -> u32 {
        self.lock().state.short_break_count()
    }

    pub fn remaining_seconds(&self) -> u64 {
        self.lock().state.remaining_seconds()
    }

    /// Configured length of the current phase in minutes
    pub fn current_duration_minutes(&self) -> u32 {
        self.lock().state.current_duration_minutes()
    }

    /// Whether a ticker task is registered
    pub fn has_ticker(&self) -> bool {
        self.lock().ticker.is_some()
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start counting down
    ///
    /// Does nothing if the timer is already running. Must be called from
    /// within a Tokio runtime.
    pub fn start(&self) {
        let mut inner = self.lock();
        self.start_locked(&mut inner);
    }

    /// Stop if running, start otherwise, as one atomic step
    ///
    /// Returns whether the timer is running afterwards.
    pub fn toggle(&self) -> bool {
        let handle = {
            let mut inner = self.lock();
            if inner.state.is_running() {
                Self::halt_locked(&mut inner)
            } else {
                self.start_locked(&mut inner);
                return true;
            }
        };
        drop(handle);
        false
    }

    fn start_locked(&self, inner: &mut Inner) {
        if inner.state.is_running() {
            return;
        }

        inner.state.set_running(true);
        inner.generation += 1;
        let generation = inner.generation;

        let (cancel, cancelled) = oneshot::channel();
        let handle = tokio::spawn(run_ticker(self.clone(), generation, cancelled));
        inner.ticker = Some(Ticker { handle, cancel });

        info!(
            phase = inner.state.phase().as_str(),
            remaining = inner.state.remaining_seconds(),
            generation,
            "Timer started"
        );
    }

    /// Stop counting down
    ///
    /// The ticker is woken and exits on its own; use `stop_and_join` to wait
    /// for it.
    pub fn stop(&self) {
        // Dropping the handle detaches the task
        let _ = self.halt();
    }

    /// Stop counting down and wait until the ticker task has exited
    pub async fn stop_and_join(&self) {
        if let Some(handle) = self.halt() {
            if let Err(e) = handle.await {
                warn!("Timer ticker ended abnormally: {}", e);
            }
        }
    }

    /// Stop the timer, waiting at most `grace` for the ticker to exit
    pub async fn shutdown(&self, grace: Duration) {
        if tokio::time::timeout(grace, self.stop_and_join())
            .await
            .is_err()
        {
            warn!("Timer ticker did not exit within {:?}", grace);
        } else {
            info!("Timer stopped");
        }
    }

    fn halt(&self) -> Option<JoinHandle<()>> {
        let mut inner = self.lock();
        Self::halt_locked(&mut inner)
    }

    fn halt_locked(inner: &mut Inner) -> Option<JoinHandle<()>> {
        if inner.state.is_running() {
            debug!(remaining = inner.state.remaining_seconds(), "Timer stopped");
        }
        inner.state.set_running(false);
        inner.ticker.take().map(Ticker::cancel)
    }

    /// Stop and rewind the countdown of the current phase
    pub fn reset_timer(&self) {
        let handle = {
            let mut inner = self.lock();
            inner.state.reset();
            inner.ticker.take().map(Ticker::cancel)
        };
        drop(handle);
        debug!("Timer reset");
    }

    /// Restore the default durations and reset the countdown
    pub fn reset_durations(&self) -> Durations {
        let (durations, handle) = {
            let mut inner = self.lock();
            inner.state.reset_durations();
            let handle = inner.ticker.take().map(Ticker::cancel);
            (inner.state.durations(), handle)
        };
        drop(handle);
        info!("Durations reset to defaults");
        durations
    }

    /// Change some phase lengths
    pub fn update_durations(&self, update: DurationUpdate) -> Durations {
        let mut inner = self.lock();
        inner.state.update_durations(update);
        let durations = inner.state.durations();
        info!(
            work = durations.work_minutes,
            short_break = durations.short_break_minutes,
            long_break = durations.long_break_minutes,
            "Durations updated"
        );
        durations
    }

    /// Move to the next phase
    pub fn next_state(&self) -> TimerSnapshot {
        let mut inner = self.lock();
        inner.state.advance();
        debug!(phase = inner.state.phase().as_str(), "Advanced phase");
        inner.state.snapshot()
    }

    /// Move to the previous phase
    pub fn prev_state(&self) -> TimerSnapshot {
        let mut inner = self.lock();
        inner.state.retreat();
        debug!(phase = inner.state.phase().as_str(), "Retreated phase");
        inner.state.snapshot()
    }

    /// Perform one tick on behalf of the ticker with the given generation
    ///
    /// Returns `false` once the ticker should exit.
    fn tick(&self, generation: u64) -> bool {
        let mut inner = self.lock();
        if inner.generation != generation || !inner.state.is_running() {
            return false;
        }

        if !inner.state.tick() {
            return true;
        }

        info!(
            phase = inner.state.phase().as_str(),
            short_breaks = inner.state.short_break_count(),
            "Phase expired"
        );

        if self.shared.auto_continue {
            return true;
        }

        inner.state.set_running(false);
        // Detach our own handle; the task finishes right after this returns
        inner.ticker = None;
        false
    }
}

/// Background ticker loop
async fn run_ticker(engine: TimerEngine, generation: u64, mut cancelled: oneshot::Receiver<()>) {
    let interval = engine.shared.tick_interval;
    loop {
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = &mut cancelled => break,
        }

        if !engine.tick(generation) {
            break;
        }
    }
    debug!(generation, "Timer ticker exited");
}

#[cfg(test)]
mod tests {
    use super::*;

    const TICK: Duration = Duration::from_secs(1);

    fn one_minute_durations() -> Durations {
        Durations {
            work_minutes: 1,
            short_break_minutes: 1,
            long_break_minutes: 2,
            break_interval: 2,
        }
    }

    /// Let spawned tasks run without moving the paused clock
    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    async fn advance_ticks(n: u32) {
        for _ in 0..n {
            tokio::time::advance(TICK).await;
            settle().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_counts_down() {
        let engine = TimerEngine::default();
        engine.start();
        assert!(engine.is_running());

        settle().await;
        advance_ticks(3).await;

        assert_eq!(engine.remaining_seconds(), 25 * 60 - 3);
        let snapshot = engine.snapshot();
        assert_eq!(snapshot.minutes, 24);
        assert_eq!(snapshot.seconds, 57);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_is_idempotent() {
        let engine = TimerEngine::default();
        engine.start();
        engine.start();
        engine.start();
        settle().await;

        advance_ticks(5).await;
        assert_eq!(engine.remaining_seconds(), 25 * 60 - 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_freezes_countdown() {
        let engine = TimerEngine::default();
        engine.start();
        settle().await;
        advance_ticks(2).await;

        engine.stop_and_join().await;
        assert!(!engine.is_running());
        assert!(!engine.has_ticker());

        advance_ticks(5).await;
        assert_eq!(engine.remaining_seconds(), 25 * 60 - 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_quick_restart_never_double_ticks() {
        let engine = TimerEngine::default();
        for _ in 0..10 {
            engine.start();
            engine.stop();
        }
        engine.start();
        settle().await;

        advance_ticks(4).await;
        assert_eq!(engine.remaining_seconds(), 25 * 60 - 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_starts_spawn_one_ticker() {
        let engine = TimerEngine::default();

        let mut handles = Vec::new();
        for _ in 0..50 {
            let engine = engine.clone();
            handles.push(tokio::spawn(async move { engine.start() }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert!(engine.is_running());
        assert!(engine.has_ticker());
        assert_eq!(engine.lock().generation, 1);

        settle().await;
        advance_ticks(3).await;
        assert_eq!(engine.remaining_seconds(), 25 * 60 - 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_starts_across_threads() {
        let engine = TimerEngine::default();

        let mut handles = Vec::new();
        for _ in 0..50 {
            let engine = engine.clone();
            handles.push(tokio::spawn(async move { engine.start() }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert!(engine.is_running());
        assert_eq!(engine.lock().generation, 1);
        engine.stop_and_join().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_expiry_advances_and_pauses() {
        let engine = TimerEngine::with_options(one_minute_durations(), TICK, false);
        engine.start();
        settle().await;

        advance_ticks(59).await;
        assert_eq!(engine.phase(), Phase::Work);
        assert_eq!(engine.remaining_seconds(), 1);

        advance_ticks(1).await;
        assert_eq!(engine.phase(), Phase::ShortBreak);
        assert_eq!(engine.remaining_seconds(), 60);
        assert!(!engine.is_running());
        assert!(!engine.has_ticker());

        advance_ticks(5).await;
        assert_eq!(engine.remaining_seconds(), 60);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expiry_into_long_break() {
        let engine = TimerEngine::with_options(one_minute_durations(), TICK, false);
        engine.next_state();
        engine.next_state();
        assert_eq!(engine.short_break_count(), 1);

        engine.start();
        settle().await;
        advance_ticks(60).await;

        assert_eq!(engine.phase(), Phase::LongBreak);
        assert_eq!(engine.short_break_count(), 0);
        assert_eq!(engine.remaining_seconds(), 120);
        assert!(!engine.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_expiry_with_auto_continue_keeps_ticking() {
        let engine = TimerEngine::with_options(one_minute_durations(), TICK, true);
        engine.start();
        settle().await;

        advance_ticks(62).await;
        assert_eq!(engine.phase(), Phase::ShortBreak);
        assert_eq!(engine.remaining_seconds(), 58);
        assert!(engine.is_running());
        assert!(engine.has_ticker());

        engine.stop_and_join().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_after_expiry() {
        let engine = TimerEngine::with_options(one_minute_durations(), TICK, false);
        engine.start();
        settle().await;
        advance_ticks(60).await;
        assert!(!engine.is_running());

        engine.start();
        settle().await;
        advance_ticks(10).await;
        assert_eq!(engine.phase(), Phase::ShortBreak);
        assert_eq!(engine.remaining_seconds(), 50);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_timer_stops_and_rewinds() {
        let engine = TimerEngine::default();
        engine.start();
        settle().await;
        advance_ticks(30).await;

        engine.reset_timer();
        let snapshot = engine.snapshot();
        assert!(!snapshot.running);
        assert_eq!(snapshot.remaining_seconds(), 25 * 60);
        assert!(!engine.has_ticker());

        advance_ticks(3).await;
        assert_eq!(engine.remaining_seconds(), 25 * 60);
    }

    #[tokio::test]
    async fn test_reset_durations_returns_defaults() {
        let engine = TimerEngine::new(one_minute_durations());
        engine.next_state();

        let durations = engine.reset_durations();
        assert_eq!(durations, Durations::default());
        assert_eq!(engine.phase(), Phase::ShortBreak);
        assert_eq!(engine.remaining_seconds(), 5 * 60);
    }

    #[tokio::test]
    async fn test_update_durations_when_stopped() {
        let engine = TimerEngine::default();
        engine.update_durations(DurationUpdate {
            work_minutes: Some(10),
            ..DurationUpdate::default()
        });

        let snapshot = engine.snapshot();
        assert_eq!(snapshot.minutes, 10);
        assert_eq!(snapshot.seconds, 0);
        assert_eq!(engine.current_duration_minutes(), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_durations_when_running() {
        let engine = TimerEngine::default();
        engine.start();
        settle().await;
        advance_ticks(1).await;

        engine.update_durations(DurationUpdate {
            work_minutes: Some(10),
            ..DurationUpdate::default()
        });
        assert_eq!(engine.remaining_seconds(), 25 * 60 - 1);
        assert_eq!(engine.durations().work_minutes, 10);

        engine.stop_and_join().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_transitions_do_not_change_running() {
        let engine = TimerEngine::default();
        engine.start();
        settle().await;

        let snapshot = engine.next_state();
        assert_eq!(snapshot.state, Phase::ShortBreak);
        assert!(snapshot.running);

        let snapshot = engine.prev_state();
        assert_eq!(snapshot.state, Phase::Work);
        assert!(snapshot.running);

        engine.stop_and_join().await;
        assert!(!engine.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_completes_within_grace() {
        let engine = TimerEngine::default();
        engine.start();
        settle().await;

        engine.shutdown(Duration::from_millis(200)).await;
        assert!(!engine.is_running());
        assert!(!engine.has_ticker());
    }

    #[tokio::test(start_paused = true)]
    async fn test_toggle_flips_running() {
        let engine = TimerEngine::default();
        assert!(engine.toggle());
        assert!(engine.is_running());
        settle().await;
        advance_ticks(2).await;

        assert!(!engine.toggle());
        assert!(!engine.is_running());
        assert!(!engine.has_ticker());

        advance_ticks(2).await;
        assert_eq!(engine.remaining_seconds(), 25 * 60 - 2);
    }

    #[tokio::test]
    async fn test_stop_when_idle_is_noop() {
        let engine = TimerEngine::default();
        engine.stop();
        engine.stop_and_join().await;
        assert!(!engine.is_running());
        assert_eq!(engine.remaining_seconds(), 25 * 60);
    }
}
