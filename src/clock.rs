//! Per-color countdown clock for timed matches.
//!
//! The clock only tracks time. When a color runs out it stops itself and
//! publishes that color on the [`Clock::expired`] channel; deciding what a
//! flag fall means for the game is left to the owner.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval};
use tracing::{debug, warn};

use crate::types::Color;

pub const DEFAULT_TICK: Duration = Duration::from_millis(100);
const MIN_TICK: Duration = Duration::from_millis(1);

#[derive(Debug)]
struct ClockState {
    remaining: [Duration; 2],
    running: Option<Color>,
    last_tick: Instant,
}

impl ClockState {
    /// Charges the time since the last settlement to the running color.
    /// Returns the color that just ran out, if any.
    fn settle(&mut self, now: Instant) -> Option<Color> {
        let elapsed = now.saturating_duration_since(self.last_tick);
        self.last_tick = now;

        let color = self.running?;
        let left = &mut self.remaining[color.index()];
        *left = left.saturating_sub(elapsed);
        if left.is_zero() {
            self.running = None;
            return Some(color);
        }
        None
    }

    fn live_remaining(&self, color: Color, now: Instant) -> Duration {
        let stored = self.remaining[color.index()];
        if self.running == Some(color) {
            stored.saturating_sub(now.saturating_duration_since(self.last_tick))
        } else {
            stored
        }
    }
}

#[derive(Debug)]
struct Shared {
    state: Mutex<ClockState>,
    expired: watch::Sender<Option<Color>>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, ClockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// One loop iteration. Returns `true` once a color has run out.
    fn tick(&self) -> bool {
        let flagged = self.lock().settle(Instant::now());
        if let Some(color) = flagged {
            self.flag(color);
        }
        self.expired.borrow().is_some()
    }

    fn flag(&self, color: Color) {
        debug!(%color, "clock ran out");
        self.expired.send_replace(Some(color));
    }
}

/// Two countdowns of which at most one runs at a time.
#[derive(Debug)]
pub struct Clock {
    shared: Arc<Shared>,
    tick: Duration,
    shutdown: Option<watch::Sender<bool>>,
    handle: Option<JoinHandle<()>>,
}

impl Clock {
    /// Creates a stopped clock giving each color `initial`.
    pub fn new(initial: Duration) -> Self {
        Self::with_tick(initial, DEFAULT_TICK)
    }

    /// Like [`Clock::new`] with a custom tick. Ticks shorter than a
    /// millisecond are raised to one.
    pub fn with_tick(initial: Duration, tick: Duration) -> Self {
        let tick = tick.max(MIN_TICK);
        let (expired, _) = watch::channel(None);
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(ClockState {
                    remaining: [initial; 2],
                    running: None,
                    last_tick: Instant::now(),
                }),
                expired,
            }),
            tick,
            shutdown: None,
            handle: None,
        }
    }

    /// Spawns the tick loop on the current tokio runtime. Calling it again
    /// while the loop runs does nothing.
    pub fn start(&mut self) {
        if self.handle.is_some() {
            return;
        }

        self.shared.lock().last_tick = Instant::now();

        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let shared = Arc::clone(&self.shared);
        let tick = self.tick;

        let handle = tokio::spawn(async move {
            let mut ticker = interval(tick);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if shared.tick() {
                            break;
                        }
                    }
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }

            debug!("clock loop stopped");
        });

        self.shutdown = Some(shutdown_tx);
        self.handle = Some(handle);
    }

    /// Makes `color` the only running side. Time used so far by the previous
    /// side is charged before the switch. Once a color has run out the clock
    /// stays stopped.
    pub fn switch_turn(&self, color: Color) {
        if self.flagged().is_some() {
            return;
        }
        let mut state = self.shared.lock();
        if let Some(flagged) = state.settle(Instant::now()) {
            drop(state);
            self.shared.flag(flagged);
            return;
        }
        if state.remaining[color.index()].is_zero() {
            return;
        }
        state.running = Some(color);
    }

    /// Stops both countdowns without ending the loop.
    pub fn pause(&self) {
        let mut state = self.shared.lock();
        let flagged = state.settle(Instant::now());
        state.running = None;
        drop(state);

        if let Some(color) = flagged {
            self.shared.flag(color);
        }
    }

    /// Remaining time of `color` in whole seconds, rounded up.
    pub fn remaining(&self, color: Color) -> u64 {
        let left = self.shared.lock().live_remaining(color, Instant::now());
        left.as_secs() + u64::from(left.subsec_nanos() > 0)
    }

    /// The color that ran out of time, if any. Settles the in-flight
    /// interval first, so a color at zero is reported before the next tick.
    pub fn flagged(&self) -> Option<Color> {
        let flagged = self.shared.lock().settle(Instant::now());
        if let Some(color) = flagged {
            self.shared.flag(color);
        }
        *self.shared.expired.borrow()
    }

    pub fn running(&self) -> Option<Color> {
        self.shared.lock().running
    }

    pub fn is_started(&self) -> bool {
        self.handle.is_some()
    }

    /// Subscribes to flag falls. The value turns `Some(color)` once that
    /// color has no time left.
    pub fn expired(&self) -> watch::Receiver<Option<Color>> {
        self.shared.expired.subscribe()
    }

    /// Halts the tick loop, waits for it to finish and clears the running
    /// side. Safe to call more than once.
    pub async fn stop(&mut self) {
        self.pause();

        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(true);
        }
        if let Some(handle) = self.handle.take()
            && let Err(e) = handle.await
            && !e.is_cancelled()
        {
            warn!(error = %e, "clock loop panicked");
        }
    }
}

impl Drop for Clock {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
