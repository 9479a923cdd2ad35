//! Bridge between the lights task and the race-timing engine.
//!
//! The timing engine runs as its own task. It publishes its race state
//! through a lock-free cell the lights task polls every tick, and receives
//! the begin-timing handoff through a signal raised in the same tick the go
//! light turns on.

use embassy_sync::signal::Signal;
use portable_atomic::{AtomicU8, Ordering};

use crate::lights::{FirmwareInstant, LightsMutex};
use lights_core::controller::{RaceState, RaceTimer};

const STATE_STOPPED: u8 = 0;
const STATE_STARTING: u8 = 1;
const STATE_RUNNING: u8 = 2;

/// Race state shared between the timing task and the lights task.
pub struct RaceStateCell(AtomicU8);

impl RaceStateCell {
    /// Creates a cell reporting [`RaceState::Stopped`].
    pub const fn new() -> Self {
        Self(AtomicU8::new(STATE_STOPPED))
    }

    /// Publishes a new race state.
    pub fn publish(&self, state: RaceState) {
        let raw = match state {
            RaceState::Stopped => STATE_STOPPED,
            RaceState::Starting => STATE_STARTING,
            RaceState::Running => STATE_RUNNING,
        };
        self.0.store(raw, Ordering::Release);
    }

    /// Returns the most recently published race state.
    pub fn load(&self) -> RaceState {
        match self.0.load(Ordering::Acquire) {
            STATE_STARTING => RaceState::Starting,
            STATE_RUNNING => RaceState::Running,
            _ => RaceState::Stopped,
        }
    }
}

impl Default for RaceStateCell {
    fn default() -> Self {
        Self::new()
    }
}

/// Notification carrying the instant the go light turned on.
pub type BeginTimingSignal = Signal<LightsMutex, FirmwareInstant>;

/// [`RaceTimer`] adapter handed to the lights task.
pub struct RaceBridge<'a> {
    state: &'a RaceStateCell,
    begin: &'a BeginTimingSignal,
}

impl<'a> RaceBridge<'a> {
    /// Creates a bridge over the shared state cell and handoff signal.
    pub const fn new(state: &'a RaceStateCell, begin: &'a BeginTimingSignal) -> Self {
        Self { state, begin }
    }
}

impl RaceTimer for RaceBridge<'_> {
    type Instant = FirmwareInstant;

    fn race_state(&self) -> RaceState {
        self.state.load()
    }

    fn begin_timing(&mut self, now: FirmwareInstant) {
        self.begin.signal(now);
    }
}
