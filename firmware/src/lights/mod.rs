//! Light control surface bridging firmware tasks with `lights-core`.

#![cfg_attr(not(test), allow(dead_code))]

use core::ops::Add;
use core::time::Duration as CoreDuration;

#[cfg(not(target_os = "none"))]
use embassy_sync::blocking_mutex::raw::NoopRawMutex;
#[cfg(target_os = "none")]
use embassy_sync::blocking_mutex::raw::ThreadModeRawMutex;
use embassy_sync::channel::{Channel, Receiver, Sender};
use embassy_time::{Duration, Instant};

pub use lights_core::lights::{Light, LightRequest, Participant};
use lights_core::telemetry::TelemetryInstant;

/// Depth of the command queue shared between producers and the lights task.
pub const COMMAND_QUEUE_DEPTH: usize = 4;

#[cfg(target_os = "none")]
pub(crate) type LightsMutex = ThreadModeRawMutex;
#[cfg(not(target_os = "none"))]
pub(crate) type LightsMutex = NoopRawMutex;

/// Requests accepted by the lights task from its collaborators.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum LightCommand {
    /// Arms the start countdown on the next tick.
    InitiateStartSequence,
    /// Extinguishes every light and drops pending transitions.
    ResetLights,
    /// Drops pending transitions while leaving lit lights alone.
    ClearSchedules,
    /// Drives a lane's fault indicator and the alert strobe.
    SignalFault {
        lane: Participant,
        request: LightRequest,
    },
    /// Drives a single light directly, for maintenance checks.
    ToggleLight { light: Light, request: LightRequest },
}

/// Queue used to hand [`LightCommand`]s to the lights task.
pub type CommandQueue = Channel<LightsMutex, LightCommand, COMMAND_QUEUE_DEPTH>;

/// Convenience sender type alias for the light command queue.
pub type CommandSender<'a> = Sender<'a, LightsMutex, LightCommand, COMMAND_QUEUE_DEPTH>;

/// Convenience receiver type alias for the light command queue.
pub type CommandReceiver<'a> = Receiver<'a, LightsMutex, LightCommand, COMMAND_QUEUE_DEPTH>;

/// Embassy monotonic instant adapted to the timestamp bounds of
/// [`lights_core::controller::LightsController`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub struct FirmwareInstant(Instant);

impl FirmwareInstant {
    /// Captures the current monotonic timestamp.
    pub fn now() -> Self {
        Self(Instant::now())
    }

    /// Returns the wrapped Embassy instant.
    pub const fn into_embassy(self) -> Instant {
        self.0
    }
}

impl From<Instant> for FirmwareInstant {
    fn from(instant: Instant) -> Self {
        Self(instant)
    }
}

impl Add<CoreDuration> for FirmwareInstant {
    type Output = Self;

    fn add(self, duration: CoreDuration) -> Self {
        Self(self.0 + core_duration_to_embassy(duration))
    }
}

impl TelemetryInstant for FirmwareInstant {
    fn saturating_duration_since(&self, earlier: Self) -> CoreDuration {
        let micros = self.0.as_micros().saturating_sub(earlier.0.as_micros());
        CoreDuration::from_micros(micros)
    }
}

fn core_duration_to_embassy(duration: CoreDuration) -> Duration {
    let micros = u64::try_from(duration.as_micros()).unwrap_or(u64::MAX);
    Duration::from_micros(micros)
}
