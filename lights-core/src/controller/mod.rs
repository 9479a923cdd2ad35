//! Tick-driven engine coordinating the light bank, schedule table, start
//! countdown, and register output.
//!
//! One [`LightsController`] instance is owned by the surrounding driver loop
//! and passed by reference to anything that needs to query or mutate it;
//! there is no process-wide state. The engine is single-threaded and
//! cooperative: the driver invokes [`tick`](LightsController::tick) at a
//! bounded interval, all deadline comparisons within a tick use the one time
//! value read at tick entry, and the register flush at the end of the tick is
//! the only hardware side effect.

use core::ops::Add;
use core::time::Duration;

use crate::lights::{
    ALERT_LIGHT, Light, LightBank, LightRequest, LightState, OutputWord, Participant,
    fault_light_for,
};
use crate::output::{OutputStage, RegisterBus};
use crate::schedule::LightSchedule;
use crate::sequence::{StartPlan, countdown_plan};
use crate::telemetry::{TelemetryInstant, TelemetryRecorder};

/// How long the shared alert lamp stays lit after a fault is raised.
pub const ALERT_PULSE: Duration = Duration::from_millis(1_000);

/// Overall state of the start-sequence machine.
///
/// Transitions are owned exclusively by the controller. External code may
/// only request `Starting` via [`LightsController::initiate_start_sequence`]
/// or force `Stopped` via [`LightsController::reset_lights`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum OverallState {
    Stopped,
    Starting,
    Started,
}

/// Race state reported by the external timing engine.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RaceState {
    Stopped,
    Starting,
    Running,
}

/// Interface to the external race-timing engine.
///
/// `begin_timing` is invoked at most once per start sequence, in the same
/// tick the go light's scheduled ON came due, so the visual "go" and the
/// start of elapsed-time measurement are observably simultaneous.
pub trait RaceTimer {
    /// Monotonic timestamp type shared with the controller.
    type Instant: Copy;

    /// Reports the engine's own race state.
    fn race_state(&self) -> RaceState;

    /// Starts elapsed-time measurement.
    fn begin_timing(&mut self, now: Self::Instant);
}

/// The start-lights engine.
pub struct LightsController<B, Instant>
where
    B: RegisterBus,
    Instant: Copy + Ord,
{
    bank: LightBank,
    schedule: LightSchedule<Instant>,
    output: OutputStage<B>,
    plan: StartPlan,
    state: OverallState,
    sequence_armed: bool,
    sequence_started_at: Option<Instant>,
    telemetry: TelemetryRecorder<Instant>,
}

impl<B, Instant> LightsController<B, Instant>
where
    B: RegisterBus,
    Instant: Copy + Ord + Add<Duration, Output = Instant> + TelemetryInstant,
{
    /// Creates a controller driving the reference countdown plan.
    pub const fn new(bus: B) -> Self {
        Self::with_plan(bus, countdown_plan())
    }

    /// Creates a controller driving a custom countdown plan.
    pub const fn with_plan(bus: B, plan: StartPlan) -> Self {
        Self {
            bank: LightBank::new(),
            schedule: LightSchedule::new(),
            output: OutputStage::new(bus),
            plan,
            state: OverallState::Stopped,
            sequence_armed: false,
            sequence_started_at: None,
            telemetry: TelemetryRecorder::new(),
        }
    }

    /// Current overall state of the start-sequence machine.
    pub const fn overall_state(&self) -> OverallState {
        self.state
    }

    /// Returns `true` while countdown deadlines are populated and not yet
    /// all consumed.
    pub const fn sequence_active(&self) -> bool {
        self.sequence_armed
    }

    /// Logical state of a light as accumulated so far. Pure read.
    pub const fn light_state(&self, light: Light) -> LightState {
        self.bank.light_state(light)
    }

    /// The pending output word.
    pub const fn pending_word(&self) -> OutputWord {
        self.bank.pending_word()
    }

    /// The last word transmitted to the register, if any.
    pub const fn committed_word(&self) -> Option<OutputWord> {
        self.output.committed()
    }

    /// The countdown plan this controller drives.
    pub const fn plan(&self) -> StartPlan {
        self.plan
    }

    /// Read-only view of the schedule table.
    pub const fn schedule(&self) -> &LightSchedule<Instant> {
        &self.schedule
    }

    /// Read-only view of the recorded telemetry.
    pub const fn telemetry(&self) -> &TelemetryRecorder<Instant> {
        &self.telemetry
    }

    /// Provides access to the register bus.
    pub fn bus(&self) -> &B {
        self.output.bus()
    }

    /// Provides mutable access to the register bus.
    pub fn bus_mut(&mut self) -> &mut B {
        self.output.bus_mut()
    }

    /// Requests the start countdown.
    ///
    /// Only honoured while `Stopped`; the countdown deadlines are populated
    /// on the next tick. `Started` is terminal until [`reset_lights`] forces
    /// `Stopped` again.
    ///
    /// [`reset_lights`]: LightsController::reset_lights
    pub fn initiate_start_sequence(&mut self) {
        if matches!(self.state, OverallState::Stopped) {
            self.state = OverallState::Starting;
        }
    }

    /// Emergency abort, usable from any state including mid-sequence.
    ///
    /// Forces `Stopped`, clears every schedule, and zeroes the pending word;
    /// the all-off word reaches the register on the next flush.
    pub fn reset_lights(&mut self) {
        self.state = OverallState::Stopped;
        self.sequence_armed = false;
        self.sequence_started_at = None;
        self.bank.all_off();
        self.schedule.clear_all();
    }

    /// Drops every pending schedule deadline without touching light states.
    pub fn clear_schedules(&mut self) {
        self.schedule.clear_all();
    }

    /// Applies a transition request to a light immediately.
    ///
    /// The change lands in the pending word and reaches the register on the
    /// next flush.
    pub fn toggle_light(&mut self, light: Light, request: LightRequest, now: Instant) {
        if let Some(applied) = self.bank.toggle(light, request) {
            self.telemetry.record_light_transition(light, applied, now);
        }
    }

    /// Signals a fault for a lane.
    ///
    /// Maps the lane to its indicator light and applies the request. When the
    /// indicator actually turns on, the shared alert lamp is additionally
    /// scheduled ON now / OFF after [`ALERT_PULSE`], independent of any
    /// running start sequence. Clearing a fault leaves an in-flight alert
    /// pulse untouched.
    pub fn signal_fault(&mut self, lane: Participant, request: LightRequest, now: Instant) {
        let light = fault_light_for(lane);
        if let Some(applied) = self.bank.toggle(light, request) {
            self.telemetry.record_fault(lane, applied, now);
            self.telemetry.record_light_transition(light, applied, now);
            if applied == LightState::On {
                self.schedule.schedule_on(ALERT_LIGHT, now);
                self.schedule.schedule_off(ALERT_LIGHT, now + ALERT_PULSE);
            }
        }
    }

    /// Advances the engine by one tick.
    ///
    /// Order within the tick: populate countdown deadlines on the first
    /// `Starting` tick, fire every due schedule, hand off to the race timer
    /// if the go light's ON deadline fired this tick, settle the state
    /// machine, then
    /// push the accumulated word to the register if it changed.
    pub fn tick<R>(&mut self, now: Instant, race: &mut R)
    where
        R: RaceTimer<Instant = Instant>,
    {
        self.arm_start_sequence(now);

        let go_light = match self.state {
            OverallState::Starting => self.plan.go_light(),
            _ => None,
        };

        let mut go_turned_on = false;
        {
            let Self {
                schedule,
                bank,
                telemetry,
                ..
            } = self;
            schedule.drain_due(now, |light, state| {
                // The go lamp can double as a fault indicator, so a latched
                // fault makes its toggle a no-op; the go edge is keyed to
                // the due ON deadline, not to a bank change.
                if state == LightState::On && Some(light) == go_light {
                    go_turned_on = true;
                }
                let request = match state {
                    LightState::On => LightRequest::On,
                    LightState::Off => LightRequest::Off,
                };
                if let Some(applied) = bank.toggle(light, request) {
                    telemetry.record_light_transition(light, applied, now);
                }
            });
        }

        if matches!(self.state, OverallState::Starting) {
            if go_turned_on && matches!(race.race_state(), RaceState::Starting) {
                race.begin_timing(now);
                self.telemetry.record_timing_started(now);
            }
            if self.sequence_armed && !self.plan_pending() {
                self.sequence_armed = false;
                self.state = OverallState::Started;
                self.telemetry.record_sequence_complete(
                    self.plan.stage_count(),
                    self.sequence_started_at,
                    now,
                );
                self.sequence_started_at = None;
            }
        }

        let pending = self.bank.pending_word();
        if self.output.flush(pending) {
            self.telemetry.record_word_committed(pending, now);
        }
    }

    /// Populates the countdown deadlines on the first tick spent `Starting`.
    fn arm_start_sequence(&mut self, now: Instant) {
        if !matches!(self.state, OverallState::Starting) || self.sequence_armed {
            return;
        }
        for stage in self.plan.stages() {
            self.schedule.schedule_on(stage.light, now + stage.starts_after);
            self.schedule.schedule_off(stage.light, now + stage.ends_after());
        }
        self.sequence_armed = true;
        self.sequence_started_at = Some(now);
        self.telemetry
            .record_sequence_armed(self.plan.stage_count(), now);
    }

    /// Returns `true` while any plan light still has a pending deadline.
    fn plan_pending(&self) -> bool {
        self.plan
            .stages()
            .iter()
            .any(|stage| self.schedule.has_pending(stage.light))
    }
}
