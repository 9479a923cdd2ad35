//! Start countdown plans shared by firmware and host targets.
//!
//! A plan is an ordered list of timed light pulses; the terminal stage's
//! light is the designated "go" lamp whose ON transition arms the external
//! race timer. The reference plan below drives the classic four-stage,
//! one-second countdown; the state machine itself is generic over any plan
//! with contiguous back-to-back windows.

use core::time::Duration;

use crate::lights::Light;

/// Hold duration of every stage in the reference countdown.
pub const STAGE_HOLD: Duration = Duration::from_millis(1_000);
/// Delay before the second stage lights up.
pub const STAGE2_DELAY: Duration = Duration::from_millis(1_000);
/// Delay before the third stage lights up.
pub const STAGE3_DELAY: Duration = Duration::from_millis(2_000);
/// Delay before the go lamp lights up.
pub const GO_DELAY: Duration = Duration::from_millis(3_000);

/// One timed pulse within a start plan.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct StartStage {
    pub light: Light,
    /// Offset of the ON transition relative to sequence start.
    pub starts_after: Duration,
    /// How long the light stays on before its OFF transition.
    pub hold_for: Duration,
}

impl StartStage {
    pub const fn new(light: Light, starts_after: Duration, hold_for: Duration) -> Self {
        Self {
            light,
            starts_after,
            hold_for,
        }
    }

    /// Offset of the OFF transition relative to sequence start.
    pub const fn ends_after(&self) -> Duration {
        self.starts_after.saturating_add(self.hold_for)
    }
}

/// Immutable start plan shared across targets.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct StartPlan {
    stages: &'static [StartStage],
}

impl StartPlan {
    pub const fn new(stages: &'static [StartStage]) -> Self {
        Self { stages }
    }

    /// Ordered stages that make up the countdown.
    pub const fn stages(&self) -> &'static [StartStage] {
        self.stages
    }

    /// Number of stages in the plan.
    pub const fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// The terminal stage's light, whose ON transition means "go".
    pub fn go_light(&self) -> Option<Light> {
        self.stages.last().map(|stage| stage.light)
    }

    /// Returns `true` when the plan pulses the given light.
    pub fn involves(&self, light: Light) -> bool {
        self.stages.iter().any(|stage| stage.light == light)
    }

    /// Offset at which the final stage goes dark.
    pub fn total_duration(&self) -> Duration {
        self.stages
            .last()
            .map_or(Duration::ZERO, StartStage::ends_after)
    }

    /// Validates that the stages form equal-length windows running
    /// back-to-back without overlap.
    pub fn is_contiguous(&self) -> bool {
        let Some(first) = self.stages.first() else {
            return false;
        };
        let hold = first.hold_for;
        let mut expected_start = first.starts_after;
        for stage in self.stages {
            if stage.hold_for != hold || stage.starts_after != expected_start {
                return false;
            }
            expected_start = stage.ends_after();
        }
        true
    }
}

/// Ordered stages of the reference four-stage countdown.
pub const COUNTDOWN_STAGES: [StartStage; 4] = [
    StartStage::new(Light::Red, Duration::ZERO, STAGE_HOLD),
    StartStage::new(Light::Yellow1, STAGE2_DELAY, STAGE_HOLD),
    StartStage::new(Light::Yellow2, STAGE3_DELAY, STAGE_HOLD),
    StartStage::new(Light::Green, GO_DELAY, STAGE_HOLD),
];

/// Plan describing the reference countdown, terminating on the green lamp.
pub const COUNTDOWN_PLAN: StartPlan = StartPlan::new(&COUNTDOWN_STAGES);

/// Returns the shared reference countdown plan.
#[must_use]
pub const fn countdown_plan() -> StartPlan {
    COUNTDOWN_PLAN
}
