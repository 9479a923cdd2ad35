use core::ops::Add;
use core::time::Duration;

use lights_core::controller::{LightsController, OverallState, RaceState, RaceTimer};
use lights_core::lights::{Light, LightRequest, LightState, OutputWord, Participant};
use lights_core::output::NoopBus;
use lights_core::telemetry::TelemetryInstant;

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct MockInstant(u64);

impl MockInstant {
    fn millis(value: u64) -> Self {
        Self(value)
    }
}

impl Add<Duration> for MockInstant {
    type Output = Self;

    fn add(self, rhs: Duration) -> Self::Output {
        Self(self.0 + u64::try_from(rhs.as_millis()).expect("duration fits in u64"))
    }
}

impl TelemetryInstant for MockInstant {
    fn saturating_duration_since(&self, earlier: Self) -> Duration {
        Duration::from_millis(self.0.saturating_sub(earlier.0))
    }
}

/// Simulated race-timing engine: reports `Starting` until timing begins.
struct MockRace {
    state: RaceState,
    begin_calls: Vec<MockInstant>,
}

impl MockRace {
    fn armed() -> Self {
        Self {
            state: RaceState::Starting,
            begin_calls: Vec::new(),
        }
    }
}

impl RaceTimer for MockRace {
    type Instant = MockInstant;

    fn race_state(&self) -> RaceState {
        self.state
    }

    fn begin_timing(&mut self, now: Self::Instant) {
        self.begin_calls.push(now);
        self.state = RaceState::Running;
    }
}

fn engine() -> LightsController<NoopBus, MockInstant> {
    LightsController::new(NoopBus::new())
}

fn lit(engine: &LightsController<NoopBus, MockInstant>) -> Vec<Light> {
    lights_core::lights::ALL_LIGHTS
        .iter()
        .map(|channel| channel.id)
        .filter(|&light| engine.light_state(light) == LightState::On)
        .collect()
}

#[test]
fn countdown_walks_the_reference_plan_tick_by_tick() {
    let mut engine = engine();
    let mut race = MockRace::armed();

    engine.initiate_start_sequence();
    assert_eq!(engine.overall_state(), OverallState::Starting);

    // 50 ms driver loop, as on the real hardware.
    for ms in (0..=4_050).step_by(50) {
        engine.tick(MockInstant::millis(ms), &mut race);

        match ms {
            0 => assert_eq!(lit(&engine), [Light::Red]),
            1_000 => assert_eq!(lit(&engine), [Light::Yellow1]),
            2_000 => assert_eq!(lit(&engine), [Light::Yellow2]),
            3_000 => {
                assert_eq!(lit(&engine), [Light::Green]);
                assert_eq!(
                    race.begin_calls.as_slice(),
                    [MockInstant::millis(3_000)],
                    "timing must begin in the tick the go light turns on"
                );
            }
            4_000 => {
                assert!(lit(&engine).is_empty());
                assert_eq!(engine.overall_state(), OverallState::Started);
            }
            _ => {}
        }
    }

    assert_eq!(race.begin_calls.len(), 1, "begin timing must fire exactly once");
    assert_eq!(race.state, RaceState::Running);
    assert_eq!(engine.overall_state(), OverallState::Started);
}

#[test]
fn countdown_stays_started_until_reset() {
    let mut engine = engine();
    let mut race = MockRace::armed();

    engine.initiate_start_sequence();
    for ms in (0..=5_000).step_by(50) {
        engine.tick(MockInstant::millis(ms), &mut race);
    }
    assert_eq!(engine.overall_state(), OverallState::Started);
    assert!(!engine.sequence_active());

    engine.reset_lights();
    assert_eq!(engine.overall_state(), OverallState::Stopped);
}

#[test]
fn timing_handoff_waits_for_the_race_engine() {
    let mut engine = engine();
    // Race engine never armed: the go light must not start any timing.
    let mut race = MockRace {
        state: RaceState::Stopped,
        begin_calls: Vec::new(),
    };

    engine.initiate_start_sequence();
    for ms in (0..=4_000).step_by(50) {
        engine.tick(MockInstant::millis(ms), &mut race);
    }

    assert!(race.begin_calls.is_empty());
    assert_eq!(engine.overall_state(), OverallState::Started);
}

#[test]
fn lane_four_fault_before_the_go_stage_still_starts_timing() {
    let mut engine = engine();
    let mut race = MockRace::armed();

    engine.initiate_start_sequence();
    engine.tick(MockInstant::millis(0), &mut race);

    // Lane 4 shares the green go lamp: a fault latched here lights it long
    // before its countdown stage, so the scheduled ON at 3 s is a no-op on
    // the bank. Timing must still begin on that deadline.
    engine.signal_fault(Participant::Lane4, LightRequest::On, MockInstant::millis(500));

    for ms in (50..=4_500).step_by(50) {
        engine.tick(MockInstant::millis(ms), &mut race);
    }

    assert_eq!(
        race.begin_calls.as_slice(),
        [MockInstant::millis(3_000)],
        "timing must begin when the go deadline comes due"
    );
    assert_eq!(race.state, RaceState::Running);
    assert_eq!(engine.overall_state(), OverallState::Started);
}

#[test]
fn reset_mid_sequence_aborts_all_pending_transitions() {
    let mut engine = engine();
    let mut race = MockRace::armed();

    engine.initiate_start_sequence();
    for ms in (0..=1_500).step_by(50) {
        engine.tick(MockInstant::millis(ms), &mut race);
    }
    assert_eq!(lit(&engine), [Light::Yellow1]);

    engine.reset_lights();
    assert_eq!(engine.overall_state(), OverallState::Stopped);
    assert_eq!(engine.pending_word(), OutputWord::ALL_OFF);

    // Deadlines that would have elapsed later must never fire.
    for ms in (1_550..=6_000).step_by(50) {
        engine.tick(MockInstant::millis(ms), &mut race);
        assert!(lit(&engine).is_empty());
        assert_eq!(engine.overall_state(), OverallState::Stopped);
    }

    assert_eq!(engine.committed_word(), Some(OutputWord::ALL_OFF));
    assert!(race.begin_calls.is_empty());
}

#[test]
fn coarse_tick_rate_still_consumes_every_deadline() {
    let mut engine = engine();
    let mut race = MockRace::armed();

    engine.initiate_start_sequence();
    // A stalled driver loop that only wakes every 1.7 s: transitions fire
    // late but none are lost, and the machine still reaches Started.
    for ms in (0..=6_800).step_by(1_700) {
        engine.tick(MockInstant::millis(ms), &mut race);
    }

    assert_eq!(engine.overall_state(), OverallState::Started);
    assert_eq!(race.begin_calls.len(), 1);
    assert!(lit(&engine).is_empty());
}
