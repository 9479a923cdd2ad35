use core::ops::Add;
use core::time::Duration;

use lights_core::controller::{LightsController, RaceState, RaceTimer};
use lights_core::lights::{Light, LightRequest, LightState, OutputWord};
use lights_core::output::{LineLevel, RegisterBus};
use lights_core::telemetry::{LightEventKind, TelemetryInstant};

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

struct IdleRace;

impl RaceTimer for IdleRace {
    type Instant = MockInstant;

    fn race_state(&self) -> RaceState {
        RaceState::Stopped
    }

    fn begin_timing(&mut self, _: Self::Instant) {}
}

/// Behavioural model of the 74HC595: samples data on clock rising edges and
/// snapshots the shift register when the latch goes high.
#[derive(Debug, Default)]
struct ModelBus {
    shift: u8,
    data: bool,
    clock_high: bool,
    latched: Vec<u8>,
}

impl RegisterBus for ModelBus {
    fn set_latch(&mut self, level: LineLevel) {
        if level == LineLevel::High {
            self.latched.push(self.shift);
        }
    }

    fn set_clock(&mut self, level: LineLevel) {
        let high = level == LineLevel::High;
        if high && !self.clock_high {
            self.shift = (self.shift << 1) | u8::from(self.data);
        }
        self.clock_high = high;
    }

    fn set_data(&mut self, level: LineLevel) {
        self.data = level == LineLevel::High;
    }
}

fn engine() -> LightsController<ModelBus, MockInstant> {
    LightsController::new(ModelBus::default())
}

#[test]
fn first_tick_transmits_the_all_off_word() {
    let mut engine = engine();
    let mut race = IdleRace;

    engine.tick(MockInstant::millis(0), &mut race);
    assert_eq!(engine.bus().latched.as_slice(), [0]);
    assert_eq!(engine.committed_word(), Some(OutputWord::ALL_OFF));
}

#[test]
fn toggles_within_one_tick_coalesce_into_one_transaction() {
    let mut engine = engine();
    let mut race = IdleRace;
    engine.tick(MockInstant::millis(0), &mut race);

    engine.toggle_light(Light::Red, LightRequest::On, MockInstant::millis(10));
    engine.toggle_light(Light::Blue, LightRequest::On, MockInstant::millis(10));
    engine.toggle_light(Light::Green, LightRequest::On, MockInstant::millis(10));
    engine.toggle_light(Light::Green, LightRequest::Off, MockInstant::millis(10));

    engine.tick(MockInstant::millis(50), &mut race);

    let expected = Light::Red.mask() | Light::Blue.mask();
    assert_eq!(engine.bus().latched.as_slice(), [0, expected]);
}

#[test]
fn unchanged_word_causes_no_transaction() {
    let mut engine = engine();
    let mut race = IdleRace;

    engine.tick(MockInstant::millis(0), &mut race);
    engine.tick(MockInstant::millis(50), &mut race);
    engine.tick(MockInstant::millis(100), &mut race);

    assert_eq!(engine.bus().latched.len(), 1);
}

#[test]
fn committed_word_matches_the_pending_word_bit_for_bit() {
    let mut engine = engine();
    let mut race = IdleRace;

    engine.toggle_light(Light::Alert, LightRequest::On, MockInstant::millis(0));
    engine.toggle_light(Light::Yellow2, LightRequest::On, MockInstant::millis(0));
    engine.tick(MockInstant::millis(0), &mut race);

    let word = engine.pending_word();
    assert_eq!(engine.bus().latched.last().copied(), Some(word.raw()));
    assert_eq!(word.state_of(Light::Alert), LightState::On);
    assert_eq!(word.state_of(Light::Yellow2), LightState::On);
}

#[test]
fn telemetry_records_each_register_commit() {
    let mut engine = engine();
    let mut race = IdleRace;

    engine.tick(MockInstant::millis(0), &mut race);
    engine.toggle_light(Light::Red, LightRequest::On, MockInstant::millis(10));
    engine.tick(MockInstant::millis(50), &mut race);
    engine.tick(MockInstant::millis(100), &mut race);

    let commits = engine
        .telemetry()
        .oldest_first()
        .filter(|record| record.event == LightEventKind::WordCommitted)
        .count();
    assert_eq!(commits, 2);
}
