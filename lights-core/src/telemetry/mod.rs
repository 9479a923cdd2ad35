//! Telemetry event catalog and ring recorder shared by firmware and host targets.
//!
//! The controller records every externally observable effect here: light
//! transitions, register commits, countdown lifecycle, the begin-timing
//! handoff, and fault signaling. Event kinds serialize to compact numeric
//! codes for transport over diagnostics channels while remaining `no_std`
//! compatible.

use core::{fmt, time::Duration};

use heapless::{HistoryBuf, OldestOrdered};

use crate::lights::{Light, LightState, OutputWord, Participant};

/// Identifier attached to recorded telemetry events.
pub type EventId = u32;

/// Discriminated telemetry events shared across all controller targets.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum LightEventKind {
    LightOn(Light),
    LightOff(Light),
    WordCommitted,
    SequenceArmed,
    SequenceComplete,
    TimingStarted,
    FaultRaised(Participant),
    FaultCleared(Participant),
    Custom(u16),
}

impl fmt::Display for LightEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LightEventKind::LightOn(light) => write!(f, "light-on {light}"),
            LightEventKind::LightOff(light) => write!(f, "light-off {light}"),
            LightEventKind::WordCommitted => f.write_str("word-committed"),
            LightEventKind::SequenceArmed => f.write_str("sequence-armed"),
            LightEventKind::SequenceComplete => f.write_str("sequence-complete"),
            LightEventKind::TimingStarted => f.write_str("timing-started"),
            LightEventKind::FaultRaised(lane) => write!(f, "fault-raised {lane}"),
            LightEventKind::FaultCleared(lane) => write!(f, "fault-cleared {lane}"),
            LightEventKind::Custom(code) => write!(f, "custom({code})"),
        }
    }
}

impl LightEventKind {
    const LIGHT_ON_BASE: u16 = 0x0000;
    const LIGHT_OFF_BASE: u16 = 0x0008;
    const WORD_COMMITTED_CODE: u16 = 0x0010;
    const SEQUENCE_ARMED_CODE: u16 = 0x0011;
    const SEQUENCE_COMPLETE_CODE: u16 = 0x0012;
    const TIMING_STARTED_CODE: u16 = 0x0013;
    const FAULT_RAISED_BASE: u16 = 0x0018;
    const FAULT_CLEARED_BASE: u16 = 0x001C;
    const FAULT_END: u16 = 0x0020;

    /// Encodes the event into a compact transport-friendly discriminant.
    #[must_use]
    pub const fn to_raw(self) -> u16 {
        match self {
            LightEventKind::LightOn(light) => Self::LIGHT_ON_BASE + light_index(light),
            LightEventKind::LightOff(light) => Self::LIGHT_OFF_BASE + light_index(light),
            LightEventKind::WordCommitted => Self::WORD_COMMITTED_CODE,
            LightEventKind::SequenceArmed => Self::SEQUENCE_ARMED_CODE,
            LightEventKind::SequenceComplete => Self::SEQUENCE_COMPLETE_CODE,
            LightEventKind::TimingStarted => Self::TIMING_STARTED_CODE,
            LightEventKind::FaultRaised(lane) => Self::FAULT_RAISED_BASE + lane_index(lane),
            LightEventKind::FaultCleared(lane) => Self::FAULT_CLEARED_BASE + lane_index(lane),
            LightEventKind::Custom(code) => code,
        }
    }

    /// Decodes a raw discriminant into an event, falling back to [`Custom`].
    ///
    /// [`Custom`]: LightEventKind::Custom
    #[must_use]
    pub fn from_raw(code: u16) -> Self {
        match code {
            Self::WORD_COMMITTED_CODE => LightEventKind::WordCommitted,
            Self::SEQUENCE_ARMED_CODE => LightEventKind::SequenceArmed,
            Self::SEQUENCE_COMPLETE_CODE => LightEventKind::SequenceComplete,
            Self::TIMING_STARTED_CODE => LightEventKind::TimingStarted,
            value if (Self::LIGHT_ON_BASE..Self::LIGHT_OFF_BASE).contains(&value) => {
                let offset = usize::from(value - Self::LIGHT_ON_BASE);
                Light::from_index(offset)
                    .map_or(LightEventKind::Custom(value), LightEventKind::LightOn)
            }
            value if (Self::LIGHT_OFF_BASE..Self::WORD_COMMITTED_CODE).contains(&value) => {
                let offset = usize::from(value - Self::LIGHT_OFF_BASE);
                Light::from_index(offset)
                    .map_or(LightEventKind::Custom(value), LightEventKind::LightOff)
            }
            value if (Self::FAULT_RAISED_BASE..Self::FAULT_CLEARED_BASE).contains(&value) => {
                let offset = usize::from(value - Self::FAULT_RAISED_BASE);
                Participant::from_index(offset)
                    .map_or(LightEventKind::Custom(value), LightEventKind::FaultRaised)
            }
            value if (Self::FAULT_CLEARED_BASE..Self::FAULT_END).contains(&value) => {
                let offset = usize::from(value - Self::FAULT_CLEARED_BASE);
                Participant::from_index(offset)
                    .map_or(LightEventKind::Custom(value), LightEventKind::FaultCleared)
            }
            other => LightEventKind::Custom(other),
        }
    }
}

/// Payloads carried alongside telemetry events.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TelemetryPayload {
    /// No additional metadata accompanies the event.
    None,
    /// Details describing a light transition.
    Light(LightTelemetry),
    /// The register word adopted by a flush.
    Word(WordTelemetry),
    /// Countdown lifecycle metadata.
    Sequence(SequenceTelemetry),
}

impl TelemetryPayload {
    /// Convenience constructor when no payload data is needed.
    #[must_use]
    pub const fn none() -> Self {
        TelemetryPayload::None
    }
}

/// Light transition payload.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct LightTelemetry {
    pub light: Light,
    pub state: LightState,
    pub elapsed_since_previous: Option<Duration>,
}

impl LightTelemetry {
    #[must_use]
    pub const fn new(
        light: Light,
        state: LightState,
        elapsed_since_previous: Option<Duration>,
    ) -> Self {
        Self {
            light,
            state,
            elapsed_since_previous,
        }
    }
}

/// Register commit payload.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct WordTelemetry {
    pub word: OutputWord,
}

impl WordTelemetry {
    #[must_use]
    pub const fn new(word: OutputWord) -> Self {
        Self { word }
    }
}

/// Countdown lifecycle payload.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SequenceTelemetry {
    pub stage_count: u8,
    pub elapsed: Option<Duration>,
}

impl SequenceTelemetry {
    #[must_use]
    pub const fn new(stage_count: u8, elapsed: Option<Duration>) -> Self {
        Self {
            stage_count,
            elapsed,
        }
    }
}

/// Total number of telemetry entries retained in memory.
pub const TELEMETRY_RING_CAPACITY: usize = 64;

/// Trait implemented by monotonic instant wrappers used for telemetry tracking.
pub trait TelemetryInstant: Copy {
    /// Returns the saturating duration from `earlier` to `self`.
    fn saturating_duration_since(&self, earlier: Self) -> Duration;
}

/// Telemetry record stored in the ring buffer.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TelemetryRecord<TInstant>
where
    TInstant: Copy,
{
    pub id: EventId,
    pub timestamp: TInstant,
    pub event: LightEventKind,
    pub details: TelemetryPayload,
}

/// Telemetry ring buffer type alias.
pub type TelemetryRing<TInstant, const CAPACITY: usize = TELEMETRY_RING_CAPACITY> =
    HistoryBuf<TelemetryRecord<TInstant>, CAPACITY>;

/// Records telemetry events into a fixed-size ring buffer.
pub struct TelemetryRecorder<TInstant, const CAPACITY: usize = TELEMETRY_RING_CAPACITY>
where
    TInstant: Copy,
{
    ring: TelemetryRing<TInstant, CAPACITY>,
    last_transition_at: Option<TInstant>,
    next_event_id: EventId,
}

impl<TInstant, const CAPACITY: usize> TelemetryRecorder<TInstant, CAPACITY>
where
    TInstant: Copy + TelemetryInstant,
{
    /// Creates a new telemetry recorder with an empty history.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ring: HistoryBuf::new(),
            last_transition_at: None,
            next_event_id: 0,
        }
    }

    /// Returns an iterator over the recorded telemetry in chronological order.
    pub fn oldest_first(&self) -> OldestOrdered<'_, TelemetryRecord<TInstant>> {
        self.ring.oldest_ordered()
    }

    /// Returns the most recent telemetry record, if available.
    pub fn latest(&self) -> Option<&TelemetryRecord<TInstant>> {
        self.ring.recent()
    }

    /// Returns the number of records currently stored.
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    /// Returns `true` when no telemetry records are stored.
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// Records a light transition and captures elapsed time since the previous one.
    pub fn record_light_transition(
        &mut self,
        light: Light,
        state: LightState,
        timestamp: TInstant,
    ) -> EventId {
        let elapsed = self
            .last_transition_at
            .map(|previous| timestamp.saturating_duration_since(previous));
        self.last_transition_at = Some(timestamp);

        let payload = TelemetryPayload::Light(LightTelemetry::new(light, state, elapsed));
        self.record(
            match state {
                LightState::On => LightEventKind::LightOn(light),
                LightState::Off => LightEventKind::LightOff(light),
            },
            payload,
            timestamp,
        )
    }

    /// Records a register commit performed by the output stage.
    pub fn record_word_committed(&mut self, word: OutputWord, timestamp: TInstant) -> EventId {
        self.record(
            LightEventKind::WordCommitted,
            TelemetryPayload::Word(WordTelemetry::new(word)),
            timestamp,
        )
    }

    /// Records that a countdown plan was armed.
    pub fn record_sequence_armed(&mut self, stage_count: usize, timestamp: TInstant) -> EventId {
        self.record(
            LightEventKind::SequenceArmed,
            TelemetryPayload::Sequence(SequenceTelemetry::new(truncate_count(stage_count), None)),
            timestamp,
        )
    }

    /// Records the completion of a countdown run.
    pub fn record_sequence_complete(
        &mut self,
        stage_count: usize,
        started_at: Option<TInstant>,
        timestamp: TInstant,
    ) -> EventId {
        let elapsed = started_at.map(|start| timestamp.saturating_duration_since(start));
        self.record(
            LightEventKind::SequenceComplete,
            TelemetryPayload::Sequence(SequenceTelemetry::new(
                truncate_count(stage_count),
                elapsed,
            )),
            timestamp,
        )
    }

    /// Records the one-time begin-timing handoff to the race engine.
    pub fn record_timing_started(&mut self, timestamp: TInstant) -> EventId {
        self.record(
            LightEventKind::TimingStarted,
            TelemetryPayload::none(),
            timestamp,
        )
    }

    /// Records a fault indicator transition for a lane.
    pub fn record_fault(
        &mut self,
        lane: Participant,
        state: LightState,
        timestamp: TInstant,
    ) -> EventId {
        self.record(
            match state {
                LightState::On => LightEventKind::FaultRaised(lane),
                LightState::Off => LightEventKind::FaultCleared(lane),
            },
            TelemetryPayload::none(),
            timestamp,
        )
    }
}

impl<TInstant, const CAPACITY: usize> Default for TelemetryRecorder<TInstant, CAPACITY>
where
    TInstant: Copy + TelemetryInstant,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<TInstant, const CAPACITY: usize> TelemetryRecorder<TInstant, CAPACITY>
where
    TInstant: Copy + TelemetryInstant,
{
    /// Records an arbitrary telemetry event with the supplied payload.
    pub fn record(
        &mut self,
        event: LightEventKind,
        payload: TelemetryPayload,
        timestamp: TInstant,
    ) -> EventId {
        let id = self.next_event_id;
        self.next_event_id = self.next_event_id.wrapping_add(1);

        self.ring.write(TelemetryRecord {
            id,
            timestamp,
            event,
            details: payload,
        });

        id
    }
}

fn truncate_count(count: usize) -> u8 {
    u8::try_from(count).unwrap_or(u8::MAX)
}

const fn light_index(light: Light) -> u16 {
    match light {
        Light::Alert => 0,
        Light::Red => 1,
        Light::Yellow1 => 2,
        Light::Blue => 3,
        Light::Yellow2 => 4,
        Light::Green => 5,
    }
}

const fn lane_index(lane: Participant) -> u16 {
    match lane {
        Participant::Lane1 => 0,
        Participant::Lane2 => 1,
        Participant::Lane3 => 2,
        Participant::Lane4 => 3,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lights::ALL_LIGHTS;

    #[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
    struct MockInstant(u64);

    impl TelemetryInstant for MockInstant {
        fn saturating_duration_since(&self, earlier: Self) -> Duration {
            Duration::from_micros(self.0.saturating_sub(earlier.0))
        }
    }

    #[test]
    fn raw_codes_round_trip_for_every_event() {
        let mut kinds: heapless::Vec<LightEventKind, 32> = heapless::Vec::new();
        for channel in ALL_LIGHTS {
            kinds.push(LightEventKind::LightOn(channel.id)).unwrap();
            kinds.push(LightEventKind::LightOff(channel.id)).unwrap();
        }
        for index in 0..crate::lights::PARTICIPANT_COUNT {
            let lane = Participant::from_index(index).unwrap();
            kinds.push(LightEventKind::FaultRaised(lane)).unwrap();
            kinds.push(LightEventKind::FaultCleared(lane)).unwrap();
        }
        kinds.push(LightEventKind::WordCommitted).unwrap();
        kinds.push(LightEventKind::SequenceArmed).unwrap();
        kinds.push(LightEventKind::SequenceComplete).unwrap();
        kinds.push(LightEventKind::TimingStarted).unwrap();

        for kind in kinds {
            assert_eq!(LightEventKind::from_raw(kind.to_raw()), kind);
        }
    }

    #[test]
    fn unknown_codes_decode_as_custom() {
        assert_eq!(
            LightEventKind::from_raw(0x4242),
            LightEventKind::Custom(0x4242)
        );
    }

    #[test]
    fn light_transitions_capture_elapsed_time() {
        let mut recorder: TelemetryRecorder<MockInstant> = TelemetryRecorder::new();
        recorder.record_light_transition(Light::Red, LightState::On, MockInstant(1_000));
        recorder.record_light_transition(Light::Red, LightState::Off, MockInstant(2_500));

        let latest = recorder.latest().expect("record expected");
        match latest.details {
            TelemetryPayload::Light(light) => {
                assert_eq!(light.light, Light::Red);
                assert_eq!(light.state, LightState::Off);
                assert_eq!(
                    light.elapsed_since_previous,
                    Some(Duration::from_micros(1_500))
                );
            }
            ref other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn event_ids_are_monotonic() {
        let mut recorder: TelemetryRecorder<MockInstant> = TelemetryRecorder::new();
        let first = recorder.record_timing_started(MockInstant(0));
        let second = recorder.record_timing_started(MockInstant(1));
        assert_eq!(second, first + 1);
        assert_eq!(recorder.len(), 2);
    }

    #[test]
    fn ring_evicts_oldest_records_at_capacity() {
        let mut recorder: TelemetryRecorder<MockInstant, 4> = TelemetryRecorder::new();
        for n in 0..6u8 {
            recorder.record_word_committed(OutputWord::from_raw(n), MockInstant(u64::from(n)));
        }
        assert_eq!(recorder.len(), 4);
        let oldest = recorder.oldest_first().next().expect("ring not empty");
        assert_eq!(oldest.id, 2);
    }
}
