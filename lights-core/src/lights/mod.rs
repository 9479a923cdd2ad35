//! Light registry and output-word bookkeeping shared by firmware and host targets.
//!
//! Every physical indicator is bound to one bit of the 8-bit word shifted out
//! to the 74HC595 register. The catalog below is the single source of truth
//! for that wiring, including which lights double as per-lane fault
//! indicators. Everything in this module is `no_std` friendly so the same
//! data can be compiled for both the MCU firmware and the host-side emulator.

use core::fmt;

/// Number of physical light channels driven by the output register.
pub const LIGHT_COUNT: usize = 6;

/// Identifier for the indicator channels wired to the output register.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Light {
    /// Shared alert lamp pulsed when a fault is raised.
    Alert,
    Red,
    Yellow1,
    Blue,
    Yellow2,
    /// Terminal "go" lamp of the start countdown.
    Green,
}

impl Light {
    /// Deterministic index for lookups into [`ALL_LIGHTS`] and schedule slots.
    pub const fn as_index(self) -> usize {
        match self {
            Light::Alert => 0,
            Light::Red => 1,
            Light::Yellow1 => 2,
            Light::Blue => 3,
            Light::Yellow2 => 4,
            Light::Green => 5,
        }
    }

    /// Attempts to construct a [`Light`] from a raw index.
    pub const fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Light::Alert),
            1 => Some(Light::Red),
            2 => Some(Light::Yellow1),
            3 => Some(Light::Blue),
            4 => Some(Light::Yellow2),
            5 => Some(Light::Green),
            _ => None,
        }
    }

    /// Bit position of this light in the output word.
    pub const fn register_bit(self) -> u8 {
        match self {
            Light::Alert => 7,
            Light::Red => 6,
            Light::Yellow1 => 5,
            Light::Blue => 4,
            Light::Yellow2 => 3,
            Light::Green => 2,
        }
    }

    /// Single-bit mask of this light in the output word.
    pub const fn mask(self) -> u8 {
        1 << self.register_bit()
    }
}

impl fmt::Display for Light {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(light_by_id(*self).name)
    }
}

/// Metadata describing how a light channel is routed on the board.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct LightChannel {
    pub id: Light,
    pub name: &'static str,
    /// 74HC595 parallel output the lamp driver hangs off.
    pub register_output: &'static str,
}

impl LightChannel {
    pub const fn new(id: Light, name: &'static str, register_output: &'static str) -> Self {
        Self {
            id,
            name,
            register_output,
        }
    }
}

/// Compile-time catalog of every light channel.
pub const ALL_LIGHTS: [LightChannel; LIGHT_COUNT] = [
    LightChannel::new(Light::Alert, "ALERT", "QH"),
    LightChannel::new(Light::Red, "RED", "QG"),
    LightChannel::new(Light::Yellow1, "YELLOW1", "QF"),
    LightChannel::new(Light::Blue, "BLUE", "QE"),
    LightChannel::new(Light::Yellow2, "YELLOW2", "QD"),
    LightChannel::new(Light::Green, "GREEN", "QC"),
];

/// Retrieve light metadata by identifier.
pub const fn light_by_id(id: Light) -> LightChannel {
    ALL_LIGHTS[id.as_index()]
}

/// Persisted logical state of a light.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum LightState {
    Off,
    On,
}

impl LightState {
    /// Returns the opposite state.
    pub const fn inverted(self) -> Self {
        match self {
            LightState::Off => LightState::On,
            LightState::On => LightState::Off,
        }
    }
}

/// Transition request applied to a light.
///
/// `Toggle` is never persisted; it resolves against the light's current
/// logical state at the moment the request is applied.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum LightRequest {
    Off,
    On,
    Toggle,
}

impl LightRequest {
    /// Resolves the request into a concrete target state.
    pub const fn resolve(self, current: LightState) -> LightState {
        match self {
            LightRequest::Off => LightState::Off,
            LightRequest::On => LightState::On,
            LightRequest::Toggle => current.inverted(),
        }
    }
}

/// Combined on/off state of all lights as transmitted to the register.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub struct OutputWord(u8);

impl OutputWord {
    /// Word with every light off.
    pub const ALL_OFF: Self = Self(0);

    /// Wraps a raw register value.
    pub const fn from_raw(raw: u8) -> Self {
        Self(raw)
    }

    /// Raw register value shifted out on the wire.
    pub const fn raw(self) -> u8 {
        self.0
    }

    /// Returns `true` when the light's bit is set.
    pub const fn contains(self, light: Light) -> bool {
        self.0 & light.mask() != 0
    }

    /// Returns the word with the light's bit forced to `state`.
    ///
    /// Bitwise OR / AND-NOT, so repeated identical requests cannot corrupt
    /// neighbouring bits.
    pub const fn with(self, light: Light, state: LightState) -> Self {
        match state {
            LightState::On => Self(self.0 | light.mask()),
            LightState::Off => Self(self.0 & !light.mask()),
        }
    }

    /// Logical state of the light's bit.
    pub const fn state_of(self, light: Light) -> LightState {
        if self.contains(light) {
            LightState::On
        } else {
            LightState::Off
        }
    }
}

/// Accumulates requested light states into the pending output word.
///
/// The bank only tracks the *desired* state; committing the word to hardware
/// is the output stage's concern so any number of toggles within one tick
/// collapse into a single register transaction.
#[derive(Copy, Clone, Debug, Default)]
pub struct LightBank {
    pending: OutputWord,
}

impl LightBank {
    /// Creates a bank with every light off.
    pub const fn new() -> Self {
        Self {
            pending: OutputWord::ALL_OFF,
        }
    }

    /// Applies a transition request to a light.
    ///
    /// Returns the transition that was applied, or `None` when the resolved
    /// state already matched the current one (repeated identical requests are
    /// no-ops).
    pub fn toggle(&mut self, light: Light, request: LightRequest) -> Option<LightState> {
        let current = self.pending.state_of(light);
        let target = request.resolve(current);
        if target == current {
            return None;
        }
        self.pending = self.pending.with(light, target);
        Some(target)
    }

    /// Logical state of a light as accumulated so far. Pure read.
    pub const fn light_state(&self, light: Light) -> LightState {
        self.pending.state_of(light)
    }

    /// The pending output word.
    pub const fn pending_word(&self) -> OutputWord {
        self.pending
    }

    /// Forces every light off. Takes effect on the next flush.
    pub fn all_off(&mut self) {
        self.pending = OutputWord::ALL_OFF;
    }
}

/// Number of lanes with a dedicated fault indicator.
pub const PARTICIPANT_COUNT: usize = 4;

/// Lane identifier for fault signaling.
///
/// A closed enumeration so an out-of-range lane cannot be expressed; the
/// indicator table below is total over it.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Participant {
    Lane1,
    Lane2,
    Lane3,
    Lane4,
}

impl Participant {
    /// Deterministic index for lookups into [`FAULT_LIGHTS`].
    pub const fn as_index(self) -> usize {
        match self {
            Participant::Lane1 => 0,
            Participant::Lane2 => 1,
            Participant::Lane3 => 2,
            Participant::Lane4 => 3,
        }
    }

    /// Attempts to construct a [`Participant`] from a raw index.
    pub const fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Participant::Lane1),
            1 => Some(Participant::Lane2),
            2 => Some(Participant::Lane3),
            3 => Some(Participant::Lane4),
            _ => None,
        }
    }
}

impl fmt::Display for Participant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "lane-{}", self.as_index() + 1)
    }
}

/// Indicator light assigned to each lane.
pub const FAULT_LIGHTS: [Light; PARTICIPANT_COUNT] = [
    Light::Red,
    Light::Blue,
    Light::Yellow2,
    Light::Green,
];

/// Retrieve the fault indicator for a lane.
pub const fn fault_light_for(participant: Participant) -> Light {
    FAULT_LIGHTS[participant.as_index()]
}

/// Shared lamp pulsed whenever a fault indicator turns on.
pub const ALERT_LIGHT: Light = Light::Alert;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_masks_are_distinct_powers_of_two() {
        let mut seen = 0u8;
        for channel in ALL_LIGHTS {
            let mask = channel.id.mask();
            assert_eq!(mask.count_ones(), 1);
            assert_eq!(seen & mask, 0, "{} reuses a register bit", channel.name);
            seen |= mask;
        }
    }

    #[test]
    fn index_round_trips_for_every_light() {
        for index in 0..LIGHT_COUNT {
            let light = Light::from_index(index).expect("index should map to a light");
            assert_eq!(light.as_index(), index);
        }
        assert!(Light::from_index(LIGHT_COUNT).is_none());
    }

    #[test]
    fn repeated_on_requests_accumulate_once() {
        let mut bank = LightBank::new();
        assert_eq!(bank.toggle(Light::Red, LightRequest::On), Some(LightState::On));
        assert_eq!(bank.toggle(Light::Red, LightRequest::On), None);
        assert_eq!(bank.pending_word().raw(), Light::Red.mask());
    }

    #[test]
    fn on_then_off_restores_the_word() {
        let mut bank = LightBank::new();
        bank.toggle(Light::Blue, LightRequest::On);
        let before = bank.pending_word();
        bank.toggle(Light::Green, LightRequest::On);
        bank.toggle(Light::Green, LightRequest::Off);
        assert_eq!(bank.pending_word(), before);
    }

    #[test]
    fn toggle_request_resolves_against_current_state() {
        let mut bank = LightBank::new();
        assert_eq!(
            bank.toggle(Light::Yellow1, LightRequest::Toggle),
            Some(LightState::On)
        );
        assert_eq!(
            bank.toggle(Light::Yellow1, LightRequest::Toggle),
            Some(LightState::Off)
        );
        assert_eq!(bank.pending_word(), OutputWord::ALL_OFF);
    }

    #[test]
    fn fault_table_is_total_over_lanes() {
        for index in 0..PARTICIPANT_COUNT {
            let lane = Participant::from_index(index).expect("index should map to a lane");
            let light = fault_light_for(lane);
            assert!(light != ALERT_LIGHT, "alert lamp is shared, not a lane indicator");
        }
    }
}
