//! Bit-serial output stage for the 74HC595 light register.
//!
//! The register is wired behind three logical lines (latch, clock, data).
//! Committing a word means pulling the latch low, shifting the eight bits out
//! MSB-first on the clock, then raising the latch again. The [`RegisterBus`]
//! trait is the only seam the firmware has to implement; host tests and the
//! emulator substitute recording buses.

use crate::lights::OutputWord;

/// Logic level driven onto a register line.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum LineLevel {
    Low,
    High,
}

impl LineLevel {
    /// Level representing a set data bit.
    pub const fn from_bit(bit: bool) -> Self {
        if bit { LineLevel::High } else { LineLevel::Low }
    }
}

/// Abstraction over the three register lines.
///
/// Implementations must apply each call immediately; the shift protocol
/// depends on the latch/clock/data ordering below and assumes no other code
/// drives the same lines.
pub trait RegisterBus {
    /// Drives the storage-register latch line (ST_CP).
    fn set_latch(&mut self, level: LineLevel);

    /// Drives the shift clock line (SH_CP).
    fn set_clock(&mut self, level: LineLevel);

    /// Drives the serial data line (DS).
    fn set_data(&mut self, level: LineLevel);
}

/// Register bus that performs no hardware interaction.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoopBus;

impl NoopBus {
    /// Creates a new no-op bus.
    pub const fn new() -> Self {
        Self
    }
}

impl RegisterBus for NoopBus {
    fn set_latch(&mut self, _: LineLevel) {}

    fn set_clock(&mut self, _: LineLevel) {}

    fn set_data(&mut self, _: LineLevel) {}
}

/// Owns the latch/shift/latch wire protocol for one register.
#[derive(Debug)]
pub struct ShiftRegister<B> {
    bus: B,
}

impl<B: RegisterBus> ShiftRegister<B> {
    /// Wraps a bus. The lines are assumed to idle with the latch high and the
    /// clock low.
    pub const fn new(bus: B) -> Self {
        Self { bus }
    }

    /// Shifts the word out MSB-first and latches it into the outputs.
    ///
    /// The latch-low / shift / latch-high run is uninterrupted; callers must
    /// not interleave other traffic on the same lines.
    pub fn commit(&mut self, word: OutputWord) {
        self.bus.set_latch(LineLevel::Low);
        for bit in (0..u8::BITS).rev() {
            let set = word.raw() & (1u8 << bit) != 0;
            self.bus.set_data(LineLevel::from_bit(set));
            self.bus.set_clock(LineLevel::High);
            self.bus.set_clock(LineLevel::Low);
        }
        self.bus.set_latch(LineLevel::High);
    }

    /// Provides access to the wrapped bus.
    pub fn bus(&self) -> &B {
        &self.bus
    }

    /// Provides mutable access to the wrapped bus.
    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }
}

/// Coalescing front of the shift register.
///
/// Tracks the last word actually transmitted so a flush only touches the
/// hardware when the pending word diverges from it. Nothing has been written
/// before the first flush, so that one always commits.
#[derive(Debug)]
pub struct OutputStage<B> {
    register: ShiftRegister<B>,
    committed: Option<OutputWord>,
}

impl<B: RegisterBus> OutputStage<B> {
    /// Creates an output stage that has not transmitted anything yet.
    pub const fn new(bus: B) -> Self {
        Self {
            register: ShiftRegister::new(bus),
            committed: None,
        }
    }

    /// Commits `pending` if it differs from the last transmitted word.
    ///
    /// Returns `true` when a hardware transaction took place.
    pub fn flush(&mut self, pending: OutputWord) -> bool {
        if self.committed == Some(pending) {
            return false;
        }
        self.register.commit(pending);
        self.committed = Some(pending);
        true
    }

    /// The last word transmitted, if any.
    pub const fn committed(&self) -> Option<OutputWord> {
        self.committed
    }

    /// Provides access to the wrapped bus.
    pub fn bus(&self) -> &B {
        self.register.bus()
    }

    /// Provides mutable access to the wrapped bus.
    pub fn bus_mut(&mut self) -> &mut B {
        self.register.bus_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lights::Light;
    use heapless::Vec;

    /// Records every line edge so tests can assert on the exact wire order.
    #[derive(Debug, Default)]
    struct RecordingBus {
        edges: Vec<(u8, LineLevel), 64>,
    }

    const LATCH: u8 = 0;
    const CLOCK: u8 = 1;
    const DATA: u8 = 2;

    impl RegisterBus for RecordingBus {
        fn set_latch(&mut self, level: LineLevel) {
            self.edges.push((LATCH, level)).unwrap();
        }

        fn set_clock(&mut self, level: LineLevel) {
            self.edges.push((CLOCK, level)).unwrap();
        }

        fn set_data(&mut self, level: LineLevel) {
            self.edges.push((DATA, level)).unwrap();
        }
    }

    impl RecordingBus {
        /// Replays the recorded edges through a model of the 74HC595.
        fn decoded_word(&self) -> u8 {
            let mut shift = 0u8;
            let mut data = false;
            let mut clock = LineLevel::Low;
            let mut latched = 0u8;
            for &(line, level) in &self.edges {
                match line {
                    DATA => data = level == LineLevel::High,
                    CLOCK => {
                        if clock == LineLevel::Low && level == LineLevel::High {
                            shift = (shift << 1) | u8::from(data);
                        }
                        clock = level;
                    }
                    _ => {
                        if level == LineLevel::High {
                            latched = shift;
                        }
                    }
                }
            }
            latched
        }

        fn transactions(&self) -> usize {
            self.edges
                .iter()
                .filter(|&&(line, level)| line == LATCH && level == LineLevel::High)
                .count()
        }
    }

    #[test]
    fn commit_shifts_msb_first_between_latch_edges() {
        let mut register = ShiftRegister::new(RecordingBus::default());
        let word = OutputWord::ALL_OFF
            .with(Light::Alert, crate::lights::LightState::On)
            .with(Light::Green, crate::lights::LightState::On);
        register.commit(word);

        let bus = register.bus();
        assert_eq!(bus.edges.first(), Some(&(LATCH, LineLevel::Low)));
        assert_eq!(bus.edges.last(), Some(&(LATCH, LineLevel::High)));
        assert_eq!(bus.decoded_word(), word.raw());
    }

    #[test]
    fn first_flush_always_commits() {
        let mut stage = OutputStage::new(RecordingBus::default());
        assert!(stage.flush(OutputWord::ALL_OFF));
        assert_eq!(stage.committed(), Some(OutputWord::ALL_OFF));
        assert_eq!(stage.bus().transactions(), 1);
    }

    #[test]
    fn unchanged_word_is_not_retransmitted() {
        let mut stage = OutputStage::new(RecordingBus::default());
        let word = OutputWord::from_raw(Light::Red.mask());
        assert!(stage.flush(word));
        assert!(!stage.flush(word));
        assert!(!stage.flush(word));
        assert_eq!(stage.bus().transactions(), 1);
    }

    #[test]
    fn changed_word_commits_again() {
        let mut stage = OutputStage::new(RecordingBus::default());
        stage.flush(OutputWord::from_raw(Light::Red.mask()));
        assert!(stage.flush(OutputWord::ALL_OFF));
        assert_eq!(stage.bus().transactions(), 2);
    }
}
