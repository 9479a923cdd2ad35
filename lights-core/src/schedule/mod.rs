//! Per-light transition deadlines evaluated once per tick.
//!
//! Each light owns two independent deadlines, one per edge, stored as
//! `Option<Instant>`. `None` is the explicit "no pending transition" marker;
//! there is no reserved timestamp value that could collide with a legitimate
//! tick time. The table is keyed by [`Light::as_index`], keeping O(1) access
//! without positional coupling to any other array.

use crate::lights::{ALL_LIGHTS, LIGHT_COUNT, Light, LightState};

/// Pending deadlines for a single light.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ScheduleEntry<Instant> {
    on_at: Option<Instant>,
    off_at: Option<Instant>,
}

impl<Instant> ScheduleEntry<Instant> {
    /// Entry with no pending transition on either edge.
    pub const EMPTY: Self = Self {
        on_at: None,
        off_at: None,
    };
}

impl<Instant: Copy> ScheduleEntry<Instant> {
    /// Returns `true` when either edge still has a deadline.
    pub const fn is_pending(&self) -> bool {
        self.on_at.is_some() || self.off_at.is_some()
    }
}

/// Deadline table covering every light channel.
#[derive(Clone, Debug)]
pub struct LightSchedule<Instant> {
    entries: [ScheduleEntry<Instant>; LIGHT_COUNT],
}

impl<Instant: Copy + Ord> LightSchedule<Instant> {
    /// Creates a schedule with no pending transitions.
    pub const fn new() -> Self {
        Self {
            entries: [ScheduleEntry::EMPTY; LIGHT_COUNT],
        }
    }

    /// Sets the ON deadline for a light, replacing any previous one.
    pub fn schedule_on(&mut self, light: Light, at: Instant) {
        self.entries[light.as_index()].on_at = Some(at);
    }

    /// Sets the OFF deadline for a light, replacing any previous one.
    pub fn schedule_off(&mut self, light: Light, at: Instant) {
        self.entries[light.as_index()].off_at = Some(at);
    }

    /// Drops both deadlines for a single light.
    pub fn clear(&mut self, light: Light) {
        self.entries[light.as_index()] = ScheduleEntry::EMPTY;
    }

    /// Drops every deadline in the table.
    pub fn clear_all(&mut self) {
        self.entries = [ScheduleEntry::EMPTY; LIGHT_COUNT];
    }

    /// The pending ON deadline for a light, if any.
    pub fn on_deadline(&self, light: Light) -> Option<Instant> {
        self.entries[light.as_index()].on_at
    }

    /// The pending OFF deadline for a light, if any.
    pub fn off_deadline(&self, light: Light) -> Option<Instant> {
        self.entries[light.as_index()].off_at
    }

    /// Returns `true` when the light still has a deadline on either edge.
    pub fn has_pending(&self, light: Light) -> bool {
        self.entries[light.as_index()].is_pending()
    }

    /// Fires every due transition and clears its deadline.
    ///
    /// A deadline is due once `now >= at`, so a transition scheduled for the
    /// current tick fires on that same tick. Both edges of one light are
    /// evaluated independently; the relative order between different lights
    /// is unspecified (their bits do not interact).
    pub fn drain_due<F>(&mut self, now: Instant, mut apply: F)
    where
        F: FnMut(Light, LightState),
    {
        for channel in ALL_LIGHTS {
            let entry = &mut self.entries[channel.id.as_index()];
            if let Some(at) = entry.on_at
                && now >= at
            {
                entry.on_at = None;
                apply(channel.id, LightState::On);
            }
            if let Some(at) = entry.off_at
                && now >= at
            {
                entry.off_at = None;
                apply(channel.id, LightState::Off);
            }
        }
    }
}

impl<Instant: Copy + Ord> Default for LightSchedule<Instant> {
    fn default() -> Self {
        Self::new()
    }
}
