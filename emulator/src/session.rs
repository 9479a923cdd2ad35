use std::ops::Add;
use std::time::Duration;

use crossterm::style::Stylize;

use lights_core::controller::{LightsController, OverallState, RaceState, RaceTimer};
use lights_core::lights::{ALL_LIGHTS, Light, LightRequest, LightState, Participant};
use lights_core::output::NoopBus;
use lights_core::telemetry::TelemetryInstant;

/// Simulated tick period, matching the firmware scheduler cadence.
const SIM_TICK: Duration = Duration::from_millis(10);

/// Upper bound for `run` so a stalled sequence cannot spin forever.
const RUN_LIMIT: Duration = Duration::from_secs(10);

pub const HELP_TOPICS: &[(&str, &str)] = &[
    (
        "start",
        "start                      - arm the red-yellow-yellow-green countdown",
    ),
    (
        "run",
        "run                        - advance time until the countdown finishes",
    ),
    (
        "tick",
        "tick [ms]                  - advance the simulated clock (default 100 ms)",
    ),
    (
        "fault",
        "fault <lane 1-4> [on|off|toggle] - drive a lane's fault indicator",
    ),
    (
        "light",
        "light <name> [on|off|toggle]     - drive a single lamp directly",
    ),
    (
        "reset",
        "reset                      - extinguish every lamp and stop the sequence",
    ),
    (
        "clear",
        "clear                      - drop pending transitions, keep lit lamps",
    ),
    (
        "status",
        "status                     - show controller, race, and lamp state",
    ),
    (
        "telemetry",
        "telemetry                  - dump the recorded event history",
    ),
    (
        "help",
        "help [topic]               - show help for a command",
    ),
];

/// Millisecond-resolution mock clock instant.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub struct SimInstant(u64);

impl SimInstant {
    pub const START: Self = Self(0);

    pub const fn as_millis(self) -> u64 {
        self.0
    }
}

impl Add<Duration> for SimInstant {
    type Output = Self;

    fn add(self, duration: Duration) -> Self {
        let millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        Self(self.0.saturating_add(millis))
    }
}

impl TelemetryInstant for SimInstant {
    fn saturating_duration_since(&self, earlier: Self) -> Duration {
        Duration::from_millis(self.0.saturating_sub(earlier.0))
    }
}

/// Stand-in race-timing engine with scripted state transitions.
struct SimRace {
    state: RaceState,
    timing_began_at: Option<SimInstant>,
}

impl SimRace {
    const fn new() -> Self {
        Self {
            state: RaceState::Stopped,
            timing_began_at: None,
        }
    }
}

impl RaceTimer for SimRace {
    type Instant = SimInstant;

    fn race_state(&self) -> RaceState {
        self.state
    }

    fn begin_timing(&mut self, now: SimInstant) {
        self.timing_began_at = Some(now);
        self.state = RaceState::Running;
    }
}

pub struct Session {
    controller: LightsController<NoopBus, SimInstant>,
    race: SimRace,
    now: SimInstant,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            controller: LightsController::new(NoopBus::new()),
            race: SimRace::new(),
            now: SimInstant::START,
        }
    }

    pub fn handle_command(&mut self, line: &str) -> Vec<String> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Vec::new();
        }

        let mut words = trimmed.split_whitespace();
        let Some(verb) = words.next() else {
            return Vec::new();
        };
        let args: Vec<&str> = words.collect();

        if verb.eq_ignore_ascii_case("help") {
            return help_lines(args.first().copied());
        }
        if verb.eq_ignore_ascii_case("start") {
            return self.handle_start();
        }
        if verb.eq_ignore_ascii_case("run") {
            return self.handle_run();
        }
        if verb.eq_ignore_ascii_case("tick") {
            return self.handle_tick(&args);
        }
        if verb.eq_ignore_ascii_case("fault") {
            return self.handle_fault(&args);
        }
        if verb.eq_ignore_ascii_case("light") {
            return self.handle_light(&args);
        }
        if verb.eq_ignore_ascii_case("reset") {
            return self.handle_reset();
        }
        if verb.eq_ignore_ascii_case("clear") {
            self.controller.clear_schedules();
            return vec!["Pending transitions dropped.".to_string()];
        }
        if verb.eq_ignore_ascii_case("status") {
            return self.handle_status();
        }
        if verb.eq_ignore_ascii_case("telemetry") {
            return self.handle_telemetry();
        }

        vec![format!(
            "Unknown command `{verb}`. Type `help` for the command list."
        )]
    }

    /// Advances the mock clock in firmware-sized ticks, reporting a rendered
    /// lamp row for every register commit along the way.
    fn advance(&mut self, span: Duration) -> Vec<String> {
        let mut lines = Vec::new();
        let deadline = self.now + span;
        while self.now < deadline {
            self.now = self.now + SIM_TICK;
            let before = self.controller.committed_word();
            self.controller.tick(self.now, &mut self.race);
            if self.controller.committed_word() != before {
                lines.push(self.render_bank());
            }
        }
        lines
    }

    fn handle_start(&mut self) -> Vec<String> {
        if self.controller.overall_state() != OverallState::Stopped {
            return vec!["Sequence already armed; `reset` first.".to_string()];
        }
        self.race.state = RaceState::Starting;
        self.race.timing_began_at = None;
        self.controller.initiate_start_sequence();
        vec![
            "Start sequence armed. Use `run` or `tick` to advance the clock.".to_string(),
        ]
    }

    fn handle_run(&mut self) -> Vec<String> {
        let mut lines = Vec::new();
        let deadline = self.now + RUN_LIMIT;
        while self.now < deadline {
            lines.extend(self.advance(SIM_TICK));
            let any_pending = ALL_LIGHTS
                .iter()
                .any(|channel| self.controller.schedule().has_pending(channel.id));
            if self.controller.overall_state() != OverallState::Starting && !any_pending {
                break;
            }
        }
        if let Some(at) = self.race.timing_began_at {
            lines.push(format!("Race timing started at t={} ms.", at.as_millis()));
        }
        lines.push(self.describe_state());
        lines
    }

    fn handle_tick(&mut self, args: &[&str]) -> Vec<String> {
        let millis = match args {
            [] => 100,
            [value] => match value.parse::<u64>() {
                Ok(millis) if millis > 0 => millis,
                _ => return vec![format!("Expected a positive millisecond count, got `{value}`.")],
            },
            _ => return vec!["Usage: tick [ms]".to_string()],
        };

        let mut lines = self.advance(Duration::from_millis(millis));
        lines.push(self.render_bank());
        lines
    }

    fn handle_fault(&mut self, args: &[&str]) -> Vec<String> {
        let (lane_arg, request) = match args {
            [lane] => (*lane, LightRequest::Toggle),
            [lane, request] => match parse_request(request) {
                Ok(parsed) => (*lane, parsed),
                Err(message) => return vec![message],
            },
            _ => return vec!["Usage: fault <lane 1-4> [on|off|toggle]".to_string()],
        };

        let Some(lane) = parse_lane(lane_arg) else {
            return vec![format!("Expected a lane between 1 and 4, got `{lane_arg}`.")];
        };

        self.controller.signal_fault(lane, request, self.now);
        let mut lines = self.advance(SIM_TICK);
        lines.push(self.render_bank());
        lines
    }

    fn handle_light(&mut self, args: &[&str]) -> Vec<String> {
        let (name, request) = match args {
            [name] => (*name, LightRequest::Toggle),
            [name, request] => match parse_request(request) {
                Ok(parsed) => (*name, parsed),
                Err(message) => return vec![message],
            },
            _ => return vec!["Usage: light <name> [on|off|toggle]".to_string()],
        };

        let Some(light) = parse_light(name) else {
            return vec![format!("Unknown light `{name}`.")];
        };

        self.controller.toggle_light(light, request, self.now);
        let mut lines = self.advance(SIM_TICK);
        lines.push(self.render_bank());
        lines
    }

    fn handle_reset(&mut self) -> Vec<String> {
        self.controller.reset_lights();
        self.race.state = RaceState::Stopped;
        self.race.timing_began_at = None;
        let mut lines = self.advance(SIM_TICK);
        lines.push(self.render_bank());
        lines
    }

    fn handle_status(&self) -> Vec<String> {
        let mut lines = vec![self.describe_state()];
        lines.push(format!(
            "Race engine: {}",
            describe_race_state(self.race.state)
        ));
        if let Some(at) = self.race.timing_began_at {
            lines.push(format!("Timing began at t={} ms.", at.as_millis()));
        }
        lines.push(format!(
            "Register word: {:#04x} (pending {:#04x})",
            self.controller.committed_word().map_or(0, |word| word.raw()),
            self.controller.pending_word().raw()
        ));
        lines.push(self.render_bank());
        lines
    }

    fn handle_telemetry(&self) -> Vec<String> {
        let telemetry = self.controller.telemetry();
        if telemetry.is_empty() {
            return vec!["No telemetry recorded yet.".to_string()];
        }

        let mut lines = Vec::with_capacity(telemetry.len());
        for record in telemetry.oldest_first() {
            lines.push(format!(
                "#{:03} t={:>6} ms {}",
                record.id,
                record.timestamp.as_millis(),
                record.event
            ));
        }
        lines
    }

    fn describe_state(&self) -> String {
        let state = match self.controller.overall_state() {
            OverallState::Stopped => "stopped",
            OverallState::Starting => "starting",
            OverallState::Started => "started",
        };
        format!("Controller: {state} at t={} ms.", self.now.as_millis())
    }

    fn render_bank(&self) -> String {
        let mut row = format!("[t={:>6} ms]", self.now.as_millis());
        for channel in &ALL_LIGHTS {
            let glyph = match self.controller.light_state(channel.id) {
                LightState::On => paint(channel.id, "\u{25cf}"),
                LightState::Off => "\u{25cb}".dark_grey().to_string(),
            };
            row.push_str(&format!("  {glyph} {}", channel.name));
        }
        row
    }

    #[cfg(test)]
    fn controller(&self) -> &LightsController<NoopBus, SimInstant> {
        &self.controller
    }
}

fn help_lines(topic: Option<&str>) -> Vec<String> {
    let mut lines = Vec::new();
    match topic {
        Some(target) if !target.is_empty() => {
            if let Some((_, detail)) = HELP_TOPICS
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(target))
            {
                lines.push((*detail).to_string());
            } else {
                lines.push(format!("No help available for `{target}`."));
            }
        }
        _ => {
            lines.push("Available commands:".to_string());
            for (_, detail) in HELP_TOPICS {
                lines.push(format!("  {detail}"));
            }
            lines.push("Type `help <topic>` for a specific command.".to_string());
        }
    }
    lines
}

fn paint(light: Light, glyph: &str) -> String {
    let styled = match light {
        Light::Alert => glyph.white(),
        Light::Red => glyph.red(),
        Light::Yellow1 | Light::Yellow2 => glyph.yellow(),
        Light::Blue => glyph.blue(),
        Light::Green => glyph.green(),
    };
    styled.to_string()
}

fn parse_lane(value: &str) -> Option<Participant> {
    let lane: usize = value.parse().ok()?;
    Participant::from_index(lane.checked_sub(1)?)
}

fn parse_light(value: &str) -> Option<Light> {
    ALL_LIGHTS
        .iter()
        .find(|channel| channel.name.eq_ignore_ascii_case(value))
        .map(|channel| channel.id)
}

fn parse_request(value: &str) -> Result<LightRequest, String> {
    if value.eq_ignore_ascii_case("on") {
        Ok(LightRequest::On)
    } else if value.eq_ignore_ascii_case("off") {
        Ok(LightRequest::Off)
    } else if value.eq_ignore_ascii_case("toggle") {
        Ok(LightRequest::Toggle)
    } else {
        Err(format!("Expected on, off, or toggle, got `{value}`."))
    }
}

fn describe_race_state(state: RaceState) -> &'static str {
    match state {
        RaceState::Stopped => "stopped",
        RaceState::Starting => "starting",
        RaceState::Running => "running",
    }
}
