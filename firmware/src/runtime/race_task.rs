use embassy_futures::select::{Either, select};
use embassy_stm32::exti::ExtiInput;

use crate::lights::{CommandSender, LightCommand};
use crate::race::{BeginTimingSignal, RaceStateCell};
use lights_core::controller::RaceState;

/// Minimal race-timing engine driven by the remote start trigger.
///
/// A falling edge arms the start sequence; timing begins when the lights
/// task raises the begin-timing signal alongside the green light. A second
/// edge at any point, countdown included, stops the race and resets the
/// lamps.
#[embassy_executor::task]
pub async fn run(
    mut trigger: ExtiInput<'static>,
    state: &'static RaceStateCell,
    begin: &'static BeginTimingSignal,
    commands: CommandSender<'static>,
) -> ! {
    loop {
        trigger.wait_for_falling_edge().await;
        begin.reset();
        state.publish(RaceState::Starting);
        if commands.try_send(LightCommand::InitiateStartSequence).is_err() {
            defmt::warn!("race: command queue full, start request dropped");
            state.publish(RaceState::Stopped);
            continue;
        }
        defmt::info!("race: start requested");

        // The trigger stays live during the countdown so a second edge
        // aborts instead of queueing behind the go signal.
        match select(begin.wait(), trigger.wait_for_falling_edge()).await {
            Either::First(go_at) => {
                state.publish(RaceState::Running);
                defmt::info!(
                    "race: timing started t={=u64}us",
                    go_at.into_embassy().as_micros()
                );
                trigger.wait_for_falling_edge().await;
            }
            Either::Second(()) => {
                defmt::info!("race: aborted during countdown");
            }
        }

        state.publish(RaceState::Stopped);
        if commands.try_send(LightCommand::ResetLights).is_err() {
            defmt::warn!("race: command queue full, reset dropped");
        }
        defmt::info!("race: stopped");
    }
}
