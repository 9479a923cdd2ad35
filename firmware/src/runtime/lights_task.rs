use embassy_futures::select::{Either, select};
use embassy_time::{Duration, Ticker};

use crate::hw::GpioRegisterBus;
use crate::lights::{CommandReceiver, FirmwareInstant, LightCommand};
use crate::race::RaceBridge;
use lights_core::controller::LightsController;
use lights_core::lights::light_by_id;

/// Interval between scheduler passes. Light transitions land on 1 s
/// boundaries, so a 10 ms tick keeps worst-case jitter well below anything
/// a spectator could notice.
const TICK_PERIOD: Duration = Duration::from_millis(10);

type Controller = LightsController<GpioRegisterBus<'static>, FirmwareInstant>;

#[embassy_executor::task]
pub async fn run(
    mut controller: Controller,
    commands: CommandReceiver<'static>,
    mut race: RaceBridge<'static>,
) -> ! {
    let mut ticker = Ticker::every(TICK_PERIOD);
    loop {
        match select(ticker.next(), commands.receive()).await {
            Either::First(()) => {
                controller.tick(FirmwareInstant::now(), &mut race);
            }
            Either::Second(command) => {
                apply(&mut controller, command);
            }
        }
    }
}

fn apply(controller: &mut Controller, command: LightCommand) {
    match command {
        LightCommand::InitiateStartSequence => {
            defmt::info!("lights: start sequence requested");
            controller.initiate_start_sequence();
        }
        LightCommand::ResetLights => {
            defmt::info!("lights: reset");
            controller.reset_lights();
        }
        LightCommand::ClearSchedules => {
            defmt::info!("lights: pending transitions cleared");
            controller.clear_schedules();
        }
        LightCommand::SignalFault { lane, request } => {
            defmt::info!(
                "lights: fault request lane={=usize} light={=str}",
                lane.as_index() + 1,
                light_by_id(lights_core::lights::fault_light_for(lane)).name
            );
            controller.signal_fault(lane, request, FirmwareInstant::now());
        }
        LightCommand::ToggleLight { light, request } => {
            defmt::info!("lights: manual toggle {=str}", light_by_id(light).name);
            controller.toggle_light(light, request, FirmwareInstant::now());
        }
    }
}
