use cortex_m::interrupt;
use cortex_m::register::primask;
use critical_section::{self, RawRestoreState};
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_stm32 as hal;
use embassy_stm32::exti::ExtiInput;
use embassy_stm32::gpio::{Level, Output, Pull, Speed};
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;

use crate::hw::GpioRegisterBus;
use crate::lights::CommandQueue;
use crate::race::{BeginTimingSignal, RaceBridge, RaceStateCell};
use lights_core::controller::LightsController;

mod lights_task;
mod race_task;

critical_section::set_impl!(InterruptCriticalSection);

struct InterruptCriticalSection;

unsafe impl critical_section::Impl for InterruptCriticalSection {
    unsafe fn acquire() -> RawRestoreState {
        let primask = primask::read();
        interrupt::disable();
        primask.is_active()
    }

    unsafe fn release(restore_state: RawRestoreState) {
        if restore_state {
            unsafe {
                interrupt::enable();
            }
        }
    }
}

pub(super) static COMMAND_QUEUE: CommandQueue = Channel::new();
pub(super) static RACE_STATE: RaceStateCell = RaceStateCell::new();
pub(super) static BEGIN_TIMING: BeginTimingSignal = Signal::new();

#[embassy_executor::main]
pub async fn main(spawner: Spawner) {
    let config = hal::Config::default();
    let hal::Peripherals {
        PA0,
        PB0,
        PB1,
        PB2,
        EXTI0,
        ..
    } = hal::init(config);

    // 74HC595 control lines: ST_CP, SH_CP, DS.
    let bus = GpioRegisterBus::new(
        Output::new(PB0, Level::Low, Speed::Low),
        Output::new(PB1, Level::Low, Speed::Low),
        Output::new(PB2, Level::Low, Speed::Low),
    );
    let controller = LightsController::new(bus);

    let start_trigger = ExtiInput::new(PA0, EXTI0, Pull::Up);

    spawner
        .spawn(lights_task::run(
            controller,
            COMMAND_QUEUE.receiver(),
            RaceBridge::new(&RACE_STATE, &BEGIN_TIMING),
        ))
        .expect("failed to spawn lights task");

    spawner
        .spawn(race_task::run(
            start_trigger,
            &RACE_STATE,
            &BEGIN_TIMING,
            COMMAND_QUEUE.sender(),
        ))
        .expect("failed to spawn race timing task");

    core::future::pending::<()>().await;
}
