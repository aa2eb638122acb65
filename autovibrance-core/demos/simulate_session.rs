//! Example: Simulate a game session against mock displays.
//!
//! Run with: `RUST_LOG=debug cargo run --example simulate_session`

use autovibrance_core::{
    Action, Config, ControlError, ControlLoop, DisplayWriter, LogOverlay, LuminanceSampler,
    MockGamma, MockProcess, MockScreen, MockVibrance, OperatingMode,
};

fn main() -> Result<(), ControlError> {
    env_logger::init();

    let config = Config::default();
    let game = config.target_process.clone();

    let screen = MockScreen::default();
    let gamma = MockGamma::with_displays(&["DISPLAY1", "DISPLAY2"]);
    let vibrance = MockVibrance::with_displays(&["GPU0"]);
    let process = MockProcess::new();

    let sampler = LuminanceSampler::new(Box::new(screen.clone()), &config);
    let writer = DisplayWriter::new(Box::new(gamma.clone())).with_vibrance(Box::new(vibrance.clone()));
    let mut control = ControlLoop::new(config, sampler, writer, Box::new(process.clone()))?
        .with_overlay(Box::new(LogOverlay::default()));

    control.start();
    println!("Idle: {:?}", control.effective_settings());

    // The game starts in a dark cave
    process.set_running(&game, true);
    control.coarse_tick();
    control.handle(Action::ToggleOverlay);
    screen.set_gray(30);
    for _ in 0..15 {
        if let Some(tick) = control.fine_tick() {
            println!(
                "brightness {:>5.1} -> target {:.2}, gamma {:.3}",
                tick.brightness, tick.target_gamma, tick.gamma
            );
        }
    }

    // ...then walks into daylight
    screen.set_gray(220);
    for _ in 0..15 {
        if let Some(tick) = control.fine_tick() {
            println!(
                "brightness {:>5.1} -> target {:.2}, gamma {:.3}",
                tick.brightness, tick.target_gamma, tick.gamma
            );
        }
    }

    control.handle(Action::SetMode(OperatingMode::Static));
    println!("Static: {:?}", control.effective_settings());
    println!("GPU0 vibrance: {:?}%", vibrance.level_of("GPU0"));

    process.set_running(&game, false);
    control.coarse_tick();
    println!("After exit: {:?}", control.effective_settings());

    control.shutdown();
    println!("DISPLAY1 neutral: {}", gamma.holds_gamma("DISPLAY1", 1.0));

    Ok(())
}
