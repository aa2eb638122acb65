use std::io::BufRead;
use std::time::Duration;

use autovibrance_core::{Action, ActionSender, Config, OperatingMode};
use clap::{Arg, ArgMatches, Command, value_parser};
use log::{error, warn};

#[cfg(windows)]
mod console;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let matches = cli().get_matches();
    let (config, mode) = config_from_matches(&matches);

    if let Err(e) = run(config, mode) {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn cli() -> Command {
    Command::new("autovibrance")
        .about("Boosts gamma and digital vibrance while a game is running")
        .arg(
            Arg::new("process")
                .short('p')
                .long("process")
                .value_name("NAME")
                .help("Target process name, without extension"),
        )
        .arg(
            Arg::new("mode")
                .short('m')
                .long("mode")
                .value_parser(value_parser!(OperatingMode))
                .help("Initial mode: off, static or dynamic"),
        )
        .arg(
            Arg::new("static-gamma")
                .long("static-gamma")
                .value_parser(value_parser!(f32))
                .help("Gamma held in static mode"),
        )
        .arg(
            Arg::new("idle-vibrance")
                .long("idle-vibrance")
                .value_parser(value_parser!(u8).range(0..=100))
                .help("Vibrance percent outside a game session"),
        )
        .arg(
            Arg::new("boosted-vibrance")
                .long("boosted-vibrance")
                .value_parser(value_parser!(u8).range(0..=100))
                .help("Vibrance percent during a game session"),
        )
        .arg(
            Arg::new("poll-ms")
                .long("poll-ms")
                .value_parser(value_parser!(u64))
                .help("Process poll period in milliseconds"),
        )
        .arg(
            Arg::new("sample-ms")
                .long("sample-ms")
                .value_parser(value_parser!(u64))
                .help("Brightness sampling period in milliseconds"),
        )
        .arg(
            Arg::new("smooth")
                .long("smooth")
                .value_parser(value_parser!(f32))
                .help("Smoothing factor between 0 and 1"),
        )
}

fn config_from_matches(matches: &ArgMatches) -> (Config, OperatingMode) {
    let mut config = Config::default();
    if let Some(name) = matches.get_one::<String>("process") {
        config.target_process = name.clone();
    }
    if let Some(&gamma) = matches.get_one::<f32>("static-gamma") {
        config.static_gamma = gamma;
    }
    if let Some(&percent) = matches.get_one::<u8>("idle-vibrance") {
        config.idle_vibrance = percent;
    }
    if let Some(&percent) = matches.get_one::<u8>("boosted-vibrance") {
        config.boosted_vibrance = percent;
    }
    if let Some(&ms) = matches.get_one::<u64>("poll-ms") {
        config.coarse_interval = Duration::from_millis(ms);
    }
    if let Some(&ms) = matches.get_one::<u64>("sample-ms") {
        config.fine_interval = Duration::from_millis(ms);
    }
    if let Some(&factor) = matches.get_one::<f32>("smooth") {
        config.smooth_factor = factor;
    }
    let mode = matches.get_one::<OperatingMode>("mode").copied().unwrap_or_default();
    (config, mode)
}

/// A line typed on stdin.
#[cfg_attr(not(windows), allow(dead_code))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Input {
    Action(Action),
    Quit,
}

#[cfg_attr(not(windows), allow(dead_code))]
fn parse_input(line: &str) -> Result<Input, String> {
    let mut words = line.split_whitespace();
    let input = match words.next().map(str::to_ascii_lowercase).as_deref() {
        Some("toggle") => Input::Action(Action::ToggleEnabled),
        Some("vibrance") => Input::Action(Action::ToggleVibranceBoost),
        Some("overlay") => Input::Action(Action::ToggleOverlay),
        Some("mode") => {
            let mode = words.next().ok_or("usage: mode off|static|dynamic")?;
            Input::Action(Action::SetMode(mode.parse()?))
        }
        Some("quit") | Some("exit") => Input::Quit,
        Some(other) => return Err(format!("unknown command '{other}'")),
        None => return Err("empty command".to_string()),
    };
    Ok(input)
}

/// Forward commands from `input` until `quit`, end of input or a read error,
/// then ask the worker to revert and stop.
#[cfg_attr(not(windows), allow(dead_code))]
fn feed_commands<R: BufRead>(input: R, actions: &ActionSender) {
    for line in input.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!("cannot read command input: {}", e);
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        match parse_input(&line) {
            Ok(Input::Action(action)) => {
                if !actions.send(action) {
                    break;
                }
            }
            Ok(Input::Quit) => break,
            Err(e) => warn!("{}", e),
        }
    }
    actions.shutdown();
}

#[cfg(windows)]
fn run(config: Config, mode: OperatingMode) -> Result<(), autovibrance_core::ControlError> {
    use autovibrance_core::platform::{GdiCapture, GdiGamma, InstanceGuard, NvVibrance, ToolhelpProbe};
    use autovibrance_core::{ControlLoop, DisplayWriter, LogOverlay, LuminanceSampler, Scheduler};
    use log::info;

    const INSTANCE_NAME: &str = "AutoVibranceInstance";

    let _guard = InstanceGuard::acquire(INSTANCE_NAME)?;

    let sampler = LuminanceSampler::new(Box::new(GdiCapture::new()), &config);
    let writer = DisplayWriter::new(Box::new(GdiGamma::new()));
    let writer = match NvVibrance::new() {
        Ok(nvapi) => writer.with_vibrance(Box::new(nvapi)),
        Err(e) => writer.without_vibrance(&e),
    };
    let control = ControlLoop::new(config, sampler, writer, Box::new(ToolhelpProbe::new()))?
        .with_overlay(Box::new(LogOverlay::default()));

    let scheduler = Scheduler::new(control);
    let actions = scheduler.sender();
    let worker = std::thread::spawn(move || scheduler.run());

    if let Err(e) = console::install(actions.clone()) {
        warn!("Ctrl+C and console close will not revert the displays: {}", e);
    }

    if mode != OperatingMode::default() {
        actions.send(Action::SetMode(mode));
    }

    info!("commands: toggle, mode off|static|dynamic, vibrance, overlay, quit");
    // a blocked stdin read must not hold up a console-initiated shutdown
    std::thread::spawn(move || feed_commands(std::io::stdin().lock(), &actions));

    let joined = worker.join();
    console::mark_reverted();
    if joined.is_err() {
        error!("control worker panicked");
    }
    Ok(())
}

#[cfg(not(windows))]
fn run(config: Config, mode: OperatingMode) -> Result<(), autovibrance_core::ControlError> {
    Err(autovibrance_core::ControlError::DisplayEnumeration(format!(
        "watching '{}' in {} mode needs the Windows display backends",
        config.target_process, mode
    )))
}
