//! The control loop state machine.

use log::{debug, info};

use crate::config::Config;
use crate::display::DisplayWriter;
use crate::error::ControlError;
use crate::gamma::{GammaMapper, GammaSmoother, NEUTRAL_GAMMA};
use crate::modes::{Action, OperatingMode};
use crate::process::ProcessProbe;
use crate::sampler::LuminanceSampler;
use crate::sink::{LogStatusSink, OverlaySink, StatusSink};
use crate::state::{ControlState, EffectiveSettings, StatusReport, resolve_effective};

/// Values computed by one fine tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FineTick {
    /// Sampled brightness (0-255).
    pub brightness: f32,
    /// Gamma the mapper asked for.
    pub target_gamma: f32,
    /// Smoothed gamma actually written.
    pub gamma: f32,
}

/// Owns the control state and decides what the displays show.
///
/// Every entry point ([`coarse_tick`](Self::coarse_tick),
/// [`fine_tick`](Self::fine_tick), [`handle`](Self::handle),
/// [`shutdown`](Self::shutdown)) runs to completion, display writes
/// included, before returning. Whether the fine loop runs is derived from
/// [`ControlState::fine_loop_should_run`] after every transition.
pub struct ControlLoop {
    config: Config,
    state: ControlState,
    fine_active: bool,
    mapper: GammaMapper,
    smoother: GammaSmoother,
    sampler: LuminanceSampler,
    writer: DisplayWriter,
    probe: Box<dyn ProcessProbe>,
    status: Box<dyn StatusSink>,
    overlay: Option<Box<dyn OverlaySink>>,
    last_status: Option<StatusReport>,
}

impl ControlLoop {
    /// Create a loop in the initial state: enabled, target not running,
    /// dynamic mode.
    ///
    /// # Errors
    /// Returns [`ControlError::InvalidConfig`] if `config` fails validation.
    pub fn new(
        config: Config,
        sampler: LuminanceSampler,
        writer: DisplayWriter,
        probe: Box<dyn ProcessProbe>,
    ) -> Result<Self, ControlError> {
        config.validate()?;
        Ok(Self {
            mapper: GammaMapper::from_config(&config),
            smoother: GammaSmoother::new(config.smooth_factor),
            config,
            state: ControlState::default(),
            fine_active: false,
            sampler,
            writer,
            probe,
            status: Box::new(LogStatusSink),
            overlay: None,
            last_status: None,
        })
    }

    /// Replace the default logging status sink.
    pub fn with_status_sink(mut self, sink: Box<dyn StatusSink>) -> Self {
        self.status = sink;
        self
    }

    /// Attach an overlay.
    pub fn with_overlay(mut self, mut overlay: Box<dyn OverlaySink>) -> Self {
        overlay.set_visible(self.state.overlay_visible);
        self.overlay = Some(overlay);
        self
    }

    /// The configuration in use.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Current control flags.
    pub fn state(&self) -> ControlState {
        self.state
    }

    /// Whether fine ticks currently do anything.
    pub fn is_fine_loop_active(&self) -> bool {
        self.fine_active
    }

    /// The smoother's last value.
    pub fn smoothed_gamma(&self) -> f32 {
        self.smoother.peek()
    }

    /// The settings the displays should hold right now.
    pub fn effective_settings(&self) -> EffectiveSettings {
        resolve_effective(&self.state, &self.config, self.smoother.peek())
    }

    /// Revert the displays to neutral and poll the target process once.
    pub fn start(&mut self) {
        info!(
            "starting: watching '{}' every {:?}",
            self.config.target_process, self.config.coarse_interval
        );
        self.writer.apply_both(NEUTRAL_GAMMA, self.config.idle_vibrance);
        self.coarse_tick();
    }

    /// Poll the target process and re-apply the effective settings.
    pub fn coarse_tick(&mut self) {
        let running = self.probe.is_running(&self.config.target_process);
        if running != self.state.target_running {
            self.on_process_state_changed(running);
        } else {
            self.apply_current_settings();
        }
    }

    /// Sample, map, smooth and write one gamma step.
    ///
    /// Returns `None` without touching anything when the fine loop is not
    /// active, so a tick scheduled before a deactivation never applies.
    pub fn fine_tick(&mut self) -> Option<FineTick> {
        if !self.fine_active {
            return None;
        }

        let brightness = self.sampler.sample();
        let target_gamma = self.mapper.map(brightness);
        let gamma = self.smoother.update(target_gamma);
        self.writer.apply_gamma(gamma);

        if self.state.overlay_visible {
            if let Some(overlay) = self.overlay.as_mut() {
                overlay.update(gamma, brightness);
            }
        }

        Some(FineTick {
            brightness,
            target_gamma,
            gamma,
        })
    }

    /// Handle one discrete action.
    pub fn handle(&mut self, action: Action) {
        debug!("action: {:?}", action);
        match action {
            Action::ToggleEnabled => {
                self.state.enabled = !self.state.enabled;
                if self.state.enabled {
                    info!("enabled");
                    self.state.target_running = self.probe.is_running(&self.config.target_process);
                    self.smoother.reset();
                } else {
                    info!("disabled");
                }
                self.sync_fine_loop();
                self.apply_current_settings();
            }

            Action::SetMode(mode) => {
                if mode != self.state.mode {
                    info!("mode {} -> {}", self.state.mode, mode);
                    self.state.mode = mode;
                    self.smoother.reset();
                }
                self.sync_fine_loop();
                self.apply_current_settings();
            }

            Action::ToggleVibranceBoost => {
                self.state.vibrance_boost = !self.state.vibrance_boost;
                info!(
                    "vibrance boost {}",
                    if self.state.vibrance_boost { "on" } else { "off" }
                );
                self.apply_current_settings();
            }

            Action::ToggleOverlay => {
                self.state.overlay_visible = !self.state.overlay_visible;
                if let Some(overlay) = self.overlay.as_mut() {
                    overlay.set_visible(self.state.overlay_visible);
                }
                let settings = self.effective_settings();
                self.publish_status(&settings);
            }
        }
    }

    /// Stop the fine loop and revert the displays to neutral.
    ///
    /// Write failures are logged and otherwise ignored.
    pub fn shutdown(&mut self) {
        info!("shutting down, reverting displays");
        self.fine_active = false;
        self.smoother.reset();
        let (gamma, vibrance) = self.writer.apply_both(NEUTRAL_GAMMA, self.config.idle_vibrance);
        if gamma.failed() > 0 || vibrance.failed() > 0 {
            debug!(
                "revert incomplete: {} gamma and {} vibrance write(s) failed",
                gamma.failed(),
                vibrance.failed()
            );
        }
    }

    fn on_process_state_changed(&mut self, running: bool) {
        if running {
            info!("'{}' started", self.config.target_process);
        } else {
            info!("'{}' stopped", self.config.target_process);
        }
        self.state.target_running = running;
        self.smoother.reset();
        self.sync_fine_loop();
        self.apply_current_settings();
    }

    /// Bring `fine_active` in line with the state, resetting the smoother on
    /// every start or stop.
    fn sync_fine_loop(&mut self) {
        let should_run = self.state.fine_loop_should_run();
        if should_run == self.fine_active {
            return;
        }
        self.smoother.reset();
        self.fine_active = should_run;
        info!("fine loop {}", if should_run { "started" } else { "stopped" });
    }

    fn apply_current_settings(&mut self) {
        let settings = self.effective_settings();
        if self.fine_active {
            // the fine loop owns gamma
            self.writer.apply_vibrance(settings.vibrance);
        } else {
            self.writer.apply_both(settings.gamma, settings.vibrance);
        }
        self.publish_status(&settings);
    }

    fn publish_status(&mut self, settings: &EffectiveSettings) {
        let report = StatusReport::new(&self.state, settings);
        if self.last_status.as_ref() == Some(&report) {
            return;
        }
        self.status.publish(&report);
        self.last_status = Some(report);
    }
}

impl std::fmt::Debug for ControlLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControlLoop")
            .field("state", &self.state)
            .field("fine_active", &self.fine_active)
            .field("smoothed_gamma", &self.smoother.peek())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockGamma, MockProcess, MockScreen, MockVibrance, RecordingOverlay, RecordingStatus};

    const GAME: &str = "PioneerGame";

    struct Rig {
        control: ControlLoop,
        screen: MockScreen,
        gamma: MockGamma,
        vibrance: MockVibrance,
        process: MockProcess,
        status: RecordingStatus,
        overlay: RecordingOverlay,
    }

    fn rig() -> Rig {
        let config = Config::default();
        let screen = MockScreen::default();
        let gamma = MockGamma::with_displays(&["DISPLAY1", "DISPLAY2"]);
        let vibrance = MockVibrance::with_displays(&["GPU0"]);
        let process = MockProcess::new();
        let status = RecordingStatus::default();
        let overlay = RecordingOverlay::default();

        let sampler = LuminanceSampler::new(Box::new(screen.clone()), &config);
        let writer = DisplayWriter::new(Box::new(gamma.clone())).with_vibrance(Box::new(vibrance.clone()));
        let control = ControlLoop::new(config, sampler, writer, Box::new(process.clone()))
            .unwrap()
            .with_status_sink(Box::new(status.clone()))
            .with_overlay(Box::new(overlay.clone()));

        Rig {
            control,
            screen,
            gamma,
            vibrance,
            process,
            status,
            overlay,
        }
    }

    impl Rig {
        fn assert_displays(&self, gamma: f32, vibrance: u8) {
            assert!(self.gamma.holds_gamma("DISPLAY1", gamma), "DISPLAY1 not at {gamma}");
            assert!(self.gamma.holds_gamma("DISPLAY2", gamma), "DISPLAY2 not at {gamma}");
            assert_eq!(self.vibrance.level_of("GPU0"), Some(vibrance));
        }
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = Config {
            min_gamma: 3.0,
            ..Default::default()
        };
        let sampler = LuminanceSampler::new(Box::new(MockScreen::default()), &config);
        let writer = DisplayWriter::new(Box::new(MockGamma::default()));
        assert!(ControlLoop::new(config, sampler, writer, Box::new(MockProcess::new())).is_err());
    }

    #[test]
    fn test_start_reverts_and_polls() {
        let mut rig = rig();
        rig.process.set_running(GAME, true);
        rig.control.start();

        assert!(rig.control.state().target_running);
        assert!(rig.control.is_fine_loop_active());
        rig.assert_displays(1.0, 60);
    }

    #[test]
    fn test_fine_tick_idle_is_noop() {
        let mut rig = rig();
        rig.control.start();
        let writes = rig.gamma.write_count();
        assert_eq!(rig.control.fine_tick(), None);
        assert_eq!(rig.gamma.write_count(), writes);
        assert_eq!(rig.screen.capture_count(), 0);
    }

    #[test]
    fn test_fine_ticks_follow_brightness() {
        let mut rig = rig();
        rig.process.set_running(GAME, true);
        rig.control.start();

        rig.screen.set_gray(200);
        let tick = rig.control.fine_tick().unwrap();
        assert_eq!(tick.target_gamma, 1.0);
        assert_eq!(tick.gamma, 1.0);

        rig.screen.set_gray(20);
        let mut last = 1.0;
        for _ in 0..50 {
            let tick = rig.control.fine_tick().unwrap();
            assert_eq!(tick.target_gamma, 2.0);
            assert!(tick.gamma > last);
            last = tick.gamma;
        }
        assert!(rig.gamma.holds_gamma("DISPLAY1", last));
        assert_eq!(rig.control.smoothed_gamma(), last);
    }

    #[test]
    fn test_mode_switches() {
        let mut rig = rig();
        rig.process.set_running(GAME, true);
        rig.control.start();
        rig.screen.set_gray(20);
        rig.control.fine_tick();

        rig.control.handle(Action::SetMode(OperatingMode::Static));
        assert!(!rig.control.is_fine_loop_active());
        assert_eq!(rig.control.smoothed_gamma(), 1.0);
        rig.assert_displays(1.70, 60);

        rig.control.handle(Action::SetMode(OperatingMode::Off));
        rig.assert_displays(1.0, 60);

        rig.control.handle(Action::SetMode(OperatingMode::Dynamic));
        assert!(rig.control.is_fine_loop_active());
        let tick = rig.control.fine_tick().unwrap();
        assert!((tick.gamma - 1.1).abs() < 1e-6);
    }

    #[test]
    fn test_mode_change_while_idle_keeps_baseline() {
        let mut rig = rig();
        rig.control.start();
        rig.control.handle(Action::SetMode(OperatingMode::Static));
        assert!(!rig.control.is_fine_loop_active());
        rig.assert_displays(1.0, 50);
    }

    #[test]
    fn test_vibrance_boost_toggle() {
        let mut rig = rig();
        rig.process.set_running(GAME, true);
        rig.control.start();
        rig.assert_displays(1.0, 60);

        rig.control.handle(Action::ToggleVibranceBoost);
        assert_eq!(rig.vibrance.level_of("GPU0"), Some(50));
        assert!(!rig.status.last().unwrap().vibrance_boost);

        rig.control.handle(Action::ToggleVibranceBoost);
        assert_eq!(rig.vibrance.level_of("GPU0"), Some(60));
    }

    #[test]
    fn test_enable_requeries_process() {
        let mut rig = rig();
        rig.control.start();
        rig.control.handle(Action::ToggleEnabled);
        assert!(!rig.control.state().enabled);

        // the game starts while disabled and is picked up on re-enable
        rig.process.set_running(GAME, true);
        rig.control.handle(Action::ToggleEnabled);
        assert!(rig.control.state().target_running);
        assert!(rig.control.is_fine_loop_active());
        assert_eq!(rig.vibrance.level_of("GPU0"), Some(60));
    }

    #[test]
    fn test_overlay_receives_fine_ticks_only_when_visible() {
        let mut rig = rig();
        rig.process.set_running(GAME, true);
        rig.control.start();
        rig.screen.set_gray(40);

        rig.control.fine_tick();
        assert!(rig.overlay.updates().is_empty());

        rig.control.handle(Action::ToggleOverlay);
        assert!(rig.overlay.is_visible());
        assert!(rig.status.last().unwrap().overlay_visible);
        rig.control.fine_tick();
        let updates = rig.overlay.updates();
        assert_eq!(updates.len(), 1);
        assert!((updates[0].1 - 40.0).abs() < 1e-3);

        rig.control.handle(Action::ToggleOverlay);
        assert!(!rig.overlay.is_visible());
    }

    #[test]
    fn test_status_is_deduplicated() {
        let mut rig = rig();
        rig.control.start();
        rig.control.coarse_tick();
        rig.control.coarse_tick();
        let reports = rig.status.reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].text, "Idle - Gamma: 1.00, Vibrance: 50%");

        rig.process.set_running(GAME, true);
        rig.control.coarse_tick();
        assert_eq!(
            rig.status.last().unwrap().text,
            "Game Active - Dynamic Gamma, Vibrance: 60%"
        );
    }

    #[test]
    fn test_coarse_tick_heals_failed_display() {
        let mut rig = rig();
        rig.control.start();
        rig.control.handle(Action::SetMode(OperatingMode::Static));

        rig.gamma.fail_display("DISPLAY2");
        rig.process.set_running(GAME, true);
        rig.control.coarse_tick();
        assert!(rig.gamma.holds_gamma("DISPLAY1", 1.70));
        assert!(rig.gamma.holds_gamma("DISPLAY2", 1.0));

        rig.gamma.heal_display("DISPLAY2");
        rig.control.coarse_tick();
        assert!(rig.gamma.holds_gamma("DISPLAY2", 1.70));
    }

    #[test]
    fn test_shutdown_reverts() {
        let mut rig = rig();
        rig.process.set_running(GAME, true);
        rig.control.start();
        rig.control.handle(Action::SetMode(OperatingMode::Static));
        rig.assert_displays(1.70, 60);

        rig.control.shutdown();
        assert!(!rig.control.is_fine_loop_active());
        rig.assert_displays(1.0, 50);
    }
}
