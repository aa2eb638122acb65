//! Control state, effective-settings resolution and status reports.

use crate::config::Config;
use crate::gamma::NEUTRAL_GAMMA;
use crate::modes::OperatingMode;

/// A snapshot of the control loop's flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlState {
    /// Master enable flag.
    pub enabled: bool,
    /// Whether the target process was running at the last poll.
    pub target_running: bool,
    /// Current operating mode.
    pub mode: OperatingMode,
    /// Whether the boosted vibrance is used while the target runs.
    pub vibrance_boost: bool,
    /// Whether the overlay is shown.
    pub overlay_visible: bool,
}

impl Default for ControlState {
    fn default() -> Self {
        Self {
            enabled: true,
            target_running: false,
            mode: OperatingMode::Dynamic,
            vibrance_boost: true,
            overlay_visible: false,
        }
    }
}

impl ControlState {
    /// Whether the fine sampling loop must run in this state.
    pub fn fine_loop_should_run(&self) -> bool {
        self.enabled && self.target_running && self.mode == OperatingMode::Dynamic
    }

    /// Whether the boost applies at all (enabled and target running).
    pub fn is_boosting(&self) -> bool {
        self.enabled && self.target_running
    }
}

/// The gamma and vibrance the displays should currently hold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectiveSettings {
    /// Display gamma.
    pub gamma: f32,
    /// Vibrance percent.
    pub vibrance: u8,
}

/// Resolve what the displays should show for `state`.
///
/// `smoothed_gamma` is the smoother's last value, used in dynamic mode.
pub fn resolve_effective(state: &ControlState, config: &Config, smoothed_gamma: f32) -> EffectiveSettings {
    if !state.is_boosting() {
        return EffectiveSettings {
            gamma: NEUTRAL_GAMMA,
            vibrance: config.idle_vibrance,
        };
    }

    let vibrance = if state.vibrance_boost {
        config.boosted_vibrance
    } else {
        config.idle_vibrance
    };
    let gamma = match state.mode {
        OperatingMode::Off => NEUTRAL_GAMMA,
        OperatingMode::Static => config.static_gamma,
        OperatingMode::Dynamic => smoothed_gamma,
    };
    EffectiveSettings { gamma, vibrance }
}

/// What the presentation layer is told after every change.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusReport {
    /// Short human-readable status line.
    pub text: String,
    /// Master enable flag.
    pub enabled: bool,
    /// Whether the target process is running.
    pub target_running: bool,
    /// Current operating mode.
    pub mode: OperatingMode,
    /// Whether vibrance boost is on.
    pub vibrance_boost: bool,
    /// Whether the overlay is shown.
    pub overlay_visible: bool,
}

impl StatusReport {
    /// Build the report for `state` holding `settings`.
    pub fn new(state: &ControlState, settings: &EffectiveSettings) -> Self {
        Self {
            text: status_text(state, settings),
            enabled: state.enabled,
            target_running: state.target_running,
            mode: state.mode,
            vibrance_boost: state.vibrance_boost,
            overlay_visible: state.overlay_visible,
        }
    }
}

fn status_text(state: &ControlState, settings: &EffectiveSettings) -> String {
    if !state.enabled {
        return format!(
            "Disabled - Gamma: {:.2}, Vibrance: {}%",
            settings.gamma, settings.vibrance
        );
    }
    if !state.target_running {
        return format!(
            "Idle - Gamma: {:.2}, Vibrance: {}%",
            settings.gamma, settings.vibrance
        );
    }
    match state.mode {
        OperatingMode::Dynamic => format!("Game Active - Dynamic Gamma, Vibrance: {}%", settings.vibrance),
        _ => format!(
            "Game Active - Gamma: {:.2}, Vibrance: {}%",
            settings.gamma, settings.vibrance
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn running(mode: OperatingMode, vibrance_boost: bool) -> ControlState {
        ControlState {
            target_running: true,
            mode,
            vibrance_boost,
            ..Default::default()
        }
    }

    #[test]
    fn test_idle_settings() {
        let config = Config::default();
        let state = ControlState::default();
        let settings = resolve_effective(&state, &config, 1.9);
        assert_eq!(settings, EffectiveSettings { gamma: 1.0, vibrance: 50 });
    }

    #[test]
    fn test_disabled_overrides_everything() {
        let config = Config::default();
        let state = ControlState {
            enabled: false,
            ..running(OperatingMode::Static, true)
        };
        let settings = resolve_effective(&state, &config, 1.9);
        assert_eq!(settings, EffectiveSettings { gamma: 1.0, vibrance: 50 });
        assert!(!state.fine_loop_should_run());
    }

    #[test]
    fn test_running_settings_per_mode() {
        let config = Config::default();

        let off = resolve_effective(&running(OperatingMode::Off, true), &config, 1.9);
        assert_eq!(off, EffectiveSettings { gamma: 1.0, vibrance: 60 });

        let fixed = resolve_effective(&running(OperatingMode::Static, true), &config, 1.9);
        assert_eq!(fixed, EffectiveSettings { gamma: 1.70, vibrance: 60 });

        let dynamic = resolve_effective(&running(OperatingMode::Dynamic, false), &config, 1.9);
        assert_eq!(dynamic, EffectiveSettings { gamma: 1.9, vibrance: 50 });
    }

    #[test]
    fn test_fine_loop_predicate() {
        assert!(running(OperatingMode::Dynamic, true).fine_loop_should_run());
        assert!(!running(OperatingMode::Static, true).fine_loop_should_run());
        assert!(!ControlState::default().fine_loop_should_run());
    }

    #[test]
    fn test_status_text() {
        let config = Config::default();
        let report = |state: ControlState| {
            StatusReport::new(&state, &resolve_effective(&state, &config, 1.0)).text
        };

        assert_eq!(report(ControlState::default()), "Idle - Gamma: 1.00, Vibrance: 50%");
        assert_eq!(
            report(running(OperatingMode::Static, true)),
            "Game Active - Gamma: 1.70, Vibrance: 60%"
        );
        assert_eq!(
            report(running(OperatingMode::Dynamic, true)),
            "Game Active - Dynamic Gamma, Vibrance: 60%"
        );
        assert_eq!(
            report(ControlState {
                enabled: false,
                ..Default::default()
            }),
            "Disabled - Gamma: 1.00, Vibrance: 50%"
        );
    }
}
