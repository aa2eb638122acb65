//! Outputs to the presentation layer: status reports and the overlay.

use log::{debug, info};

use crate::state::StatusReport;

/// Receives a status report after every settings change or transition.
pub trait StatusSink: Send {
    /// Publish `report`.
    fn publish(&mut self, report: &StatusReport);
}

/// Receives live gamma/brightness values while the overlay is shown.
pub trait OverlaySink: Send {
    /// Show or hide the overlay.
    fn set_visible(&mut self, visible: bool);

    /// New values from one fine tick.
    fn update(&mut self, gamma: f32, brightness: f32);
}

/// Overlay text for one fine tick.
pub fn overlay_text(gamma: f32, brightness: f32) -> String {
    format!("Visibility: {gamma:.2}\nLuminance: {brightness:.0}")
}

/// Status sink that writes to the log.
#[derive(Debug, Default)]
pub struct LogStatusSink;

impl StatusSink for LogStatusSink {
    fn publish(&mut self, report: &StatusReport) {
        info!(
            "status: {} [enabled={}, mode={}, vibrance_boost={}, overlay={}]",
            report.text, report.enabled, report.mode, report.vibrance_boost, report.overlay_visible
        );
    }
}

/// Overlay that writes its text to the log while visible.
#[derive(Debug, Default)]
pub struct LogOverlay {
    visible: bool,
}

impl OverlaySink for LogOverlay {
    fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    fn update(&mut self, gamma: f32, brightness: f32) {
        if self.visible {
            debug!("overlay: {}", overlay_text(gamma, brightness).replace('\n', " | "));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlay_text() {
        assert_eq!(overlay_text(1.234, 40.4), "Visibility: 1.23\nLuminance: 40");
        assert_eq!(overlay_text(2.0, 255.0), "Visibility: 2.00\nLuminance: 255");
    }
}
