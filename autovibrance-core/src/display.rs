//! Gamma ramp and vibrance output to the attached displays.

use log::{debug, info, warn};

use crate::error::ControlError;
use crate::gamma::GammaRamp;

/// Identifies one physical or vendor-managed display.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DisplayId(pub String);

impl std::fmt::Display for DisplayId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Hardware gamma ramp access for every attached display.
///
/// This allows for mock implementations in tests.
pub trait GammaOutput: Send {
    /// Displays currently attached.
    fn displays(&self) -> Result<Vec<DisplayId>, ControlError>;

    /// Write `ramp` to one display.
    fn set_gamma_ramp(&mut self, display: &DisplayId, ramp: &GammaRamp)
    -> Result<(), ControlError>;
}

/// Vendor digital vibrance access.
pub trait VibranceOutput: Send {
    /// Displays the vendor API can manage.
    fn displays(&mut self) -> Result<Vec<DisplayId>, ControlError>;

    /// Set the saturation level of one display (0-100%).
    fn set_vibrance(&mut self, display: &DisplayId, percent: u8) -> Result<(), ControlError>;
}

/// Outcome of writing one value to a set of displays.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyReport {
    /// Displays a write was attempted on.
    pub attempted: usize,
    /// Displays that accepted the write.
    pub succeeded: usize,
}

impl ApplyReport {
    /// Number of displays that rejected the write.
    pub fn failed(&self) -> usize {
        self.attempted - self.succeeded
    }
}

struct VibranceTargets {
    output: Box<dyn VibranceOutput>,
    displays: Vec<DisplayId>,
}

/// Commits gamma ramps and vibrance levels to every display.
///
/// Each display is written independently: a failure on one is logged and
/// does not stop or roll back the others. When no vendor vibrance is
/// available the vibrance path is a silent no-op.
pub struct DisplayWriter {
    gamma: Box<dyn GammaOutput>,
    vibrance: Option<VibranceTargets>,
}

impl DisplayWriter {
    /// Create a writer with gamma output only.
    pub fn new(gamma: Box<dyn GammaOutput>) -> Self {
        Self {
            gamma,
            vibrance: None,
        }
    }

    /// Enable the vibrance path by enumerating the vendor's displays once.
    ///
    /// An enumeration failure, or no manageable display, leaves vibrance
    /// disabled for the session; gamma is unaffected either way.
    pub fn with_vibrance(mut self, mut output: Box<dyn VibranceOutput>) -> Self {
        match output.displays() {
            Ok(displays) if !displays.is_empty() => {
                info!("vibrance control available on {} display(s)", displays.len());
                self.vibrance = Some(VibranceTargets { output, displays });
            }
            Ok(_) => info!("no vendor-manageable displays, vibrance disabled"),
            Err(e) => warn!("vibrance control unavailable: {}", e),
        }
        self
    }

    /// Log why vibrance is unavailable and continue with gamma only.
    pub fn without_vibrance(self, reason: &ControlError) -> Self {
        warn!("vibrance control unavailable: {}", reason);
        self
    }

    /// Whether vibrance writes reach any hardware.
    pub fn has_vibrance(&self) -> bool {
        self.vibrance.is_some()
    }

    /// Write `ramp` to every attached display.
    pub fn apply_ramp(&mut self, ramp: &GammaRamp) -> ApplyReport {
        let displays = match self.gamma.displays() {
            Ok(displays) => displays,
            Err(e) => {
                warn!("cannot enumerate displays for gamma: {}", e);
                return ApplyReport::default();
            }
        };

        let mut report = ApplyReport::default();
        for display in &displays {
            report.attempted += 1;
            match self.gamma.set_gamma_ramp(display, ramp) {
                Ok(()) => report.succeeded += 1,
                Err(e) => warn!("gamma write to {} failed: {}", display, e),
            }
        }
        report
    }

    /// Write the ramp for `gamma` to every attached display.
    pub fn apply_gamma(&mut self, gamma: f32) -> ApplyReport {
        let report = self.apply_ramp(&GammaRamp::generate(gamma));
        debug!(
            "applied gamma {:.2} to {}/{} display(s)",
            gamma, report.succeeded, report.attempted
        );
        report
    }

    /// Set `percent` vibrance on every vendor-manageable display.
    pub fn apply_vibrance(&mut self, percent: u8) -> ApplyReport {
        let Some(targets) = self.vibrance.as_mut() else {
            return ApplyReport::default();
        };

        let percent = percent.min(100);
        let mut report = ApplyReport::default();
        for display in &targets.displays {
            report.attempted += 1;
            match targets.output.set_vibrance(display, percent) {
                Ok(()) => report.succeeded += 1,
                Err(e) => warn!("vibrance write to {} failed: {}", display, e),
            }
        }
        debug!(
            "applied vibrance {}% to {}/{} display(s)",
            percent, report.succeeded, report.attempted
        );
        report
    }

    /// Apply gamma and vibrance together.
    pub fn apply_both(&mut self, gamma: f32, percent: u8) -> (ApplyReport, ApplyReport) {
        (self.apply_gamma(gamma), self.apply_vibrance(percent))
    }
}

impl std::fmt::Debug for DisplayWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DisplayWriter")
            .field(
                "vibrance_displays",
                &self.vibrance.as_ref().map(|v| &v.displays),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockGamma, MockVibrance};

    #[test]
    fn test_ramp_written_to_every_display() {
        let gamma = MockGamma::with_displays(&["DISPLAY1", "DISPLAY2", "DISPLAY3"]);
        let mut writer = DisplayWriter::new(Box::new(gamma.clone()));

        let report = writer.apply_gamma(1.5);
        assert_eq!(report, ApplyReport { attempted: 3, succeeded: 3 });
        for name in ["DISPLAY1", "DISPLAY2", "DISPLAY3"] {
            assert_eq!(gamma.ramp_of(name), Some(GammaRamp::generate(1.5)));
        }
    }

    #[test]
    fn test_gamma_failure_is_isolated() {
        let gamma = MockGamma::with_displays(&["DISPLAY1", "DISPLAY2", "DISPLAY3"]);
        let mut writer = DisplayWriter::new(Box::new(gamma.clone()));
        writer.apply_gamma(1.2);

        gamma.fail_display("DISPLAY2");
        let report = writer.apply_gamma(1.8);
        assert_eq!(report.failed(), 1);
        assert_eq!(gamma.ramp_of("DISPLAY1"), Some(GammaRamp::generate(1.8)));
        assert_eq!(gamma.ramp_of("DISPLAY3"), Some(GammaRamp::generate(1.8)));
        // the failing display keeps its last good ramp
        assert_eq!(gamma.ramp_of("DISPLAY2"), Some(GammaRamp::generate(1.2)));
    }

    #[test]
    fn test_applying_same_ramp_twice_is_idempotent() {
        let gamma = MockGamma::with_displays(&["DISPLAY1"]);
        let mut writer = DisplayWriter::new(Box::new(gamma.clone()));
        let ramp = GammaRamp::generate(1.7);

        writer.apply_ramp(&ramp);
        let once = gamma.ramp_of("DISPLAY1");
        writer.apply_ramp(&ramp);
        assert_eq!(gamma.ramp_of("DISPLAY1"), once);
        assert_eq!(gamma.write_count(), 2);
    }

    #[test]
    fn test_vibrance_is_noop_without_vendor() {
        let gamma = MockGamma::with_displays(&["DISPLAY1"]);
        let mut writer = DisplayWriter::new(Box::new(gamma))
            .without_vibrance(&ControlError::VendorUnavailable);
        assert!(!writer.has_vibrance());
        assert_eq!(writer.apply_vibrance(60), ApplyReport::default());

        let (gamma_report, _) = writer.apply_both(1.5, 60);
        assert_eq!(gamma_report.succeeded, 1);
    }

    #[test]
    fn test_vendor_enumeration_failure_disables_vibrance() {
        let vibrance = MockVibrance::with_displays(&["GPU0"]);
        vibrance.set_enumeration_fails(true);
        let writer = DisplayWriter::new(Box::new(MockGamma::with_displays(&["DISPLAY1"])))
            .with_vibrance(Box::new(vibrance));
        assert!(!writer.has_vibrance());
    }

    #[test]
    fn test_vibrance_failure_is_isolated() {
        let vibrance = MockVibrance::with_displays(&["GPU0", "GPU1"]);
        let mut writer = DisplayWriter::new(Box::new(MockGamma::with_displays(&["DISPLAY1"])))
            .with_vibrance(Box::new(vibrance.clone()));
        writer.apply_vibrance(50);

        vibrance.fail_display("GPU0");
        let report = writer.apply_vibrance(60);
        assert_eq!(report, ApplyReport { attempted: 2, succeeded: 1 });
        assert_eq!(vibrance.level_of("GPU0"), Some(50));
        assert_eq!(vibrance.level_of("GPU1"), Some(60));
    }

    #[test]
    fn test_enumeration_failure_skips_gamma_write() {
        let gamma = MockGamma::with_displays(&["DISPLAY1"]);
        gamma.set_enumeration_fails(true);
        let mut writer = DisplayWriter::new(Box::new(gamma.clone()));
        assert_eq!(writer.apply_gamma(1.5), ApplyReport::default());
        assert_eq!(gamma.write_count(), 0);
    }
}
