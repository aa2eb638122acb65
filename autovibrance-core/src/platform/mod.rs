//! Windows implementations of the display, capture and process interfaces.
//!
//! Only the vendor level mapping is platform independent; everything else is
//! compiled on Windows only.

#[cfg(windows)]
mod gdi;
#[cfg(windows)]
mod instance;
#[cfg(windows)]
mod nvapi;
#[cfg(windows)]
mod toolhelp;

#[cfg(windows)]
pub use gdi::{GdiCapture, GdiGamma};
#[cfg(windows)]
pub use instance::InstanceGuard;
#[cfg(windows)]
pub use nvapi::NvVibrance;
#[cfg(windows)]
pub use toolhelp::ToolhelpProbe;

/// Raw digital vibrance range reported by the driver for one display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelRange {
    /// Driver default, shown as 50% by the vendor control panel.
    pub min: i32,
    /// Full saturation, shown as 100%.
    pub max: i32,
}

impl LevelRange {
    /// Convert a vibrance percent (0-100) to a raw driver level.
    ///
    /// The driver cannot desaturate below its default, so anything up to 50%
    /// maps to `min`.
    pub fn percent_to_level(&self, percent: u8) -> i32 {
        let percent = i32::from(percent.min(100));
        if percent <= 50 || self.max <= self.min {
            return self.min;
        }
        let span = (self.max - self.min) as f32;
        self.min + ((percent - 50) as f32 / 50.0 * span).round() as i32
    }

    /// Convert a raw driver level back to a vibrance percent.
    pub fn level_to_percent(&self, level: i32) -> u8 {
        if self.max <= self.min {
            return 50;
        }
        let clamped = level.clamp(self.min, self.max);
        let span = (self.max - self.min) as f32;
        (50.0 + (clamped - self.min) as f32 / span * 50.0).round() as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_to_level() {
        let range = LevelRange { min: 0, max: 63 };
        assert_eq!(range.percent_to_level(0), 0);
        assert_eq!(range.percent_to_level(50), 0);
        assert_eq!(range.percent_to_level(60), 13);
        assert_eq!(range.percent_to_level(100), 63);
        assert_eq!(range.percent_to_level(150), 63);
    }

    #[test]
    fn test_level_to_percent() {
        let range = LevelRange { min: 0, max: 63 };
        assert_eq!(range.level_to_percent(0), 50);
        assert_eq!(range.level_to_percent(63), 100);
        assert_eq!(range.level_to_percent(13), 60);
        assert_eq!(range.level_to_percent(-5), 50);
    }

    #[test]
    fn test_degenerate_range() {
        let range = LevelRange { min: 10, max: 10 };
        assert_eq!(range.percent_to_level(80), 10);
        assert_eq!(range.level_to_percent(10), 50);
    }
}
