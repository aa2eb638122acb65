//! Runtime configuration.

use std::time::Duration;

use crate::error::ControlError;

/// Fewest strided samples a frame may yield and still give a stable average.
pub const MIN_SAMPLES_PER_FRAME: u32 = 256;

/// All tunables of the control loop.
///
/// The defaults match the values the tool ships with; override individual
/// fields and call [`Config::validate`] before handing it to the loop.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Process name (without extension) whose presence enables the boost.
    pub target_process: String,
    /// Period of the process presence poll.
    pub coarse_interval: Duration,
    /// Period of the brightness sampling loop.
    pub fine_interval: Duration,

    /// Edge length of the square capture region, in pixels.
    pub sample_region_size: u32,
    /// Pixel stride used in both axes when averaging.
    pub sample_stride: u32,

    /// Brightness at or below which `max_gamma` is used.
    pub dark_threshold: f32,
    /// Brightness at or above which `min_gamma` is used.
    pub bright_threshold: f32,
    /// Gamma for bright scenes.
    pub min_gamma: f32,
    /// Gamma for dark scenes.
    pub max_gamma: f32,
    /// Exponential smoothing coefficient (0 = frozen, 1 = instant).
    pub smooth_factor: f32,

    /// Gamma held while in static mode.
    pub static_gamma: f32,
    /// Vibrance percent outside a boosted session.
    pub idle_vibrance: u8,
    /// Vibrance percent while boosted.
    pub boosted_vibrance: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            target_process: "PioneerGame".to_string(),
            coarse_interval: Duration::from_millis(5000),
            fine_interval: Duration::from_millis(150),
            sample_region_size: 400,
            sample_stride: 8,
            dark_threshold: 60.0,
            bright_threshold: 180.0,
            min_gamma: 1.0,
            max_gamma: 2.0,
            smooth_factor: 0.1,
            static_gamma: 1.70,
            idle_vibrance: 50,
            boosted_vibrance: 60,
        }
    }
}

impl Config {
    /// Number of pixels averaged per frame with the configured stride.
    ///
    /// `None` for a zero stride or a count that does not fit in a `u32`.
    pub fn samples_per_frame(&self) -> Option<u32> {
        if self.sample_stride == 0 {
            return None;
        }
        let per_axis = self.sample_region_size.div_ceil(self.sample_stride);
        per_axis.checked_mul(per_axis)
    }

    /// Check every precondition the loop relies on.
    ///
    /// # Errors
    /// Returns [`ControlError::InvalidConfig`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ControlError> {
        if self.target_process.trim().is_empty() {
            return Err(invalid("target_process", "must not be empty"));
        }
        if self.coarse_interval.is_zero() {
            return Err(invalid("coarse_interval", "must be non-zero"));
        }
        if self.fine_interval.is_zero() {
            return Err(invalid("fine_interval", "must be non-zero"));
        }
        if self.sample_region_size == 0 {
            return Err(invalid("sample_region_size", "must be non-zero"));
        }
        if self.sample_stride == 0 {
            return Err(invalid("sample_stride", "must be at least 1"));
        }
        match self.samples_per_frame() {
            None => {
                return Err(invalid(
                    "sample_region_size",
                    format!("{} px is too large to sample", self.sample_region_size),
                ));
            }
            Some(samples) if samples < MIN_SAMPLES_PER_FRAME => {
                return Err(invalid(
                    "sample_stride",
                    format!("yields {samples} samples per frame (need at least {MIN_SAMPLES_PER_FRAME})"),
                ));
            }
            Some(_) => {}
        }
        if !(self.dark_threshold < self.bright_threshold) {
            return Err(invalid(
                "dark_threshold",
                format!(
                    "{} must be below bright_threshold {}",
                    self.dark_threshold, self.bright_threshold
                ),
            ));
        }
        if !(self.min_gamma > 0.0) {
            return Err(invalid("min_gamma", "must be positive"));
        }
        if !(self.min_gamma <= self.max_gamma) {
            return Err(invalid(
                "min_gamma",
                format!("{} exceeds max_gamma {}", self.min_gamma, self.max_gamma),
            ));
        }
        if !(self.smooth_factor > 0.0 && self.smooth_factor <= 1.0) {
            return Err(invalid("smooth_factor", "must be in (0, 1]"));
        }
        if !(self.static_gamma >= self.min_gamma && self.static_gamma <= self.max_gamma) {
            return Err(invalid(
                "static_gamma",
                format!(
                    "{} is outside {}..={}",
                    self.static_gamma, self.min_gamma, self.max_gamma
                ),
            ));
        }
        if self.idle_vibrance > 100 {
            return Err(invalid("idle_vibrance", "must be 0-100"));
        }
        if self.boosted_vibrance > 100 {
            return Err(invalid("boosted_vibrance", "must be 0-100"));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ControlError {
    ControlError::InvalidConfig {
        field,
        reason: reason.into(),
    }
}
