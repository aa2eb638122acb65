//! Brightness-to-gamma mapping, smoothing and hardware ramp generation.

use crate::config::Config;

/// Neutral gamma: the ramp is the identity curve.
pub const NEUTRAL_GAMMA: f32 = 1.0;

/// Number of entries per channel in a hardware gamma ramp.
pub const RAMP_SIZE: usize = 256;

// =============================================================================
// Gamma Mapper
// =============================================================================

/// Maps a brightness sample to a target gamma.
///
/// The relationship is inverse: dark scenes get the most gamma boost, bright
/// scenes none, with linear interpolation between the two thresholds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GammaMapper {
    /// Brightness at or below which `max_gamma` is returned.
    pub dark_threshold: f32,
    /// Brightness at or above which `min_gamma` is returned.
    pub bright_threshold: f32,
    /// Gamma for bright scenes.
    pub min_gamma: f32,
    /// Gamma for dark scenes.
    pub max_gamma: f32,
}

impl GammaMapper {
    /// Build a mapper from the thresholds and gamma range in `config`.
    pub fn from_config(config: &Config) -> Self {
        Self {
            dark_threshold: config.dark_threshold,
            bright_threshold: config.bright_threshold,
            min_gamma: config.min_gamma,
            max_gamma: config.max_gamma,
        }
    }

    /// Target gamma for `brightness` (0-255).
    pub fn map(&self, brightness: f32) -> f32 {
        if brightness <= self.dark_threshold {
            return self.max_gamma;
        }
        if brightness >= self.bright_threshold {
            return self.min_gamma;
        }

        let t = (brightness - self.dark_threshold) / (self.bright_threshold - self.dark_threshold);
        self.max_gamma - t * (self.max_gamma - self.min_gamma)
    }
}

impl Default for GammaMapper {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

// =============================================================================
// Gamma Smoother
// =============================================================================

/// Exponential filter that eases the applied gamma towards its target.
#[derive(Debug, Clone, PartialEq)]
pub struct GammaSmoother {
    smooth_factor: f32,
    current: f32,
}

impl GammaSmoother {
    /// Create a smoother starting at neutral gamma.
    pub fn new(smooth_factor: f32) -> Self {
        Self {
            smooth_factor,
            current: NEUTRAL_GAMMA,
        }
    }

    /// Move one step towards `target` and return the new value.
    pub fn update(&mut self, target: f32) -> f32 {
        self.current += (target - self.current) * self.smooth_factor;
        self.current
    }

    /// Drop all history and return to neutral gamma.
    pub fn reset(&mut self) {
        self.current = NEUTRAL_GAMMA;
    }

    /// The last smoothed value, without advancing the filter.
    pub fn peek(&self) -> f32 {
        self.current
    }

    /// The filter coefficient.
    pub fn smooth_factor(&self) -> f32 {
        self.smooth_factor
    }
}

impl Default for GammaSmoother {
    fn default() -> Self {
        Self::new(Config::default().smooth_factor)
    }
}

// =============================================================================
// Gamma Ramp
// =============================================================================

/// A 256-entry hardware lookup table, identical on all three channels.
///
/// Laid out the way display drivers expect it: 256 red entries, then green,
/// then blue.
#[derive(Clone, PartialEq, Eq)]
pub struct GammaRamp {
    channels: [[u16; RAMP_SIZE]; 3],
}

impl GammaRamp {
    /// Generate the power-law ramp for `gamma`.
    ///
    /// `value(i) = (i / 255) ^ (1 / gamma) * 65535`, clamped and truncated.
    pub fn generate(gamma: f32) -> Self {
        let exponent = 1.0 / f64::from(gamma);
        let mut curve = [0u16; RAMP_SIZE];
        for (i, entry) in curve.iter_mut().enumerate() {
            let normalized = i as f64 / (RAMP_SIZE - 1) as f64;
            let value = normalized.powf(exponent) * f64::from(u16::MAX);
            *entry = value.clamp(0.0, f64::from(u16::MAX)) as u16;
        }
        Self {
            channels: [curve; 3],
        }
    }

    /// The identity ramp.
    pub fn neutral() -> Self {
        Self::generate(NEUTRAL_GAMMA)
    }

    /// Red channel entries.
    pub fn red(&self) -> &[u16; RAMP_SIZE] {
        &self.channels[0]
    }

    /// Green channel entries.
    pub fn green(&self) -> &[u16; RAMP_SIZE] {
        &self.channels[1]
    }

    /// Blue channel entries.
    pub fn blue(&self) -> &[u16; RAMP_SIZE] {
        &self.channels[2]
    }

    /// Entry `index` of every channel as an `(r, g, b)` triple.
    pub fn entry(&self, index: usize) -> Option<(u16, u16, u16)> {
        Some((
            *self.channels[0].get(index)?,
            *self.channels[1].get(index)?,
            *self.channels[2].get(index)?,
        ))
    }

    /// The table flattened to the driver layout (R[256], G[256], B[256]).
    pub fn to_driver_table(&self) -> [u16; RAMP_SIZE * 3] {
        let mut table = [0u16; RAMP_SIZE * 3];
        for (chunk, channel) in table.chunks_exact_mut(RAMP_SIZE).zip(&self.channels) {
            chunk.copy_from_slice(channel);
        }
        table
    }
}

impl std::fmt::Debug for GammaRamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let curve = &self.channels[0];
        f.debug_struct("GammaRamp")
            .field("first", &curve[0])
            .field("mid", &curve[RAMP_SIZE / 2])
            .field("last", &curve[RAMP_SIZE - 1])
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mapper_clamps_outside_thresholds() {
        let mapper = GammaMapper::default();
        for brightness in [0.0, 10.0, 40.0, 59.9, 60.0] {
            assert_eq!(mapper.map(brightness), 2.0);
        }
        for brightness in [180.0, 200.0, 255.0] {
            assert_eq!(mapper.map(brightness), 1.0);
        }
    }

    #[test]
    fn test_mapper_interpolates_linearly() {
        let mapper = GammaMapper::default();
        assert!((mapper.map(120.0) - 1.5).abs() < 1e-6);
        assert!((mapper.map(90.0) - 1.75).abs() < 1e-6);
        assert!((mapper.map(150.0) - 1.25).abs() < 1e-6);
    }

    #[test]
    fn test_mapper_is_non_increasing() {
        let mapper = GammaMapper::default();
        let mut previous = mapper.map(0.0);
        for step in 1..=2550 {
            let gamma = mapper.map(step as f32 / 10.0);
            assert!(gamma <= previous, "gamma rose at brightness {}", step as f32 / 10.0);
            previous = gamma;
        }
    }

    #[test]
    fn test_smoother_single_step() {
        let mut smoother = GammaSmoother::new(0.1);
        let previous = smoother.peek();
        let next = smoother.update(2.0);
        assert_eq!(next, previous + (2.0 - previous) * 0.1);
        assert!((next - 1.1).abs() < 1e-6);
        assert_eq!(smoother.peek(), next);
    }

    #[test]
    fn test_smoother_converges() {
        let mut smoother = GammaSmoother::new(0.1);
        let target = 1.8;
        let mut steps = 0;
        while (smoother.peek() - target).abs() >= 1e-6 {
            smoother.update(target);
            steps += 1;
            assert!(steps <= 300, "no convergence after {steps} steps");
        }
    }

    #[test]
    fn test_smoother_reset_and_peek() {
        let mut smoother = GammaSmoother::new(0.5);
        smoother.update(2.0);
        smoother.update(2.0);
        let value = smoother.peek();
        assert_eq!(smoother.peek(), value);
        smoother.reset();
        assert_eq!(smoother.peek(), NEUTRAL_GAMMA);
    }

    #[test]
    fn test_neutral_ramp_is_identity() {
        let ramp = GammaRamp::generate(1.0);
        for (i, &value) in ramp.red().iter().enumerate() {
            let expected = (i as f64 / 255.0 * 65535.0).round();
            assert!((f64::from(value) - expected).abs() <= 1.0, "index {i}");
        }
        assert_eq!(ramp.red(), ramp.green());
        assert_eq!(ramp.green(), ramp.blue());
    }

    #[test]
    fn test_boosted_ramp_endpoints() {
        let ramp = GammaRamp::generate(2.0);
        assert_eq!(ramp.entry(0), Some((0, 0, 0)));
        assert_eq!(ramp.entry(255), Some((65535, 65535, 65535)));
        assert_eq!(ramp.entry(256), None);
        // brighter than identity in the midtones
        assert!(ramp.red()[128] > GammaRamp::neutral().red()[128]);
    }

    #[test]
    fn test_ramp_is_monotonic_over_domain() {
        for step in 0..=100 {
            let gamma = 1.0 + step as f32 / 100.0;
            let ramp = GammaRamp::generate(gamma);
            assert!(
                ramp.red().windows(2).all(|pair| pair[0] <= pair[1]),
                "ramp for gamma {gamma} decreases"
            );
        }
    }

    #[test]
    fn test_driver_table_layout() {
        let ramp = GammaRamp::generate(1.7);
        let table = ramp.to_driver_table();
        assert_eq!(&table[..256], ramp.red());
        assert_eq!(&table[256..512], ramp.green());
        assert_eq!(&table[512..], ramp.blue());
    }
}
