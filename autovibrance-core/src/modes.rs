//! Operating modes and the actions that drive the control loop.

/// How gamma is derived while the target process runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OperatingMode {
    /// No gamma boost.
    Off,
    /// A fixed configured gamma.
    Static,
    /// Gamma follows the sampled screen brightness.
    #[default]
    Dynamic,
}

impl OperatingMode {
    /// Display name.
    pub fn name(&self) -> &'static str {
        match self {
            OperatingMode::Off => "Off",
            OperatingMode::Static => "Static",
            OperatingMode::Dynamic => "Dynamic",
        }
    }
}

impl std::fmt::Display for OperatingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for OperatingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" => Ok(OperatingMode::Off),
            "static" => Ok(OperatingMode::Static),
            "dynamic" => Ok(OperatingMode::Dynamic),
            other => Err(format!("unknown mode '{other}' (expected off, static or dynamic)")),
        }
    }
}

/// A discrete user action, handled atomically by the control loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Flip the master enable flag.
    ToggleEnabled,
    /// Show or hide the gamma/brightness overlay.
    ToggleOverlay,
    /// Switch operating mode.
    SetMode(OperatingMode),
    /// Flip whether the boosted vibrance is used in-game.
    ToggleVibranceBoost,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_parsing() {
        assert_eq!("off".parse(), Ok(OperatingMode::Off));
        assert_eq!(" Static ".parse(), Ok(OperatingMode::Static));
        assert_eq!("DYNAMIC".parse(), Ok(OperatingMode::Dynamic));
        assert!("auto".parse::<OperatingMode>().is_err());
        assert_eq!(OperatingMode::default(), OperatingMode::Dynamic);
    }
}
