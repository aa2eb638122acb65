//! Error types for the display control loop.

/// Errors that can occur while sensing or driving the displays.
///
/// Most of these never escape the control loop: per-display failures and
/// capture failures are logged and contained where they happen.
#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    /// The screen region could not be captured.
    #[error("Screen capture failed: {0}")]
    CaptureFailed(String),

    /// The attached displays could not be enumerated.
    #[error("Failed to enumerate displays: {0}")]
    DisplayEnumeration(String),

    /// Writing a gamma ramp to one display failed.
    #[error("Failed to set gamma ramp on {display}")]
    GammaWriteFailed {
        /// The display that rejected the ramp.
        display: String,
    },

    /// Writing a vibrance level to one display failed.
    #[error("Failed to set vibrance on {display} (status: {status})")]
    VibranceWriteFailed {
        /// The display that rejected the level.
        display: String,
        /// Vendor status code.
        status: i32,
    },

    /// Failed to load the vendor library.
    #[error("Failed to load vendor library: {0}")]
    VendorLoad(#[from] libloading::Error),

    /// A vendor entry point returned a failure status.
    #[error("Vendor call {function} failed (status: {status})")]
    VendorCall {
        /// The vendor function name.
        function: &'static str,
        /// Vendor status code.
        status: i32,
    },

    /// No vendor vibrance capability is present on this machine.
    #[error("Vendor vibrance control is unavailable")]
    VendorUnavailable,

    /// Attempted to open a second vendor session.
    #[error("Vendor session already initialized - only one instance allowed")]
    AlreadyInitialized,

    /// Another copy of the application is already running.
    #[error("Another instance is already running")]
    AlreadyRunning,

    /// A configuration value violates its precondition.
    #[error("Invalid configuration for {field}: {reason}")]
    InvalidConfig {
        /// The offending configuration field.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },

    /// An I/O error occurred.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
