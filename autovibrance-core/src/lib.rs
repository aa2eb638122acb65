//! Content-aware display gamma and digital vibrance control.
//!
//! While a target program (a game) is running, this crate keeps the display
//! gamma matched to what is on screen: it samples the brightness of the
//! center of the primary display, maps dark scenes to a higher gamma, eases
//! towards that target and writes a hardware gamma ramp to every attached
//! display. Digital vibrance is boosted on vendor-capable displays for the
//! same session. When the program exits, or the loop is disabled, every
//! display returns to neutral gamma and baseline vibrance.
//!
//! # Requirements
//!
//! The bundled [`platform`] backends need Windows 10/11; vibrance needs an
//! NVIDIA driver. Everything else is platform independent and can be driven
//! with your own [`ScreenCapture`], [`GammaOutput`], [`VibranceOutput`] and
//! [`ProcessProbe`] implementations.
//!
//! # Example
//!
//! ```no_run
//! # #[cfg(windows)]
//! # fn main() -> Result<(), autovibrance_core::ControlError> {
//! use autovibrance_core::platform::{GdiCapture, GdiGamma, NvVibrance, ToolhelpProbe};
//! use autovibrance_core::{Action, Config, ControlLoop, DisplayWriter, LuminanceSampler, Scheduler};
//!
//! let config = Config::default();
//! let sampler = LuminanceSampler::new(Box::new(GdiCapture::new()), &config);
//! let writer = match NvVibrance::new() {
//!     Ok(nvapi) => DisplayWriter::new(Box::new(GdiGamma::new())).with_vibrance(Box::new(nvapi)),
//!     Err(e) => DisplayWriter::new(Box::new(GdiGamma::new())).without_vibrance(&e),
//! };
//! let control = ControlLoop::new(config, sampler, writer, Box::new(ToolhelpProbe::new()))?;
//!
//! let scheduler = Scheduler::new(control);
//! let actions = scheduler.sender();
//! std::thread::spawn(move || scheduler.run());
//!
//! actions.send(Action::ToggleVibranceBoost);
//! actions.shutdown();
//! # Ok(())
//! # }
//! # #[cfg(not(windows))]
//! # fn main() {}
//! ```
//!
//! # Testing
//!
//! Use the mocks in this crate to test without hardware:
//!
//! ```
//! use autovibrance_core::{
//!     Config, ControlLoop, DisplayWriter, LuminanceSampler, MockGamma, MockProcess, MockScreen,
//! };
//!
//! let config = Config::default();
//! let gamma = MockGamma::with_displays(&["DISPLAY1"]);
//! let process = MockProcess::new();
//! let sampler = LuminanceSampler::new(Box::new(MockScreen::default()), &config);
//! let writer = DisplayWriter::new(Box::new(gamma.clone()));
//! let mut control = ControlLoop::new(config, sampler, writer, Box::new(process.clone())).unwrap();
//!
//! control.start();
//! assert!(gamma.holds_gamma("DISPLAY1", 1.0));
//! ```

#![warn(missing_docs)]

mod config;
mod control;
mod display;
mod error;
mod gamma;
mod mock;
mod modes;
mod process;
mod sampler;
mod scheduler;
mod sink;
mod state;

pub mod platform;

// Re-export public API
pub use config::{Config, MIN_SAMPLES_PER_FRAME};
pub use control::{ControlLoop, FineTick};
pub use display::{ApplyReport, DisplayId, DisplayWriter, GammaOutput, VibranceOutput};
pub use error::ControlError;
pub use gamma::{GammaMapper, GammaRamp, GammaSmoother, NEUTRAL_GAMMA, RAMP_SIZE};
pub use mock::{
    MockGamma, MockProcess, MockScreen, MockVibrance, RecordingOverlay, RecordingStatus,
};
pub use modes::{Action, OperatingMode};
pub use process::{ProcessProbe, matches_process_name};
pub use sampler::{FALLBACK_BRIGHTNESS, Frame, LuminanceSampler, Rect, ScreenCapture, average_luma, luma};
pub use scheduler::{ActionSender, Command, Scheduler};
pub use sink::{LogOverlay, LogStatusSink, OverlaySink, StatusSink, overlay_text};
pub use state::{ControlState, EffectiveSettings, StatusReport, resolve_effective};
