//! Mock collaborators for testing.
//!
//! Every mock is a cheap cloneable handle onto shared state, so a test can
//! hand one clone to the control loop and inspect the other.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use crate::display::{DisplayId, GammaOutput, VibranceOutput};
use crate::error::ControlError;
use crate::gamma::GammaRamp;
use crate::process::ProcessProbe;
use crate::sampler::{Frame, Rect, ScreenCapture};
use crate::sink::{OverlaySink, StatusSink};
use crate::state::StatusReport;

// =============================================================================
// Screen
// =============================================================================

#[derive(Debug)]
struct ScreenState {
    bounds: Rect,
    color: (u8, u8, u8),
    fail: bool,
    last_region: Option<Rect>,
    captures: usize,
}

/// A screen filled with one solid color.
///
/// # Example
///
/// ```
/// use autovibrance_core::{Config, LuminanceSampler, MockScreen, Rect};
///
/// let screen = MockScreen::new(Rect::new(0, 0, 1920, 1080));
/// screen.set_color((40, 40, 40));
/// let mut sampler = LuminanceSampler::new(Box::new(screen), &Config::default());
/// assert!((sampler.sample() - 40.0).abs() < 1e-3);
/// ```
#[derive(Debug, Clone)]
pub struct MockScreen {
    state: Arc<Mutex<ScreenState>>,
}

impl MockScreen {
    /// Create a black screen with the given primary bounds.
    pub fn new(bounds: Rect) -> Self {
        Self {
            state: Arc::new(Mutex::new(ScreenState {
                bounds,
                color: (0, 0, 0),
                fail: false,
                last_region: None,
                captures: 0,
            })),
        }
    }

    /// Fill the screen with `color`.
    pub fn set_color(&self, color: (u8, u8, u8)) {
        self.state.lock().unwrap().color = color;
    }

    /// Fill the screen with a gray whose luma is `level`.
    pub fn set_gray(&self, level: u8) {
        self.set_color((level, level, level));
    }

    /// Make subsequent captures fail.
    pub fn set_fail(&self, fail: bool) {
        self.state.lock().unwrap().fail = fail;
    }

    /// The region requested by the last capture.
    pub fn last_region(&self) -> Option<Rect> {
        self.state.lock().unwrap().last_region
    }

    /// Number of capture attempts.
    pub fn capture_count(&self) -> usize {
        self.state.lock().unwrap().captures
    }
}

impl Default for MockScreen {
    fn default() -> Self {
        Self::new(Rect::new(0, 0, 1920, 1080))
    }
}

impl ScreenCapture for MockScreen {
    fn primary_bounds(&self) -> Result<Rect, ControlError> {
        Ok(self.state.lock().unwrap().bounds)
    }

    fn capture(&mut self, region: Rect, frame: &mut Frame) -> Result<(), ControlError> {
        let mut state = self.state.lock().unwrap();
        state.captures += 1;
        state.last_region = Some(region);
        if state.fail {
            return Err(ControlError::CaptureFailed("mock capture failure".to_string()));
        }
        frame.fill(state.color);
        Ok(())
    }
}

// =============================================================================
// Gamma
// =============================================================================

#[derive(Debug, Default)]
struct GammaState {
    displays: Vec<DisplayId>,
    ramps: HashMap<DisplayId, GammaRamp>,
    failing: HashSet<DisplayId>,
    enumeration_fails: bool,
    writes: usize,
}

/// Records the ramp each display holds.
#[derive(Debug, Clone, Default)]
pub struct MockGamma {
    state: Arc<Mutex<GammaState>>,
}

impl MockGamma {
    /// Create a mock with the named displays attached.
    pub fn with_displays(names: &[&str]) -> Self {
        let mock = Self::default();
        mock.state.lock().unwrap().displays = names.iter().map(|n| DisplayId(n.to_string())).collect();
        mock
    }

    /// Make writes to `name` fail.
    pub fn fail_display(&self, name: &str) {
        self.state.lock().unwrap().failing.insert(DisplayId(name.to_string()));
    }

    /// Let writes to `name` succeed again.
    pub fn heal_display(&self, name: &str) {
        self.state.lock().unwrap().failing.remove(&DisplayId(name.to_string()));
    }

    /// Make display enumeration fail.
    pub fn set_enumeration_fails(&self, fails: bool) {
        self.state.lock().unwrap().enumeration_fails = fails;
    }

    /// The ramp last successfully written to `name`.
    pub fn ramp_of(&self, name: &str) -> Option<GammaRamp> {
        self.state.lock().unwrap().ramps.get(&DisplayId(name.to_string())).cloned()
    }

    /// Whether `name` holds exactly the ramp for `gamma`.
    pub fn holds_gamma(&self, name: &str, gamma: f32) -> bool {
        self.ramp_of(name) == Some(GammaRamp::generate(gamma))
    }

    /// Number of write attempts across all displays.
    pub fn write_count(&self) -> usize {
        self.state.lock().unwrap().writes
    }
}

impl GammaOutput for MockGamma {
    fn displays(&self) -> Result<Vec<DisplayId>, ControlError> {
        let state = self.state.lock().unwrap();
        if state.enumeration_fails {
            return Err(ControlError::DisplayEnumeration("mock enumeration failure".to_string()));
        }
        Ok(state.displays.clone())
    }

    fn set_gamma_ramp(&mut self, display: &DisplayId, ramp: &GammaRamp) -> Result<(), ControlError> {
        let mut state = self.state.lock().unwrap();
        state.writes += 1;
        if state.failing.contains(display) {
            return Err(ControlError::GammaWriteFailed {
                display: display.to_string(),
            });
        }
        state.ramps.insert(display.clone(), ramp.clone());
        Ok(())
    }
}

// =============================================================================
// Vibrance
// =============================================================================

#[derive(Debug, Default)]
struct VibranceState {
    displays: Vec<DisplayId>,
    levels: HashMap<DisplayId, u8>,
    failing: HashSet<DisplayId>,
    enumeration_fails: bool,
}

/// Records the vibrance level each vendor display holds.
#[derive(Debug, Clone, Default)]
pub struct MockVibrance {
    state: Arc<Mutex<VibranceState>>,
}

impl MockVibrance {
    /// Create a mock with the named vendor displays.
    pub fn with_displays(names: &[&str]) -> Self {
        let mock = Self::default();
        mock.state.lock().unwrap().displays = names.iter().map(|n| DisplayId(n.to_string())).collect();
        mock
    }

    /// Make writes to `name` fail.
    pub fn fail_display(&self, name: &str) {
        self.state.lock().unwrap().failing.insert(DisplayId(name.to_string()));
    }

    /// Make vendor enumeration fail.
    pub fn set_enumeration_fails(&self, fails: bool) {
        self.state.lock().unwrap().enumeration_fails = fails;
    }

    /// The level last successfully written to `name`.
    pub fn level_of(&self, name: &str) -> Option<u8> {
        self.state.lock().unwrap().levels.get(&DisplayId(name.to_string())).copied()
    }
}

impl VibranceOutput for MockVibrance {
    fn displays(&mut self) -> Result<Vec<DisplayId>, ControlError> {
        let state = self.state.lock().unwrap();
        if state.enumeration_fails {
            return Err(ControlError::VendorUnavailable);
        }
        Ok(state.displays.clone())
    }

    fn set_vibrance(&mut self, display: &DisplayId, percent: u8) -> Result<(), ControlError> {
        let mut state = self.state.lock().unwrap();
        if state.failing.contains(display) {
            return Err(ControlError::VibranceWriteFailed {
                display: display.to_string(),
                status: -1,
            });
        }
        state.levels.insert(display.clone(), percent);
        Ok(())
    }
}

// =============================================================================
// Process
// =============================================================================

/// A process list containing whatever the test says is running.
#[derive(Debug, Clone, Default)]
pub struct MockProcess {
    running: Arc<Mutex<HashSet<String>>>,
}

impl MockProcess {
    /// Create an empty process list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start or stop the process `name`.
    pub fn set_running(&self, name: &str, running: bool) {
        let mut set = self.running.lock().unwrap();
        if running {
            set.insert(name.to_ascii_lowercase());
        } else {
            set.remove(&name.to_ascii_lowercase());
        }
    }
}

impl ProcessProbe for MockProcess {
    fn is_running(&mut self, name: &str) -> bool {
        self.running.lock().unwrap().contains(&name.to_ascii_lowercase())
    }
}

// =============================================================================
// Sinks
// =============================================================================

/// Collects every published status report.
#[derive(Debug, Clone, Default)]
pub struct RecordingStatus {
    reports: Arc<Mutex<Vec<StatusReport>>>,
}

impl RecordingStatus {
    /// All reports so far, oldest first.
    pub fn reports(&self) -> Vec<StatusReport> {
        self.reports.lock().unwrap().clone()
    }

    /// The latest report.
    pub fn last(&self) -> Option<StatusReport> {
        self.reports.lock().unwrap().last().cloned()
    }
}

impl StatusSink for RecordingStatus {
    fn publish(&mut self, report: &StatusReport) {
        self.reports.lock().unwrap().push(report.clone());
    }
}

#[derive(Debug, Default)]
struct OverlayState {
    visible: bool,
    updates: Vec<(f32, f32)>,
}

/// Collects overlay visibility and updates.
#[derive(Debug, Clone, Default)]
pub struct RecordingOverlay {
    state: Arc<Mutex<OverlayState>>,
}

impl RecordingOverlay {
    /// Whether the overlay is currently shown.
    pub fn is_visible(&self) -> bool {
        self.state.lock().unwrap().visible
    }

    /// Every `(gamma, brightness)` update so far.
    pub fn updates(&self) -> Vec<(f32, f32)> {
        self.state.lock().unwrap().updates.clone()
    }
}

impl OverlaySink for RecordingOverlay {
    fn set_visible(&mut self, visible: bool) {
        self.state.lock().unwrap().visible = visible;
    }

    fn update(&mut self, gamma: f32, brightness: f32) {
        self.state.lock().unwrap().updates.push((gamma, brightness));
    }
}
