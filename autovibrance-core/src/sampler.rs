//! Screen luminance sampling.

use log::{trace, warn};

use crate::config::Config;
use crate::error::ControlError;

/// Brightness reported before the first successful capture.
pub const FALLBACK_BRIGHTNESS: f32 = 128.0;

const BYTES_PER_PIXEL: usize = 4;

/// A rectangle in virtual-desktop coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    /// Left edge.
    pub x: i32,
    /// Top edge.
    pub y: i32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Rect {
    /// Create a rectangle.
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// A `size`×`size` square centered on this rectangle.
    pub fn centered_square(&self, size: u32) -> Rect {
        let offset = |extent: u32| ((i64::from(extent) - i64::from(size)) / 2) as i32;
        Rect {
            x: self.x + offset(self.width),
            y: self.y + offset(self.height),
            width: size,
            height: size,
        }
    }
}

/// An owned top-down BGRA pixel buffer.
#[derive(Clone)]
pub struct Frame {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Frame {
    /// Allocate a black frame.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize * BYTES_PER_PIXEL],
        }
    }

    /// Frame width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Frame height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw BGRA bytes, row-major, `width * 4` bytes per row.
    pub fn as_bytes(&self) -> &[u8] {
        &self.pixels
    }

    /// Mutable raw BGRA bytes for capture backends to fill.
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    /// The `(r, g, b)` value at `(x, y)`, or `None` outside the frame.
    pub fn pixel(&self, x: u32, y: u32) -> Option<(u8, u8, u8)> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * BYTES_PER_PIXEL;
        let bgr = self.pixels.get(offset..offset + 3)?;
        Some((bgr[2], bgr[1], bgr[0]))
    }

    /// Set the pixel at `(x, y)`; out-of-range coordinates are ignored.
    pub fn set_pixel(&mut self, x: u32, y: u32, (r, g, b): (u8, u8, u8)) {
        if x >= self.width || y >= self.height {
            return;
        }
        let offset = (y as usize * self.width as usize + x as usize) * BYTES_PER_PIXEL;
        if let Some(px) = self.pixels.get_mut(offset..offset + BYTES_PER_PIXEL) {
            px.copy_from_slice(&[b, g, r, 0xFF]);
        }
    }

    /// Fill every pixel with one color.
    pub fn fill(&mut self, (r, g, b): (u8, u8, u8)) {
        for px in self.pixels.chunks_exact_mut(BYTES_PER_PIXEL) {
            px.copy_from_slice(&[b, g, r, 0xFF]);
        }
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

/// Source of screen pixels.
///
/// This allows for mock implementations in tests.
pub trait ScreenCapture: Send {
    /// Bounds of the primary display.
    fn primary_bounds(&self) -> Result<Rect, ControlError>;

    /// Copy `region` of the screen into `frame`.
    ///
    /// `frame` is always exactly `region.width`×`region.height`.
    fn capture(&mut self, region: Rect, frame: &mut Frame) -> Result<(), ControlError>;
}

/// Perceptual luma of one pixel.
pub fn luma(r: u8, g: u8, b: u8) -> f64 {
    0.299 * f64::from(r) + 0.587 * f64::from(g) + 0.114 * f64::from(b)
}

/// Average luma over every `stride`-th pixel of `frame` in both axes.
///
/// Returns `None` when nothing was sampled.
pub fn average_luma(frame: &Frame, stride: u32) -> Option<f32> {
    let stride = stride.max(1) as usize;
    let mut total = 0.0f64;
    let mut count = 0u32;

    for y in (0..frame.height()).step_by(stride) {
        for x in (0..frame.width()).step_by(stride) {
            if let Some((r, g, b)) = frame.pixel(x, y) {
                total += luma(r, g, b);
                count += 1;
            }
        }
    }

    (count > 0).then(|| (total / f64::from(count)) as f32)
}

/// Samples the average brightness of the center of the primary display.
pub struct LuminanceSampler {
    capture: Box<dyn ScreenCapture>,
    region_size: u32,
    stride: u32,
    frame: Frame,
    last: f32,
}

impl LuminanceSampler {
    /// Create a sampler using the region size and stride from `config`.
    pub fn new(capture: Box<dyn ScreenCapture>, config: &Config) -> Self {
        Self {
            capture,
            region_size: config.sample_region_size,
            stride: config.sample_stride,
            frame: Frame::new(config.sample_region_size, config.sample_region_size),
            last: FALLBACK_BRIGHTNESS,
        }
    }

    /// Current brightness (0-255).
    ///
    /// Never fails: on a capture error the previous sample is returned.
    pub fn sample(&mut self) -> f32 {
        match self.try_sample() {
            Ok(brightness) => {
                trace!("sampled brightness {:.1}", brightness);
                self.last = brightness;
                brightness
            }
            Err(e) => {
                warn!("screen capture failed, reusing {:.1}: {}", self.last, e);
                self.last
            }
        }
    }

    /// The last successfully computed brightness.
    pub fn last(&self) -> f32 {
        self.last
    }

    fn try_sample(&mut self) -> Result<f32, ControlError> {
        let bounds = self.capture.primary_bounds()?;
        let region = bounds.centered_square(self.region_size);
        self.capture.capture(region, &mut self.frame)?;
        average_luma(&self.frame, self.stride)
            .ok_or_else(|| ControlError::CaptureFailed("empty sample region".to_string()))
    }
}

impl std::fmt::Debug for LuminanceSampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LuminanceSampler")
            .field("region_size", &self.region_size)
            .field("stride", &self.stride)
            .field("last", &self.last)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockScreen;

    #[test]
    fn test_luma_weights() {
        assert_eq!(luma(0, 0, 0), 0.0);
        assert!((luma(255, 255, 255) - 255.0).abs() < 1e-9);
        assert!((luma(100, 0, 0) - 29.9).abs() < 1e-9);
        assert!((luma(0, 100, 0) - 58.7).abs() < 1e-9);
        assert!((luma(0, 0, 100) - 11.4).abs() < 1e-9);
    }

    #[test]
    fn test_average_uses_stride() {
        let mut frame = Frame::new(16, 16);
        // only the strided grid points are white
        for y in (0..16).step_by(8) {
            for x in (0..16).step_by(8) {
                frame.set_pixel(x, y, (255, 255, 255));
            }
        }
        let average = average_luma(&frame, 8).unwrap();
        assert!((average - 255.0).abs() < 1e-3);

        let dense = average_luma(&frame, 1).unwrap();
        assert!(dense < 5.0);
    }

    #[test]
    fn test_pixel_access_is_bounds_checked() {
        let mut frame = Frame::new(4, 2);
        frame.set_pixel(10, 10, (1, 2, 3));
        assert_eq!(frame.pixel(4, 0), None);
        assert_eq!(frame.pixel(0, 2), None);
        frame.set_pixel(3, 1, (1, 2, 3));
        assert_eq!(frame.pixel(3, 1), Some((1, 2, 3)));
    }

    #[test]
    fn test_centered_square() {
        let bounds = Rect::new(0, 0, 2560, 1440);
        assert_eq!(bounds.centered_square(400), Rect::new(1080, 520, 400, 400));

        let offset = Rect::new(-1920, 0, 1920, 1080);
        assert_eq!(offset.centered_square(400), Rect::new(-1160, 340, 400, 400));
    }

    #[test]
    fn test_sampler_averages_capture() {
        let screen = MockScreen::new(Rect::new(0, 0, 1920, 1080));
        screen.set_color((40, 40, 40));
        let mut sampler = LuminanceSampler::new(Box::new(screen.clone()), &Config::default());

        let brightness = sampler.sample();
        assert!((brightness - 40.0).abs() < 1e-3);
        assert_eq!(screen.last_region(), Some(Rect::new(760, 340, 400, 400)));
    }

    #[test]
    fn test_sampler_reuses_last_value_on_failure() {
        let screen = MockScreen::new(Rect::new(0, 0, 1920, 1080));
        screen.set_fail(true);
        let mut sampler = LuminanceSampler::new(Box::new(screen.clone()), &Config::default());
        assert_eq!(sampler.sample(), FALLBACK_BRIGHTNESS);

        screen.set_fail(false);
        screen.set_color((200, 200, 200));
        let bright = sampler.sample();
        assert!((bright - 200.0).abs() < 1e-3);

        screen.set_fail(true);
        screen.set_color((0, 0, 0));
        assert_eq!(sampler.sample(), bright);
        assert_eq!(sampler.last(), bright);
    }
}
