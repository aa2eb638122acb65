//! GDI gamma ramps and screen capture.

use std::ffi::c_void;

use log::trace;
use windows_sys::Win32::{
    Graphics::Gdi::{
        BI_RGB, BITMAPINFO, BITMAPINFOHEADER, BitBlt, CAPTUREBLT, CreateCompatibleBitmap,
        CreateCompatibleDC, CreateDCW, DIB_RGB_COLORS, DISPLAY_DEVICE_ACTIVE,
        DISPLAY_DEVICE_MIRRORING_DRIVER, DISPLAY_DEVICEW, DeleteDC, DeleteObject,
        EnumDisplayDevicesW, GetDC, GetDIBits, HDC, ReleaseDC, SRCCOPY, SelectObject,
    },
    UI::{
        ColorSystem::SetDeviceGammaRamp,
        WindowsAndMessaging::{GetSystemMetrics, SM_CXSCREEN, SM_CYSCREEN},
    },
};

use crate::display::{DisplayId, GammaOutput};
use crate::error::ControlError;
use crate::gamma::GammaRamp;
use crate::sampler::{Frame, Rect, ScreenCapture};

// =============================================================================
// Gamma
// =============================================================================

/// Writes gamma ramps through `SetDeviceGammaRamp`, one device context per
/// active display adapter output.
#[derive(Debug, Default)]
pub struct GdiGamma;

impl GdiGamma {
    /// Create the GDI gamma output.
    pub fn new() -> Self {
        Self
    }
}

impl GammaOutput for GdiGamma {
    fn displays(&self) -> Result<Vec<DisplayId>, ControlError> {
        let mut displays = Vec::new();
        let mut index = 0u32;

        loop {
            let mut device: DISPLAY_DEVICEW = unsafe { std::mem::zeroed() };
            device.cb = std::mem::size_of::<DISPLAY_DEVICEW>() as u32;

            let found = unsafe { EnumDisplayDevicesW(std::ptr::null(), index, &mut device, 0) };
            if found == 0 {
                break;
            }
            index += 1;

            let active = device.StateFlags & DISPLAY_DEVICE_ACTIVE != 0;
            let mirror = device.StateFlags & DISPLAY_DEVICE_MIRRORING_DRIVER != 0;
            if active && !mirror {
                displays.push(DisplayId(from_wide(&device.DeviceName)));
            }
        }

        if displays.is_empty() {
            return Err(ControlError::DisplayEnumeration(
                "no active display devices".to_string(),
            ));
        }
        trace!("gamma displays: {:?}", displays);
        Ok(displays)
    }

    fn set_gamma_ramp(&mut self, display: &DisplayId, ramp: &GammaRamp) -> Result<(), ControlError> {
        let device = to_wide(&display.0);
        let hdc = unsafe {
            CreateDCW(
                std::ptr::null(),
                device.as_ptr(),
                std::ptr::null(),
                std::ptr::null(),
            )
        };
        if hdc.is_null() {
            return Err(ControlError::GammaWriteFailed {
                display: display.to_string(),
            });
        }

        let table = ramp.to_driver_table();
        let result = unsafe { SetDeviceGammaRamp(hdc, table.as_ptr().cast::<c_void>()) };
        unsafe {
            DeleteDC(hdc);
        }

        if result == 0 {
            return Err(ControlError::GammaWriteFailed {
                display: display.to_string(),
            });
        }
        Ok(())
    }
}

// =============================================================================
// Capture
// =============================================================================

/// Copies screen pixels with `BitBlt` from the desktop device context.
#[derive(Debug, Default)]
pub struct GdiCapture;

impl GdiCapture {
    /// Create the GDI capture source.
    pub fn new() -> Self {
        Self
    }
}

/// Releases the GDI objects of one capture, in reverse order of creation.
struct CaptureContext {
    screen: HDC,
    memory: HDC,
    bitmap: *mut c_void,
    previous: *mut c_void,
}

impl Drop for CaptureContext {
    fn drop(&mut self) {
        unsafe {
            if !self.previous.is_null() {
                SelectObject(self.memory, self.previous);
            }
            if !self.bitmap.is_null() {
                DeleteObject(self.bitmap);
            }
            if !self.memory.is_null() {
                DeleteDC(self.memory);
            }
            ReleaseDC(std::ptr::null_mut(), self.screen);
        }
    }
}

impl ScreenCapture for GdiCapture {
    fn primary_bounds(&self) -> Result<Rect, ControlError> {
        let (width, height) = unsafe { (GetSystemMetrics(SM_CXSCREEN), GetSystemMetrics(SM_CYSCREEN)) };
        if width <= 0 || height <= 0 {
            return Err(ControlError::CaptureFailed(
                "primary display has no size".to_string(),
            ));
        }
        Ok(Rect::new(0, 0, width as u32, height as u32))
    }

    fn capture(&mut self, region: Rect, frame: &mut Frame) -> Result<(), ControlError> {
        let failed = |what: &str| ControlError::CaptureFailed(what.to_string());
        let (width, height) = (frame.width() as i32, frame.height() as i32);

        let screen = unsafe { GetDC(std::ptr::null_mut()) };
        if screen.is_null() {
            return Err(failed("GetDC"));
        }
        let mut ctx = CaptureContext {
            screen,
            memory: std::ptr::null_mut(),
            bitmap: std::ptr::null_mut(),
            previous: std::ptr::null_mut(),
        };

        unsafe {
            ctx.memory = CreateCompatibleDC(ctx.screen);
            if ctx.memory.is_null() {
                return Err(failed("CreateCompatibleDC"));
            }
            ctx.bitmap = CreateCompatibleBitmap(ctx.screen, width, height);
            if ctx.bitmap.is_null() {
                return Err(failed("CreateCompatibleBitmap"));
            }
            ctx.previous = SelectObject(ctx.memory, ctx.bitmap);

            let copied = BitBlt(
                ctx.memory,
                0,
                0,
                width,
                height,
                ctx.screen,
                region.x,
                region.y,
                SRCCOPY | CAPTUREBLT,
            );
            if copied == 0 {
                return Err(failed("BitBlt"));
            }

            let mut info: BITMAPINFO = std::mem::zeroed();
            info.bmiHeader = BITMAPINFOHEADER {
                biSize: std::mem::size_of::<BITMAPINFOHEADER>() as u32,
                biWidth: width,
                // negative height: top-down rows
                biHeight: -height,
                biPlanes: 1,
                biBitCount: 32,
                biCompression: BI_RGB,
                ..std::mem::zeroed()
            };

            // the bitmap must not be selected while GetDIBits reads it
            SelectObject(ctx.memory, ctx.previous);
            ctx.previous = std::ptr::null_mut();

            let lines = GetDIBits(
                ctx.memory,
                ctx.bitmap,
                0,
                height as u32,
                frame.as_bytes_mut().as_mut_ptr().cast::<c_void>(),
                &mut info,
                DIB_RGB_COLORS,
            );
            if lines != height {
                return Err(failed("GetDIBits"));
            }
        }

        trace!("captured {}x{} at ({}, {})", width, height, region.x, region.y);
        Ok(())
    }
}

fn to_wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}

fn from_wide(buffer: &[u16]) -> String {
    let len = buffer.iter().take_while(|&&c| c != 0).count();
    String::from_utf16_lossy(&buffer[..len])
}
