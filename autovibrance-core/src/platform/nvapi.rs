//! NVIDIA digital vibrance through the NVAPI driver library.

use std::ffi::c_void;
use std::sync::atomic::{AtomicBool, Ordering};

use libloading::{Library, Symbol};
use log::{debug, info};

use super::LevelRange;
use crate::display::{DisplayId, VibranceOutput};
use crate::error::ControlError;

#[cfg(target_pointer_width = "64")]
const NVAPI_DLL_NAME: &str = "nvapi64.dll";
#[cfg(not(target_pointer_width = "64"))]
const NVAPI_DLL_NAME: &str = "nvapi.dll";

const NVAPI_OK: i32 = 0;
const NVAPI_END_ENUMERATION: i32 = -7;

// nvapi_QueryInterface function ids
const ID_INITIALIZE: u32 = 0x0150_E828;
const ID_UNLOAD: u32 = 0xD22B_DD7E;
const ID_ENUM_DISPLAY_HANDLE: u32 = 0x9ABD_D40D;
const ID_GET_DVC_INFO: u32 = 0x4085_DE45;
const ID_SET_DVC_LEVEL: u32 = 0x1724_09B4;

type DisplayHandle = *mut c_void;

type QueryInterfaceFn = unsafe extern "C" fn(u32) -> *mut c_void;
type InitializeFn = unsafe extern "C" fn() -> i32;
type UnloadFn = unsafe extern "C" fn() -> i32;
type EnumDisplayHandleFn = unsafe extern "C" fn(u32, *mut DisplayHandle) -> i32;
type GetDvcInfoFn = unsafe extern "C" fn(DisplayHandle, u32, *mut DvcInfo) -> i32;
type SetDvcLevelFn = unsafe extern "C" fn(DisplayHandle, u32, i32) -> i32;

#[repr(C)]
#[derive(Debug, Default)]
struct DvcInfo {
    version: u32,
    current_level: i32,
    min_level: i32,
    max_level: i32,
}

impl DvcInfo {
    fn versioned() -> Self {
        Self {
            version: std::mem::size_of::<Self>() as u32 | (1 << 16),
            ..Default::default()
        }
    }
}

struct Target {
    id: DisplayId,
    handle: DisplayHandle,
    range: LevelRange,
}

/// Guard to ensure only one NVAPI session exists at a time.
static INSTANCE_EXISTS: AtomicBool = AtomicBool::new(false);

/// Digital vibrance control on NVIDIA GPUs.
///
/// # Limitations
///
/// Only one instance can exist at a time; the driver library is process
/// global and is unloaded when the instance is dropped.
pub struct NvVibrance {
    _lib: Library,
    unload: UnloadFn,
    enum_display_handle: EnumDisplayHandleFn,
    get_dvc_info: GetDvcInfoFn,
    set_dvc_level: SetDvcLevelFn,
    targets: Vec<Target>,
}

// Safety: the display handles and function pointers are only used with the
// driver library, which stays loaded for the lifetime of NvVibrance
unsafe impl Send for NvVibrance {}

impl NvVibrance {
    /// Load and initialize NVAPI.
    ///
    /// # Errors
    ///
    /// - [`ControlError::AlreadyInitialized`] if another instance already exists
    /// - [`ControlError::VendorLoad`] if the driver library is missing
    /// - [`ControlError::VendorUnavailable`] if an entry point is missing
    /// - [`ControlError::VendorCall`] if initialization fails
    pub fn new() -> Result<Self, ControlError> {
        if INSTANCE_EXISTS.swap(true, Ordering::SeqCst) {
            return Err(ControlError::AlreadyInitialized);
        }

        match Self::init_internal() {
            Ok(nvapi) => Ok(nvapi),
            Err(e) => {
                INSTANCE_EXISTS.store(false, Ordering::SeqCst);
                Err(e)
            }
        }
    }

    fn init_internal() -> Result<Self, ControlError> {
        unsafe {
            let lib = Library::new(NVAPI_DLL_NAME)?;
            let query: Symbol<QueryInterfaceFn> = lib.get(b"nvapi_QueryInterface")?;

            let initialize: InitializeFn = std::mem::transmute(resolve(&query, ID_INITIALIZE)?);
            let unload: UnloadFn = std::mem::transmute(resolve(&query, ID_UNLOAD)?);
            let enum_display_handle: EnumDisplayHandleFn =
                std::mem::transmute(resolve(&query, ID_ENUM_DISPLAY_HANDLE)?);
            let get_dvc_info: GetDvcInfoFn = std::mem::transmute(resolve(&query, ID_GET_DVC_INFO)?);
            let set_dvc_level: SetDvcLevelFn =
                std::mem::transmute(resolve(&query, ID_SET_DVC_LEVEL)?);

            let status = initialize();
            if status != NVAPI_OK {
                return Err(ControlError::VendorCall {
                    function: "NvAPI_Initialize",
                    status,
                });
            }
            info!("NVAPI initialized from {}", NVAPI_DLL_NAME);

            Ok(Self {
                _lib: lib,
                unload,
                enum_display_handle,
                get_dvc_info,
                set_dvc_level,
                targets: Vec::new(),
            })
        }
    }

    fn enumerate(&self) -> Result<Vec<Target>, ControlError> {
        let mut targets = Vec::new();
        for index in 0u32.. {
            let mut handle: DisplayHandle = std::ptr::null_mut();
            let status = unsafe { (self.enum_display_handle)(index, &mut handle) };
            if status == NVAPI_END_ENUMERATION {
                break;
            }
            if status != NVAPI_OK {
                return Err(ControlError::VendorCall {
                    function: "NvAPI_EnumNvidiaDisplayHandle",
                    status,
                });
            }

            let mut info = DvcInfo::versioned();
            let status = unsafe { (self.get_dvc_info)(handle, 0, &mut info) };
            if status != NVAPI_OK {
                debug!("display {} has no DVC support (status {})", index, status);
                continue;
            }

            let range = LevelRange {
                min: info.min_level,
                max: info.max_level,
            };
            debug!(
                "NVIDIA display {}: level {} in {}..={} ({}%)",
                index,
                info.current_level,
                range.min,
                range.max,
                range.level_to_percent(info.current_level)
            );
            targets.push(Target {
                id: DisplayId(format!("NVIDIA display {index}")),
                handle,
                range,
            });
        }
        Ok(targets)
    }
}

impl VibranceOutput for NvVibrance {
    fn displays(&mut self) -> Result<Vec<DisplayId>, ControlError> {
        self.targets = self.enumerate()?;
        Ok(self.targets.iter().map(|t| t.id.clone()).collect())
    }

    fn set_vibrance(&mut self, display: &DisplayId, percent: u8) -> Result<(), ControlError> {
        let target = self
            .targets
            .iter()
            .find(|t| &t.id == display)
            .ok_or_else(|| ControlError::VibranceWriteFailed {
                display: display.to_string(),
                status: NVAPI_END_ENUMERATION,
            })?;

        let level = target.range.percent_to_level(percent);
        let status = unsafe { (self.set_dvc_level)(target.handle, 0, level) };
        debug!("set DVC level {} ({}%) on {}, status: {}", level, percent, display, status);

        if status == NVAPI_OK {
            Ok(())
        } else {
            Err(ControlError::VibranceWriteFailed {
                display: display.to_string(),
                status,
            })
        }
    }
}

impl Drop for NvVibrance {
    fn drop(&mut self) {
        unsafe {
            (self.unload)();
        }
        INSTANCE_EXISTS.store(false, Ordering::SeqCst);
    }
}

impl std::fmt::Debug for NvVibrance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NvVibrance")
            .field("displays", &self.targets.iter().map(|t| &t.id).collect::<Vec<_>>())
            .finish()
    }
}

unsafe fn resolve(query: &Symbol<QueryInterfaceFn>, id: u32) -> Result<*mut c_void, ControlError> {
    let ptr = unsafe { query(id) };
    if ptr.is_null() {
        debug!("nvapi_QueryInterface({:#010x}) returned null", id);
        return Err(ControlError::VendorUnavailable);
    }
    Ok(ptr)
}
