//! Single application instance guard.

use windows_sys::Win32::{
    Foundation::{CloseHandle, ERROR_ALREADY_EXISTS, GetLastError, HANDLE},
    System::Threading::{CreateMutexW, ReleaseMutex},
};

use crate::error::ControlError;

/// Holds a named mutex for the lifetime of the process.
///
/// Dropping the guard releases the name so another instance may start.
#[derive(Debug)]
pub struct InstanceGuard {
    handle: HANDLE,
}

// Safety: the mutex handle is only closed once, in Drop
unsafe impl Send for InstanceGuard {}

impl InstanceGuard {
    /// Claim `name`.
    ///
    /// # Errors
    ///
    /// - [`ControlError::AlreadyRunning`] if another process holds the name
    /// - [`ControlError::Io`] if the mutex cannot be created
    pub fn acquire(name: &str) -> Result<Self, ControlError> {
        let wide: Vec<u16> = format!("Local\\{}\0", name).encode_utf16().collect();
        let handle = unsafe { CreateMutexW(std::ptr::null(), 1, wide.as_ptr()) };
        if handle.is_null() {
            return Err(ControlError::Io(std::io::Error::last_os_error()));
        }

        if unsafe { GetLastError() } == ERROR_ALREADY_EXISTS {
            unsafe {
                CloseHandle(handle);
            }
            return Err(ControlError::AlreadyRunning);
        }

        Ok(Self { handle })
    }
}

impl Drop for InstanceGuard {
    fn drop(&mut self) {
        unsafe {
            ReleaseMutex(self.handle);
            CloseHandle(self.handle);
        }
    }
}
