//! Process presence through a ToolHelp process snapshot.

use log::warn;
use windows_sys::Win32::{
    Foundation::{CloseHandle, INVALID_HANDLE_VALUE},
    System::Diagnostics::ToolHelp::{
        CreateToolhelp32Snapshot, PROCESSENTRY32W, Process32FirstW, Process32NextW,
        TH32CS_SNAPPROCESS,
    },
};

use crate::process::{ProcessProbe, matches_process_name};

/// Looks the target up in a fresh process snapshot on every poll.
#[derive(Debug, Default)]
pub struct ToolhelpProbe;

impl ToolhelpProbe {
    /// Create the probe.
    pub fn new() -> Self {
        Self
    }
}

impl ProcessProbe for ToolhelpProbe {
    fn is_running(&mut self, name: &str) -> bool {
        let snapshot = unsafe { CreateToolhelp32Snapshot(TH32CS_SNAPPROCESS, 0) };
        if snapshot == INVALID_HANDLE_VALUE || snapshot.is_null() {
            warn!("process snapshot failed, assuming '{}' is not running", name);
            return false;
        }

        let mut entry: PROCESSENTRY32W = unsafe { std::mem::zeroed() };
        entry.dwSize = std::mem::size_of::<PROCESSENTRY32W>() as u32;

        let mut found = false;
        let mut more = unsafe { Process32FirstW(snapshot, &mut entry) } != 0;
        while more {
            let len = entry.szExeFile.iter().take_while(|&&c| c != 0).count();
            let exe = String::from_utf16_lossy(&entry.szExeFile[..len]);
            if matches_process_name(&exe, name) {
                found = true;
                break;
            }
            more = unsafe { Process32NextW(snapshot, &mut entry) } != 0;
        }

        unsafe {
            CloseHandle(snapshot);
        }
        found
    }
}
