//! Revert the displays on Ctrl+C, Ctrl+Break and console close.

use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use autovibrance_core::{ActionSender, ControlError};
use log::{info, warn};
use windows_sys::Win32::System::Console::SetConsoleCtrlHandler;

/// Windows kills the process about 5s after a close event.
const REVERT_TIMEOUT: Duration = Duration::from_secs(4);

static ACTIONS: OnceLock<ActionSender> = OnceLock::new();
static REVERTED: AtomicBool = AtomicBool::new(false);

/// Register the console handler. It asks the worker to shut down and blocks
/// until [`mark_reverted`] is called or the timeout passes.
pub fn install(actions: ActionSender) -> Result<(), ControlError> {
    if ACTIONS.set(actions).is_err() {
        return Ok(());
    }
    let added = unsafe { SetConsoleCtrlHandler(Some(on_console_event), 1) };
    if added == 0 {
        return Err(ControlError::Io(std::io::Error::last_os_error()));
    }
    Ok(())
}

/// Signal that the worker has stopped and the displays are back to neutral.
pub fn mark_reverted() {
    REVERTED.store(true, Ordering::SeqCst);
}

unsafe extern "system" fn on_console_event(event: u32) -> i32 {
    let Some(actions) = ACTIONS.get() else {
        return 0;
    };

    info!("console event {}, reverting displays", event);
    actions.shutdown();

    let deadline = Instant::now() + REVERT_TIMEOUT;
    while !REVERTED.load(Ordering::SeqCst) {
        if Instant::now() >= deadline {
            warn!("displays not reverted within {:?}", REVERT_TIMEOUT);
            break;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    1
}
