//! Target process presence.

/// Answers whether a named process is currently running.
///
/// This allows for mock implementations in tests.
pub trait ProcessProbe: Send {
    /// Whether a process called `name` (no extension, case-insensitive) runs.
    fn is_running(&mut self, name: &str) -> bool;
}

/// Whether an executable file name refers to the process `name`.
///
/// Matches the file stem case-insensitively, so `PioneerGame` matches
/// `PioneerGame.exe` and `pioneergame.EXE`.
pub fn matches_process_name(exe_file: &str, name: &str) -> bool {
    let stem = match exe_file.rsplit_once('.') {
        Some((stem, ext)) if ext.eq_ignore_ascii_case("exe") => stem,
        _ => exe_file,
    };
    stem.eq_ignore_ascii_case(name)
}
