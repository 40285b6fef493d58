//! Locating executables and interpreting how they exited.

use crate::command::ExitCode;
use std::borrow::Cow;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;

/// Exit code for a finished child, mapping signal deaths to `128 + signal`.
pub fn exit_code(status: ExitStatus) -> ExitCode {
    match status.code() {
        Some(x) => x,
        None => terminated_by_signal(status),
    }
}

#[cfg(unix)]
fn terminated_by_signal(exit_status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    if let Some(signal) = ExitStatusExt::signal(&exit_status) {
        128 + signal
    } else if ExitStatusExt::core_dumped(&exit_status) {
        255
    } else {
        -1
    }
}

#[cfg(not(unix))]
fn terminated_by_signal(_exit_status: ExitStatus) -> i32 {
    -1
}

/// Locate the executable a pipeline stage names.
///
/// `/abs/prog` must exist as given; `./prog` and `dir/prog` are looked up
/// under `cwd`; a bare `prog` is searched for in each `search_paths` entry and
/// must be a regular file there. Off Unix, `cwd` is also tried for bare names.
pub fn find_command_path<'a>(
    search_paths: &OsStr,
    path: &'a Path,
    cwd: &Path,
) -> Option<Cow<'a, Path>> {
    if path.is_absolute() {
        return find_by_path(path).map(Cow::Borrowed);
    }

    let search_in_current_dir = cfg!(not(unix)) || path.starts_with("./");
    if search_in_current_dir {
        let candidate = cwd.join(path);
        if candidate.exists() {
            return Some(Cow::Owned(candidate));
        }
    }

    let mut components = path.components();
    let first = components.next();
    let second = components.next();
    match (first, second) {
        (None, None) => None,
        (Some(x), None) => find_in_path(search_paths, x.as_os_str()).map(Cow::Owned),
        _ => {
            let candidate = cwd.join(path);
            candidate.exists().then_some(Cow::Owned(candidate))
        }
    }
}

fn find_in_path(search_paths: &OsStr, cmd: &OsStr) -> Option<PathBuf> {
    std::env::split_paths(search_paths)
        .map(|dir| dir.join(cmd))
        .find(|candidate| candidate.is_file())
}

fn find_by_path(path: &Path) -> Option<&Path> {
    path.exists().then_some(path)
}
