use std::path::{Path, PathBuf};
use crate::error::{Result, SupportError};

const MARKERS: &[&str] = &["MODULE.bazel", "REPO.bazel", "WORKSPACE.bazel", "WORKSPACE"];

pub const COMMAND_LOG: &str = "command.log";

/// Walk up from `start` to find the Bazel workspace root.
/// Returns the first directory holding one of the boundary marker files.
pub fn find_root(start: &Path) -> Result<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        if MARKERS.iter().any(|marker| current.join(marker).is_file()) {
            return Ok(current);
        }
        if !current.pop() {
            return Err(SupportError::NotInWorkspace(start.display().to_string()));
        }
    }
}

pub fn command_log_path(output_base: &Path) -> PathBuf {
    output_base.join(COMMAND_LOG)
}
