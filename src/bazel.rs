use std::io::ErrorKind;
use std::path::PathBuf;
use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;
use crate::error::{Result, SupportError};
use crate::workspace;

/// Something that can report where the build tool keeps its outputs.
#[async_trait]
pub trait BuildTool: Send + Sync {
    async fn output_base(&self) -> Result<PathBuf>;
}

/// A `bazel` (or `bazelisk`) binary invoked from a directory inside a workspace.
#[derive(Debug, Clone)]
pub struct Bazel {
    binary: String,
    dir: PathBuf,
}

impl Bazel {
    pub fn new(binary: impl Into<String>, dir: impl Into<PathBuf>) -> Self {
        Bazel {
            binary: binary.into(),
            dir: dir.into(),
        }
    }

    /// Root of the workspace enclosing the starting directory.
    pub fn workspace(&self) -> Result<PathBuf> {
        workspace::find_root(&self.dir)
    }

    /// Run `<binary> <args...>` in the workspace and return its stdout.
    pub async fn run_command(&self, args: &[&str]) -> Result<String> {
        let root = self.workspace()?;
        let command = format!("{} {}", self.binary, args.join(" "));
        debug!(command = %command, workspace = %root.display(), "running build tool");

        let output = Command::new(&self.binary)
            .args(args)
            .current_dir(&root)
            .output()
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => SupportError::BuildToolMissing {
                    binary: self.binary.clone(),
                },
                _ => SupportError::Other(format!("Failed to run {}: {}", command, e)),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SupportError::BuildTool {
                command,
                stderr: stderr.trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl BuildTool for Bazel {
    async fn output_base(&self) -> Result<PathBuf> {
        let stdout = self.run_command(&["info", "output_base"]).await?;
        parse_output_base(&stdout)
    }
}

pub(crate) fn parse_output_base(stdout: &str) -> Result<PathBuf> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Err(SupportError::Other(
            "bazel info output_base printed nothing".to_string(),
        ));
    }
    Ok(PathBuf::from(trimmed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn parse_output_base_trims_whitespace() {
        let path = parse_output_base("  /tmp/_bazel_me/abc\n").unwrap();
        assert_eq!(path, PathBuf::from("/tmp/_bazel_me/abc"));
    }

    #[test]
    fn parse_output_base_rejects_blank_output() {
        assert!(parse_output_base(" \n\t").is_err());
    }

    fn workspace_dir() -> TempDir {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("MODULE.bazel"), "").unwrap();
        tmp
    }

    #[test]
    fn workspace_resolves_from_package_dir() {
        let tmp = workspace_dir();
        let pkg = tmp.path().join("pkg");
        std::fs::create_dir(&pkg).unwrap();

        let bazel = Bazel::new("bazel", &pkg);
        assert_eq!(bazel.workspace().unwrap(), tmp.path());
    }

    #[tokio::test]
    async fn missing_binary_is_reported_by_name() {
        let tmp = workspace_dir();
        let bazel = Bazel::new("definitely-not-bazel-xyz", tmp.path());
        let err = bazel.output_base().await.unwrap_err();
        assert!(matches!(err, SupportError::BuildToolMissing { .. }));
        assert!(err.to_string().contains("definitely-not-bazel-xyz not found in PATH"));
    }

    #[cfg(unix)]
    fn fake_bazel(dir: &std::path::Path, script: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("fake-bazel");
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", script)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn output_base_runs_info_in_workspace() {
        let tmp = workspace_dir();
        let bin = fake_bazel(
            tmp.path(),
            "[ \"$1 $2\" = \"info output_base\" ] || exit 3\necho \"$(pwd)/out\"",
        );
        let bazel = Bazel::new(bin.display().to_string(), tmp.path());

        let base = bazel.output_base().await.unwrap();
        assert_eq!(base.file_name().unwrap(), "out");
        assert_eq!(
            base.parent().unwrap().canonicalize().unwrap(),
            tmp.path().canonicalize().unwrap()
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn outside_a_workspace_nothing_runs() {
        let tools = TempDir::new().unwrap();
        let marker = tools.path().join("bazel-called");
        let bin = fake_bazel(
            tools.path(),
            &format!("touch '{}'\necho /tmp/out", marker.display()),
        );
        let tmp = TempDir::new().unwrap();
        let bazel = Bazel::new(bin.display().to_string(), tmp.path());

        let err = bazel.output_base().await.unwrap_err();
        assert!(matches!(err, SupportError::NotInWorkspace(_)), "{err:?}");
        assert!(err.to_string().starts_with("Not inside a Bazel workspace"));
        assert!(!marker.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn non_zero_exit_carries_stderr() {
        let tmp = workspace_dir();
        let bin = fake_bazel(tmp.path(), "echo 'ERROR: server crashed' >&2\nexit 2");
        let bazel = Bazel::new(bin.display().to_string(), tmp.path());

        let err = bazel.output_base().await.unwrap_err();
        assert!(err.to_string().contains("info output_base failed: ERROR: server crashed"));
    }
}
