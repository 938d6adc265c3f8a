//! `gh release download` backend.

use super::Downloader;
use anyhow::{bail, Context, Result};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Downloads release assets by shelling out to the GitHub CLI.
#[derive(Debug, Clone)]
pub struct GhCliDownloader {
    executable: PathBuf,
}

impl GhCliDownloader {
    /// Locates `gh` on `PATH`.
    pub fn new() -> Result<Self> {
        let executable = which::which("gh").context("Can't find gh command line tool")?;
        Ok(Self { executable })
    }

    pub fn with_executable(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
        }
    }
}

impl Downloader for GhCliDownloader {
    fn download_release_asset(
        &self,
        repo: &str,
        tag: &str,
        pattern: Option<&str>,
        output_file: &Path,
    ) -> Result<()> {
        tracing::info!(
            "[Download] {} release asset with tag {} to {}",
            repo,
            tag,
            output_file.display()
        );
        let args = release_download_args(repo, tag, pattern, output_file);
        run_command(&self.executable, &args, output_file.parent())?;
        Ok(())
    }
}

/// `release download <tag> [--pattern <p>] --repo <repo> --output <file>`
fn release_download_args(
    repo: &str,
    tag: &str,
    pattern: Option<&str>,
    output_file: &Path,
) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["release".into(), "download".into(), tag.into()];
    if let Some(pattern) = pattern {
        args.push("--pattern".into());
        args.push(pattern.into());
    }
    args.push("--repo".into());
    args.push(repo.into());
    args.push("--output".into());
    args.push(output_file.as_os_str().to_owned());
    args
}

/// Runs `executable` and returns trimmed stdout. Non-zero exit is an error carrying both streams.
fn run_command(executable: &Path, args: &[OsString], cwd: Option<&Path>) -> Result<String> {
    let rendered = args
        .iter()
        .map(|a| a.to_string_lossy())
        .collect::<Vec<_>>()
        .join(" ");
    tracing::debug!("[Run] {} {}", executable.display(), rendered);

    let mut command = Command::new(executable);
    command.args(args);
    if let Some(dir) = cwd.filter(|d| !d.as_os_str().is_empty()) {
        command.current_dir(dir);
    }
    let output = command
        .output()
        .with_context(|| format!("failed to launch {}", executable.display()))?;

    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    if !output.status.success() {
        bail!(
            "Error running {} with arguments {} ({}). Output:\n{}\nError:\n{}",
            executable.display(),
            rendered,
            output.status,
            stdout,
            stderr
        );
    }
    Ok(stdout)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_with_pattern() {
        let args = release_download_args("org/repo", "1.0.0", Some("*.zip"), Path::new("/c/x.zip"));
        let args: Vec<_> = args.iter().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(
            args,
            vec![
                "release", "download", "1.0.0", "--pattern", "*.zip", "--repo", "org/repo",
                "--output", "/c/x.zip"
            ]
        );
    }

    #[test]
    fn args_without_pattern() {
        let args = release_download_args("org/repo", "v2", None, Path::new("out.zip"));
        assert!(!args.iter().any(|a| a == "--pattern"));
        assert_eq!(args.len(), 7);
    }

    #[cfg(unix)]
    #[test]
    fn run_command_reports_failure_output() {
        let args: Vec<OsString> = vec!["-c".into(), "echo out; echo err >&2; exit 3".into()];
        let err = run_command(Path::new("/bin/sh"), &args, None).unwrap_err();
        let msg = format!("{:#}", err);
        assert!(msg.contains("out"), "{}", msg);
        assert!(msg.contains("err"), "{}", msg);
    }

    #[cfg(unix)]
    #[test]
    fn run_command_returns_trimmed_stdout() {
        let args: Vec<OsString> = vec!["-c".into(), "echo '  hi  '".into()];
        let out = run_command(Path::new("/bin/sh"), &args, None).unwrap();
        assert_eq!(out, "hi");
    }

    #[cfg(unix)]
    #[test]
    fn downloader_invokes_executable_in_output_dir() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        // Fake gh: writes its arguments to the --output path (last argument).
        let script = dir.path().join("gh");
        let body = "#!/bin/sh\nfor last; do :; done\necho \"$@\" > \"$last\"\n";
        std::fs::write(&script, body).unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let output = dir.path().join("abc.zip");
        GhCliDownloader::with_executable(&script)
            .download_release_asset("org/repo", "1.0.0", Some("lib.zip"), &output)
            .unwrap();
        let written = std::fs::read_to_string(&output).unwrap();
        assert!(written.starts_with("release download 1.0.0 --pattern lib.zip --repo org/repo"));
    }
}
