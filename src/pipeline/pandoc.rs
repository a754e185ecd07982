//! Subprocess converter: every non-PDF format goes through pandoc.
//!
//! pandoc is run with the output directory as its working directory and
//! with *relative* `-o` and `--extract-media` arguments. pandoc writes image
//! links exactly as the media path was given, so this keeps the links in the
//! Markdown relative to the Markdown file (`report_media/media/image1.png`)
//! instead of baking in wherever the output directory happened to live.

use crate::config::ConversionConfig;
use crate::error::Doc2MdError;
use crate::job::ConversionJob;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, warn};

const INSTALL_HINT: &str = "Install pandoc from https://pandoc.org/installing.html \
or point --pandoc / DOC2MD_PANDOC at the executable.";

/// Check pandoc is installed and runnable. Returns its version line.
pub async fn check_pandoc(pandoc: &str) -> Result<String, Doc2MdError> {
    let output = Command::new(program_path(pandoc))
        .arg("--version")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .output()
        .await
        .map_err(|e| Doc2MdError::ToolMissing {
            tool: "pandoc".to_string(),
            hint: format!("Could not run '{pandoc}': {e}\n{INSTALL_HINT}"),
        })?;

    if !output.status.success() {
        return Err(Doc2MdError::ToolMissing {
            tool: "pandoc".to_string(),
            hint: format!("'{pandoc} --version' exited with {}\n{INSTALL_HINT}", output.status),
        });
    }

    let version = String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .unwrap_or("pandoc")
        .trim()
        .to_string();
    debug!("Found {}", version);
    Ok(version)
}

/// Convert `job.input` to `job.markdown_path`, extracting media into
/// `job.media_dir`.
///
/// Success is decided by pandoc's exit code alone. On failure the tool's
/// stderr becomes the error message.
pub async fn convert_with_pandoc(
    job: &ConversionJob,
    config: &ConversionConfig,
) -> Result<(), Doc2MdError> {
    let input = absolute(&job.input)?;
    let markdown_name = file_name(&job.markdown_path);

    // A missing working directory also fails the spawn with NotFound, which
    // would otherwise read as a missing pandoc.
    if !job.output_dir.is_dir() {
        return Err(Doc2MdError::OutputWriteFailed {
            path: job.output_dir.clone(),
            source: std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "output directory does not exist",
            ),
        });
    }

    let mut cmd = Command::new(program_path(&config.pandoc_path));
    cmd.arg(&input)
        .arg("-o")
        .arg(&markdown_name)
        .arg(format!("--extract-media={}", job.media_dir_name()))
        .args(&config.pandoc_args)
        .current_dir(&job.output_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    info!("Running pandoc on {}", input.display());
    debug!("pandoc command: {:?}", cmd.as_std());

    let output = cmd.output().await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Doc2MdError::ToolMissing {
                tool: "pandoc".to_string(),
                hint: INSTALL_HINT.to_string(),
            }
        } else {
            Doc2MdError::Internal(format!("Failed to start pandoc: {e}"))
        }
    })?;

    let stderr = String::from_utf8_lossy(&output.stderr);
    if !output.status.success() {
        let message = match stderr.trim() {
            "" => format!("pandoc exited with {}", output.status),
            s => s.to_string(),
        };
        warn!("pandoc failed on {}: {}", input.display(), message);
        return Err(Doc2MdError::ConversionFailed {
            tool: "pandoc".to_string(),
            message,
        });
    }

    // pandoc reports recoverable problems (unsupported elements, missing
    // fonts) on stderr while still exiting 0.
    for line in stderr.lines().filter(|l| !l.trim().is_empty()) {
        warn!("pandoc: {}", line);
    }

    if !job.markdown_path.exists() {
        return Err(Doc2MdError::ConversionFailed {
            tool: "pandoc".to_string(),
            message: format!(
                "pandoc exited successfully but did not write {}",
                job.markdown_path.display()
            ),
        });
    }

    Ok(())
}

/// Make a pandoc path that contains a directory absolute, so it still
/// resolves after `current_dir` moves the child into the output folder.
/// Bare names are left for `PATH` lookup.
fn program_path(pandoc: &str) -> PathBuf {
    let p = Path::new(pandoc);
    if p.components().count() > 1 && p.is_relative() {
        std::path::absolute(p).unwrap_or_else(|_| p.to_path_buf())
    } else {
        p.to_path_buf()
    }
}

fn absolute(path: &Path) -> Result<PathBuf, Doc2MdError> {
    std::path::absolute(path)
        .map_err(|e| Doc2MdError::Internal(format!("Cannot resolve '{}': {e}", path.display())))
}

fn file_name(path: &Path) -> PathBuf {
    path.file_name()
        .map(PathBuf::from)
        .unwrap_or_else(|| path.to_path_buf())
}
