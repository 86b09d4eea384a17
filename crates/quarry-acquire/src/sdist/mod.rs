//! Source distribution builds and source checkouts

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::info;

use quarry_core::error::QuarryError;

use crate::process::{CommandRunner, OutputLevel};
use crate::AcquireResult;

#[cfg(test)]
mod tests;

const PYTHON: &str = "python";
const GIT: &str = "git";

/// Clone `repo_url` into `<work_dir>/<checkout_name>`
pub async fn checkout_from_git(
    runner: &dyn CommandRunner,
    work_dir: &Path,
    repo_url: &str,
    checkout_name: &str,
) -> AcquireResult<PathBuf> {
    let checkout = work_dir.join(checkout_name);
    let args = vec![
        OsString::from("clone"),
        OsString::from(repo_url),
        checkout.clone().into_os_string(),
    ];
    runner.run(GIT, &args, OutputLevel::Debug).await?;
    info!("Cloned {} into {}", repo_url, checkout.display());
    Ok(checkout)
}

/// Build a source distribution of `source_dir` inside a fresh
/// subdirectory of `dest_dir`; exactly one tarball must come out.
pub async fn create_sdist(
    runner: &dyn CommandRunner,
    source_dir: &Path,
    dest_dir: &Path,
) -> AcquireResult<PathBuf> {
    let cannot_build = |reason: String| QuarryError::CannotBuild {
        source_dir: source_dir.display().to_string(),
        reason,
    };

    let prefix = source_dir
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "sdist".to_string());
    let dist_dir = tempfile::Builder::new()
        .prefix(&prefix)
        .tempdir_in(dest_dir)
        .map_err(|e| QuarryError::io(format!("Failed to create build directory in {}", dest_dir.display()), e))?
        .into_path();

    let args = vec![
        OsString::from("-m"),
        OsString::from("build"),
        OsString::from("--sdist"),
        OsString::from("--outdir"),
        dist_dir.clone().into_os_string(),
        source_dir.as_os_str().to_os_string(),
    ];
    runner
        .run(PYTHON, &args, OutputLevel::Warn)
        .await
        .map_err(|e| cannot_build(e.to_string()))?;

    let mut entries = tokio::fs::read_dir(&dist_dir)
        .await
        .map_err(|e| QuarryError::io(format!("Failed to list {}", dist_dir.display()), e))?;
    let mut tarballs = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| QuarryError::io(format!("Failed to list {}", dist_dir.display()), e))?
    {
        if entry.file_name().to_string_lossy().ends_with("tar.gz") {
            tarballs.push(entry.path());
        }
    }

    match tarballs.len() {
        0 => Err(cannot_build("did not create a tar.gz".to_string())),
        1 => {
            let sdist = tarballs.remove(0);
            info!("Built {}", sdist.display());
            Ok(sdist)
        },
        _ => Err(cannot_build(
            "created more than one tar.gz files which is not yet supported".to_string(),
        )),
    }
}
