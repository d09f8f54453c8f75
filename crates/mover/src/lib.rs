//! Archive mover
//!
//! Plans or performs `mv -n` style moves of archived G-code files from the
//! gcode directory into the archive directory. Failures are per-file; only a
//! missing source directory stops the run.

use std::fmt;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use tokio::fs;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum MoveError {
    #[error("G-code directory not found or not a directory: {0}")]
    SourceDirMissing(PathBuf),
    #[error("refusing unsafe file name {0:?}")]
    UnsafeName(String),
    #[error("{0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Print the commands only.
    DryRun,
    Execute,
}

/// What happened to one archive candidate.
#[derive(Debug, Clone, PartialEq)]
pub enum MoveOutcome {
    Planned { src: PathBuf, dst: PathBuf },
    Moved { src: PathBuf, dst: PathBuf },
    Missing { src: PathBuf },
    /// The source already lives under the archive directory.
    AlreadyArchived { src: PathBuf },
    DestinationExists { src: PathBuf, dst: PathBuf },
    Refused { name: String, reason: String },
    Failed { src: PathBuf, dst: PathBuf, error: String },
}

impl MoveOutcome {
    /// Outcomes that are only worth printing in verbose mode.
    pub fn is_quiet(&self) -> bool {
        matches!(self, MoveOutcome::Missing { .. } | MoveOutcome::AlreadyArchived { .. })
    }
}

impl fmt::Display for MoveOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MoveOutcome::Planned { src, dst } => {
                write!(f, "mv -n \"{}\" \"{}\"", src.display(), dst.display())
            }
            MoveOutcome::Moved { src, dst } => {
                write!(f, "moved: {} -> {}", src.display(), dst.display())
            }
            MoveOutcome::Missing { src } => write!(f, "skip (missing): {}", src.display()),
            MoveOutcome::AlreadyArchived { src } => write!(f, "skip (archived): {}", src.display()),
            MoveOutcome::DestinationExists { dst, .. } => {
                write!(f, "skip (exists): {}", dst.display())
            }
            MoveOutcome::Refused { name, reason } => write!(f, "skip (refused): {} ({})", name, reason),
            MoveOutcome::Failed { src, dst, error } => {
                write!(f, "error moving {} -> {}: {}", src.display(), dst.display(), error)
            }
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MoveSummary {
    pub planned: usize,
    pub moved: usize,
    pub missing: usize,
    pub archived: usize,
    pub existing: usize,
    pub refused: usize,
    pub failed: usize,
}

impl MoveSummary {
    fn record(&mut self, outcome: &MoveOutcome) {
        match outcome {
            MoveOutcome::Planned { .. } => self.planned += 1,
            MoveOutcome::Moved { .. } => self.moved += 1,
            MoveOutcome::Missing { .. } => self.missing += 1,
            MoveOutcome::AlreadyArchived { .. } => self.archived += 1,
            MoveOutcome::DestinationExists { .. } => self.existing += 1,
            MoveOutcome::Refused { .. } => self.refused += 1,
            MoveOutcome::Failed { .. } => self.failed += 1,
        }
    }
}

pub struct Mover {
    gcode_dir: PathBuf,
    archive_dir: PathBuf,
    mode: Mode,
}

impl Mover {
    pub fn new(gcode_dir: impl Into<PathBuf>, archive_dir: impl Into<PathBuf>, mode: Mode) -> Self {
        Self {
            gcode_dir: gcode_dir.into(),
            archive_dir: archive_dir.into(),
            mode,
        }
    }

    pub fn archive_dir(&self) -> &Path {
        &self.archive_dir
    }

    /// Process every name in order, reporting each outcome as it happens.
    pub async fn archive<I, S, F>(&self, names: I, mut on_outcome: F) -> Result<MoveSummary, MoveError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        F: FnMut(&MoveOutcome),
    {
        let mut names = names.into_iter().peekable();
        let mut summary = MoveSummary::default();

        if names.peek().is_none() {
            return Ok(summary);
        }

        match fs::metadata(&self.gcode_dir).await {
            Ok(meta) if meta.is_dir() => {}
            _ => return Err(MoveError::SourceDirMissing(self.gcode_dir.clone())),
        }

        for name in names {
            let outcome = self.process(name.as_ref()).await;
            summary.record(&outcome);
            on_outcome(&outcome);
        }

        Ok(summary)
    }

    async fn process(&self, name: &str) -> MoveOutcome {
        let relative = match safe_relative_path(name) {
            Ok(p) => p,
            Err(e) => {
                warn!("{}", e);
                return MoveOutcome::Refused {
                    name: name.to_string(),
                    reason: "path escapes the gcode directory".to_string(),
                };
            }
        };

        let src = self.gcode_dir.join(&relative);
        let dst = self.archive_dir.join(&relative);

        // archive dir usually sits inside the gcode dir, so Moonraker lists its contents too
        if src.starts_with(&self.archive_dir) {
            return MoveOutcome::AlreadyArchived { src };
        }

        match fs::symlink_metadata(&src).await {
            // a symlink is moved as a link, like mv does
            Ok(meta) if meta.is_file() || meta.file_type().is_symlink() => {}
            Ok(_) => {
                debug!("Not a regular file, skipping: {}", src.display());
                return MoveOutcome::Missing { src };
            }
            Err(e) => {
                debug!("Source unavailable ({}): {}", e, src.display());
                return MoveOutcome::Missing { src };
            }
        }

        // mv -n: never clobber, dangling symlinks included
        if fs::symlink_metadata(&dst).await.is_ok() {
            return MoveOutcome::DestinationExists { src, dst };
        }

        if self.mode == Mode::DryRun {
            return MoveOutcome::Planned { src, dst };
        }

        match move_file(&src, &dst).await {
            Ok(()) => MoveOutcome::Moved { src, dst },
            Err(e) => {
                warn!("Failed to move {}: {}", src.display(), e);
                MoveOutcome::Failed { src, dst, error: e.to_string() }
            }
        }
    }
}

/// Interpret a metadata key as a path relative to the gcode directory.
/// Absolute paths and `..` components are rejected.
pub fn safe_relative_path(name: &str) -> Result<PathBuf, MoveError> {
    let mut out = PathBuf::new();
    for component in Path::new(name).components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(MoveError::UnsafeName(name.to_string()));
            }
        }
    }

    if out.as_os_str().is_empty() {
        return Err(MoveError::UnsafeName(name.to_string()));
    }
    Ok(out)
}

/// Rename, falling back to copy + remove across filesystems.
async fn move_file(src: &Path, dst: &Path) -> Result<(), MoveError> {
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent).await?;
    }

    match fs::rename(src, dst).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::CrossesDevices => {
            debug!("Cross-device move, copying {}", src.display());
            if let Err(copy_err) = copy_across_devices(src, dst).await {
                let _ = fs::remove_file(dst).await;
                return Err(copy_err);
            }
            fs::remove_file(src).await?;
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(unix)]
async fn copy_across_devices(src: &Path, dst: &Path) -> Result<(), MoveError> {
    if fs::symlink_metadata(src).await?.file_type().is_symlink() {
        let target = fs::read_link(src).await?;
        fs::symlink(target, dst).await?;
        return Ok(());
    }

    copy_preserving_mtime(src, dst).await
}

#[cfg(not(unix))]
async fn copy_across_devices(src: &Path, dst: &Path) -> Result<(), MoveError> {
    copy_preserving_mtime(src, dst).await
}

/// Copy contents and keep the modification time; Moonraker derives `modified` from it.
async fn copy_preserving_mtime(src: &Path, dst: &Path) -> Result<(), MoveError> {
    let modified = fs::metadata(src).await?.modified()?;
    fs::copy(src, dst).await?;

    let file = fs::OpenOptions::new().write(true).open(dst).await?.into_std().await;
    tokio::task::spawn_blocking(move || file.set_modified(modified))
        .await
        .map_err(|e| MoveError::Io(std::io::Error::other(e)))??;
    Ok(())
}
