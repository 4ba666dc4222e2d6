//! Output directory layout for survey runs.
//!
//! ```text
//! <base>/surveyor/<invocation>/survey   surveyed ADGs (kept)
//! <base>/surveyor/<invocation>/tmp      scratch space (removed after surveying)
//! ```
//!
//! `<base>` is the explicit `--output` path when given, otherwise the process-wide
//! default from [`default_base_dir`].

use chrono::Utc;
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

pub const APP_DIR_NAME: &str = ".spicelabs";
pub const SURVEYOR_DIR: &str = "surveyor";
pub const SURVEY_DIR: &str = "survey";
pub const SCRATCH_DIR: &str = "tmp";

const VAR_TMP: &str = "/var/tmp";
const TMP: &str = "/tmp";
const MAX_CREATE_ATTEMPTS: usize = 16;

static DEFAULT_BASE: OnceLock<PathBuf> = OnceLock::new();

/// Base directory chosen once per process.
pub fn default_base_dir() -> &'static Path {
    DEFAULT_BASE.get_or_init(|| {
        let home = dirs::home_dir();
        select_base_dir(home.as_deref(), Path::new(VAR_TMP).is_dir())
    })
}

/// Fallback chain: home dir (unless unset, blank or `/`), then `/var/tmp`, then `/tmp`.
/// Each fallback taken is logged as a warning.
pub fn select_base_dir(home: Option<&Path>, var_tmp_exists: bool) -> PathBuf {
    match home {
        Some(home) if is_usable_home(home) => return home.join(APP_DIR_NAME),
        Some(home) => warn!(home = %home.display(), "Home directory is blank or the filesystem root, not using it"),
        None => warn!("Home directory is not set"),
    }
    if var_tmp_exists {
        let base = Path::new(VAR_TMP).join(APP_DIR_NAME);
        warn!(base = %base.display(), "Falling back to /var/tmp for survey output");
        return base;
    }
    let base = Path::new(TMP).join(APP_DIR_NAME);
    warn!(base = %base.display(), "Falling back to /tmp for survey output");
    base
}

fn is_usable_home(home: &Path) -> bool {
    let text = home.to_string_lossy();
    !text.trim().is_empty() && home.parent().is_some()
}

/// Directories created for one `run`/`survey-artifacts` invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputLayout {
    pub base_dir: PathBuf,
    pub surveyor_root: PathBuf,
    pub invocation_dir: PathBuf,
    pub survey_output_dir: PathBuf,
    pub scratch_dir: PathBuf,
}

impl OutputLayout {
    /// Create a fresh invocation directory under `base/surveyor`.
    ///
    /// The invocation directory is claimed with a single `create_dir`, so two
    /// concurrent invocations can never share one.
    pub fn create(base_dir: &Path) -> io::Result<OutputLayout> {
        let surveyor_root = base_dir.join(SURVEYOR_DIR);
        fs::create_dir_all(&surveyor_root)?;

        let invocation_dir = create_unique_dir(&surveyor_root)?;
        let survey_output_dir = invocation_dir.join(SURVEY_DIR);
        let scratch_dir = invocation_dir.join(SCRATCH_DIR);
        fs::create_dir_all(&survey_output_dir)?;
        fs::create_dir_all(&scratch_dir)?;

        info!(
            invocation_dir = %invocation_dir.display(),
            "Created survey output layout"
        );
        Ok(OutputLayout {
            base_dir: base_dir.to_path_buf(),
            surveyor_root,
            invocation_dir,
            survey_output_dir,
            scratch_dir,
        })
    }

    /// Guard that deletes the scratch directory when dropped.
    pub fn scratch_guard(&self) -> ScratchGuard {
        ScratchGuard {
            dir: self.scratch_dir.clone(),
        }
    }
}

fn create_unique_dir(parent: &Path) -> io::Result<PathBuf> {
    for _ in 0..MAX_CREATE_ATTEMPTS {
        let name = format!(
            "{}-{}",
            Utc::now().format("%Y%m%dT%H%M%SZ"),
            uuid::Uuid::new_v4().simple()
        );
        let candidate = parent.join(name);
        match fs::create_dir(&candidate) {
            Ok(()) => return Ok(candidate),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                debug!(path = %candidate.display(), "Invocation dir name taken, retrying");
            }
            Err(e) => return Err(e),
        }
    }
    Err(io::Error::new(
        io::ErrorKind::AlreadyExists,
        format!("could not claim a unique directory in {}", parent.display()),
    ))
}

/// Removes a directory tree bottom-up: files first, then the directories holding them.
/// A tree that is already gone is not an error.
pub fn remove_tree(root: &Path) -> io::Result<()> {
    if !root.exists() {
        return Ok(());
    }
    for entry in WalkDir::new(root).contents_first(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if is_not_found(&e) => continue,
            Err(e) => return Err(e.into()),
        };
        let result = if entry.file_type().is_dir() {
            fs::remove_dir(entry.path())
        } else {
            fs::remove_file(entry.path())
        };
        match result {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

fn is_not_found(e: &walkdir::Error) -> bool {
    e.io_error()
        .map(|io| io.kind() == io::ErrorKind::NotFound)
        .unwrap_or(false)
}

/// Deletes the scratch directory on drop. Failures are logged, never raised.
#[derive(Debug)]
pub struct ScratchGuard {
    dir: PathBuf,
}

impl Drop for ScratchGuard {
    fn drop(&mut self) {
        match remove_tree(&self.dir) {
            Ok(()) => debug!(path = %self.dir.display(), "Removed scratch directory"),
            Err(e) => warn!(error = ?e, path = %self.dir.display(), "Failed to remove scratch directory"),
        }
    }
}
