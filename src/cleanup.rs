//! Cleanup of files the pipeline created.
//!
//! Extracted images live in a per-submission [`ScratchSpace`]. The pipeline
//! calls [`cleanup`] after dispatch on every path, and the scratch space
//! deletes whatever is left when it is dropped, so an early return or a
//! dropped future cannot leak files.
//!
//! User-selected files are never touched.

use std::fs;
use std::io;
use std::path::Path;

use tempfile::TempDir;

use crate::models::Attachment;

/// Prefix for scratch directory names.
const SCRATCH_PREFIX: &str = "ticketmaker-";

/// Outcome of a cleanup pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CleanupReport {
    /// Owned files deleted (or already gone).
    pub removed: usize,
    /// Owned files that could not be deleted.
    pub failed: usize,
    /// User files left in place.
    pub skipped: usize,
}

/// Deletes every pipeline-owned attachment, best-effort.
///
/// Deletion errors are logged and counted, never returned: cleanup must not
/// mask the submission result.
pub fn cleanup(attachments: &[Attachment]) -> CleanupReport {
    let mut report = CleanupReport::default();

    for attachment in attachments {
        if !attachment.origin_owned {
            report.skipped += 1;
            continue;
        }
        match remove_file(&attachment.source_path) {
            Ok(()) => report.removed += 1,
            Err(e) => {
                tracing::debug!(
                    path = %attachment.source_path.display(),
                    error = %e,
                    "Could not delete temporary attachment"
                );
                report.failed += 1;
            }
        }
    }

    if report.removed + report.failed > 0 {
        tracing::debug!(
            removed = report.removed,
            failed = report.failed,
            "Temporary attachments cleaned up"
        );
    }

    report
}

/// Removes a file, treating "already gone" as success.
fn remove_file(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

/// A temporary directory owning the files extracted for one submission.
///
/// Dropping it deletes every tracked file and then the directory itself.
#[derive(Debug)]
pub struct ScratchSpace {
    dir: TempDir,
    owned: Vec<Attachment>,
}

impl ScratchSpace {
    /// Creates a fresh directory under the system temp location.
    pub fn new() -> io::Result<Self> {
        let dir = tempfile::Builder::new().prefix(SCRATCH_PREFIX).tempdir()?;
        Ok(Self {
            dir,
            owned: Vec::new(),
        })
    }

    /// Creates a fresh directory under `parent`.
    pub fn new_in(parent: impl AsRef<Path>) -> io::Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(SCRATCH_PREFIX)
            .tempdir_in(parent)?;
        Ok(Self {
            dir,
            owned: Vec::new(),
        })
    }

    /// Directory new files should be written to.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Registers a file the pipeline wrote, so it is deleted on drop.
    pub fn track(&mut self, attachment: Attachment) {
        debug_assert!(attachment.origin_owned);
        self.owned.push(attachment);
    }

    /// Files currently tracked.
    pub fn tracked(&self) -> &[Attachment] {
        &self.owned
    }

    /// Deletes tracked files now and forgets them.
    pub fn purge(&mut self) -> CleanupReport {
        let report = cleanup(&self.owned);
        self.owned.clear();
        report
    }
}

impl Drop for ScratchSpace {
    fn drop(&mut self) {
        if !self.owned.is_empty() {
            self.purge();
        }
        // TempDir removes the directory when it drops right after this.
    }
}
