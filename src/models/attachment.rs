//! Attachment model.

use std::path::{Path, PathBuf};

/// A file to upload with a ticket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// File name sent to the API.
    pub display_name: String,

    /// Where the file lives on disk.
    pub source_path: PathBuf,

    /// True if the pipeline created the file and must delete it after use.
    /// User-selected files are never deleted.
    pub origin_owned: bool,
}

impl Attachment {
    /// A file the user picked. The display name is the file name.
    pub fn user_file(path: impl Into<PathBuf>) -> Self {
        let source_path = path.into();
        let display_name = display_name_for(&source_path);
        Self {
            display_name,
            source_path,
            origin_owned: false,
        }
    }

    /// A file written by the pipeline (an extracted image).
    pub fn owned(display_name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            display_name: display_name.into(),
            source_path: path.into(),
            origin_owned: true,
        }
    }
}

fn display_name_for(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "attachment".to_string())
}
