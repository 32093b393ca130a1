//! Interfaces to the collaborators that own the filesystem.
//!
//! The core never scans directories, moves files or writes the export job
//! list itself. Front-ends supply implementations of these traits.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Lists the container files of a directory.
pub trait DirectoryListing {
    /// Paths of all matching files, in a stable order.
    fn list(&self, dir: &Path) -> io::Result<Vec<PathBuf>>;
}

/// Moves deleted files out of the browsing set.
pub trait Quarantine {
    /// Move `path` into the quarantine location, creating it if needed.
    /// Returns the new location of the file.
    fn quarantine(&mut self, path: &Path) -> io::Result<PathBuf>;
}

/// Appends jobs for the external converter.
pub trait ExportQueue {
    fn enqueue(&mut self, job: &ExportJob) -> io::Result<()>;
}

/// Output format requested from the external converter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportKind {
    Dng,
    Tiff,
}

impl ExportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportKind::Dng => "dng",
            ExportKind::Tiff => "tiff",
        }
    }
}

impl fmt::Display for ExportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dng" => Ok(ExportKind::Dng),
            "tiff" | "tif" => Ok(ExportKind::Tiff),
            other => Err(format!("unknown export kind '{}'", other)),
        }
    }
}

/// One line of the converter's job list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportJob {
    pub source: PathBuf,
    pub destination_dir: PathBuf,
    pub kind: ExportKind,
}

impl ExportJob {
    pub fn new(source: impl Into<PathBuf>, destination_dir: impl Into<PathBuf>, kind: ExportKind) -> Self {
        Self {
            source: source.into(),
            destination_dir: destination_dir.into(),
            kind,
        }
    }

    /// The job as a line: `<source_path> <destination_dir> <job_kind>\n`.
    pub fn to_line(&self) -> String {
        format!(
            "{} {} {}\n",
            self.source.display(),
            self.destination_dir.display(),
            self.kind
        )
    }
}
