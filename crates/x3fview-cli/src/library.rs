//! Filesystem side of the viewer: directory listing, the quarantine
//! directory, the converter job list and preview export.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use x3fview_core::container;
use x3fview_core::services::{DirectoryListing, ExportJob, ExportKind, ExportQueue, Quarantine};
use x3fview_core::ViewerConfig;

/// One browsed directory and its `delete/` and `export/` sub-directories.
pub struct FsLibrary {
    root: PathBuf,
    config: ViewerConfig,
}

/// What `export_preview` did.
#[derive(Debug, PartialEq, Eq)]
pub enum ExportOutcome {
    Written(PathBuf),
    /// The target already existed and was left alone.
    Skipped(PathBuf),
}

impl FsLibrary {
    pub fn new(root: impl Into<PathBuf>, config: ViewerConfig) -> Self {
        Self {
            root: root.into(),
            config,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn quarantine_dir(&self) -> PathBuf {
        self.root.join(&self.config.quarantine_dir)
    }

    pub fn export_dir(&self) -> PathBuf {
        self.root.join(&self.config.export_dir)
    }

    pub fn scan(&self) -> io::Result<Vec<PathBuf>> {
        self.list(&self.root)
    }

    /// Write the embedded JPEG of `path` to `<export_dir>/<stem>.jpg`.
    pub fn export_preview(&self, path: &Path) -> Result<ExportOutcome> {
        let stem = path
            .file_stem()
            .with_context(|| format!("{} has no file name", path.display()))?;
        let dir = self.export_dir();
        let mut target = dir.join(stem);
        target.set_extension("jpg");

        if target.exists() {
            log::info!("{} already exported, skipping", target.display());
            return Ok(ExportOutcome::Skipped(target));
        }

        let (locator, jpeg) = container::extract_embedded_jpeg(path)
            .with_context(|| format!("reading preview of {}", path.display()))?;
        fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;
        fs::write(&target, &jpeg).with_context(|| format!("writing {}", target.display()))?;
        log::info!(
            "Exported {} byte preview of {} to {}",
            locator.size,
            path.display(),
            target.display()
        );
        Ok(ExportOutcome::Written(target))
    }

    /// Queue a converter job for `path` targeting the export directory.
    pub fn queue_export(&mut self, path: &Path, kind: ExportKind) -> Result<ExportJob> {
        let job = ExportJob::new(path, self.export_dir(), kind);
        self.enqueue(&job)
            .with_context(|| format!("queueing {} export of {}", kind, path.display()))?;
        Ok(job)
    }

    fn matches_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(&self.config.extension))
    }
}

impl DirectoryListing for FsLibrary {
    fn list(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if entry.file_type()?.is_file() && self.matches_extension(&path) {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }
}

impl Quarantine for FsLibrary {
    fn quarantine(&mut self, path: &Path) -> io::Result<PathBuf> {
        let dir = self.quarantine_dir();
        fs::create_dir_all(&dir)?;
        let name = path.file_name().ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "path has no file name")
        })?;
        let target = dir.join(name);
        if target.exists() {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{} already exists", target.display()),
            ));
        }
        fs::rename(path, &target)?;
        Ok(target)
    }
}

impl ExportQueue for FsLibrary {
    fn enqueue(&mut self, job: &ExportJob) -> io::Result<()> {
        let dir = self.export_dir();
        fs::create_dir_all(&dir)?;
        let mut list = OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join(&self.config.export_list))?;
        list.write_all(job.to_line().as_bytes())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use tempfile::TempDir;
    use x3fview_core::test_support::X3fBuilder;

    /// A container with a single embedded "JPEG" payload.
    pub(crate) fn container_bytes(payload: &[u8]) -> Vec<u8> {
        X3fBuilder::new().image_section(2, 18, payload).build()
    }

    fn library(dir: &TempDir) -> FsLibrary {
        FsLibrary::new(dir.path(), ViewerConfig::default())
    }

    #[test]
    fn test_list_matches_extension_case_insensitively() {
        let dir = TempDir::new().unwrap();
        for name in ["b.X3F", "a.x3f", "c.jpg", "notes.txt"] {
            fs::write(dir.path().join(name), b"").unwrap();
        }
        fs::create_dir(dir.path().join("sub.X3F")).unwrap();

        let files = library(&dir).scan().unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["a.x3f", "b.X3F"]);
    }

    #[test]
    fn test_quarantine_moves_file() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("DSC0001.X3F");
        fs::write(&source, b"data").unwrap();

        let mut lib = library(&dir);
        let moved = lib.quarantine(&source).unwrap();
        assert_eq!(moved, dir.path().join("delete").join("DSC0001.X3F"));
        assert!(!source.exists());
        assert_eq!(fs::read(&moved).unwrap(), b"data");
    }

    #[test]
    fn test_quarantine_refuses_to_overwrite() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("DSC0001.X3F");
        fs::write(&source, b"new").unwrap();
        fs::create_dir(dir.path().join("delete")).unwrap();
        fs::write(dir.path().join("delete").join("DSC0001.X3F"), b"old").unwrap();

        let err = library(&dir).quarantine(&source).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
        assert!(source.exists());
    }

    #[test]
    fn test_queue_appends_lines() {
        let dir = TempDir::new().unwrap();
        let mut lib = library(&dir);
        let a = dir.path().join("a.X3F");
        let b = dir.path().join("b.X3F");
        lib.queue_export(&a, ExportKind::Dng).unwrap();
        lib.queue_export(&b, ExportKind::Tiff).unwrap();

        let list = fs::read_to_string(dir.path().join("export").join("export_list.txt")).unwrap();
        let export = dir.path().join("export");
        assert_eq!(
            list,
            format!(
                "{} {} dng\n{} {} tiff\n",
                a.display(),
                export.display(),
                b.display(),
                export.display()
            )
        );
    }

    #[test]
    fn test_export_preview_writes_then_skips() {
        let dir = TempDir::new().unwrap();
        let payload = [0xFF, 0xD8, 7, 7, 0xFF, 0xD9];
        let source = dir.path().join("DSC0002.X3F");
        fs::write(&source, container_bytes(&payload)).unwrap();

        let lib = library(&dir);
        let target = dir.path().join("export").join("DSC0002.jpg");
        assert_eq!(
            lib.export_preview(&source).unwrap(),
            ExportOutcome::Written(target.clone())
        );
        assert_eq!(fs::read(&target).unwrap(), payload);

        fs::write(&target, b"edited").unwrap();
        assert_eq!(
            lib.export_preview(&source).unwrap(),
            ExportOutcome::Skipped(target.clone())
        );
        assert_eq!(fs::read(&target).unwrap(), b"edited");
    }

    #[test]
    fn test_export_preview_without_jpeg_fails() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("bad.X3F");
        fs::write(&source, b"not a container").unwrap();
        assert!(library(&dir).export_preview(&source).is_err());
        assert!(!dir.path().join("export").exists());
    }
}
