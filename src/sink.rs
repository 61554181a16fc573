//! Where recovered saves go.
//!
//! # Hardening gap
//! The filename comes straight off the wire and is joined onto the output
//! directory unmodified.  A name such as `../x` or an absolute path escapes
//! that directory.  This matches the reference extractor and is left open
//! until the owner decides on a sanitisation policy.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("Error writing save {path} to disk: {source}")]
    Write { path: PathBuf, #[source] source: io::Error },
    #[error("Refusing to overwrite existing file {0}")]
    Exists(PathBuf),
}

impl SinkError {
    /// The file the write was aimed at.
    pub fn path(&self) -> &Path {
        match self {
            SinkError::Write { path, .. } | SinkError::Exists(path) => path,
        }
    }
}

/// Receives the recovered `(filename, payload)` pair.
pub trait OutputSink {
    /// Persist `data` under `filename`; returns where it went.
    fn write(&mut self, filename: &str, data: &[u8]) -> Result<PathBuf, SinkError>;
}

/// Writes into a directory on disk.
#[derive(Debug, Clone)]
pub struct FileSink {
    dir:        PathBuf,
    no_clobber: bool,
}

impl FileSink {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self { dir: dir.as_ref().to_owned(), no_clobber: false }
    }

    pub fn no_clobber(mut self, yes: bool) -> Self {
        self.no_clobber = yes;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl OutputSink for FileSink {
    fn write(&mut self, filename: &str, data: &[u8]) -> Result<PathBuf, SinkError> {
        let path = self.dir.join(filename);

        let file = if self.no_clobber {
            OpenOptions::new().write(true).create_new(true).open(&path)
        } else {
            File::create(&path)
        };
        let mut file = file.map_err(|e| match e.kind() {
            io::ErrorKind::AlreadyExists => SinkError::Exists(path.clone()),
            _ => SinkError::Write { path: path.clone(), source: e },
        })?;

        file.write_all(data)
            .and_then(|_| file.flush())
            .map_err(|e| SinkError::Write { path: path.clone(), source: e })?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn writes_into_directory() {
        let dir = tempdir().unwrap();
        let mut sink = FileSink::new(dir.path());
        let path = sink.write("SAVE01", b"data").unwrap();
        assert_eq!(path, dir.path().join("SAVE01"));
        assert_eq!(std::fs::read(path).unwrap(), b"data");
    }

    #[test]
    fn overwrites_by_default() {
        let dir = tempdir().unwrap();
        let mut sink = FileSink::new(dir.path());
        sink.write("SAVE01", b"old").unwrap();
        sink.write("SAVE01", b"new").unwrap();
        assert_eq!(std::fs::read(dir.path().join("SAVE01")).unwrap(), b"new");
    }

    #[test]
    fn no_clobber_refuses_existing() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("SAVE01"), b"keep").unwrap();
        let mut sink = FileSink::new(dir.path()).no_clobber(true);
        let err = sink.write("SAVE01", b"x").unwrap_err();
        assert!(matches!(err, SinkError::Exists(_)));
        assert_eq!(err.path(), dir.path().join("SAVE01"));
        assert_eq!(std::fs::read(dir.path().join("SAVE01")).unwrap(), b"keep");
    }

    #[test]
    fn missing_directory_is_a_write_error() {
        let dir = tempdir().unwrap();
        let mut sink = FileSink::new(dir.path().join("nope"));
        let err = sink.write("SAVE01", b"x").unwrap_err();
        assert!(matches!(err, SinkError::Write { .. }));
        assert_eq!(err.path(), dir.path().join("nope").join("SAVE01"));
    }
}
