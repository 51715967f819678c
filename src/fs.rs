//! Filesystem capability used by rules and the statement extractor.
//!
//! Rules never touch `std::fs` directly; they receive a [`Filesystem`] so
//! the checks stay pure functions of the pipeline and whatever the
//! filesystem reports.

use std::{fs, io, path::Path};

/// What the executable checks need to know about a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    pub is_dir:     bool,
    pub len:        u64,
    /// Any of the owner, group or other execute bits is set
    pub executable: bool
}

pub trait Filesystem: Send + Sync {
    /// Stat `path`, returning `Ok(None)` when it does not exist.
    fn stat(&self, path: &Path) -> io::Result<Option<FileStat>>;

    fn read_to_string(&self, path: &Path) -> io::Result<String>;
}

/// [`Filesystem`] backed by the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFilesystem;

impl Filesystem for OsFilesystem {
    fn stat(&self, path: &Path) -> io::Result<Option<FileStat>> {
        let metadata = match fs::metadata(path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e)
        };
        Ok(Some(FileStat {
            is_dir:     metadata.is_dir(),
            len:        metadata.len(),
            executable: is_executable(&metadata)
        }))
    }

    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        fs::read_to_string(path)
    }
}

#[cfg(unix)]
fn is_executable(metadata: &fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o111 != 0
}

// No execute bit outside unix; every regular file counts as runnable.
#[cfg(not(unix))]
fn is_executable(_metadata: &fs::Metadata) -> bool {
    true
}

#[cfg(all(test, unix))]
mod tests {
    use std::os::unix::fs::PermissionsExt;

    use super::*;

    #[test]
    fn test_stat_missing_path() {
        let dir = tempfile::tempdir().unwrap();
        let stat = OsFilesystem.stat(&dir.path().join("nope.sh")).unwrap();
        assert!(stat.is_none());
    }

    #[test]
    fn test_stat_reports_execute_bits() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.sh");
        fs::write(&path, "echo hi").unwrap();

        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();
        let stat = OsFilesystem.stat(&path).unwrap().unwrap();
        assert!(!stat.executable);
        assert_eq!(stat.len, 7);

        fs::set_permissions(&path, fs::Permissions::from_mode(0o701)).unwrap();
        assert!(OsFilesystem.stat(&path).unwrap().unwrap().executable);
    }

    #[test]
    fn test_stat_directory() {
        let dir = tempfile::tempdir().unwrap();
        let stat = OsFilesystem.stat(dir.path()).unwrap().unwrap();
        assert!(stat.is_dir);
    }
}
