//! # Start-time log rotation.
//!
//! Rotation happens in the brief window before a process is spawned, never
//! while it runs: the running child always owns the live log, so no handle is
//! ever renamed out from under it.
//!
//! With `max_files = N` the layout is the active `<log>` plus archives
//! `<log>.1` (newest) through `<log>.N-1` (oldest). A rotation shifts every
//! archive up by one, dropping the oldest, then moves the active file to
//! `<log>.1`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Returns the path of archive number `index` for `log`.
pub fn archive_path(log: &Path, index: u32) -> PathBuf {
    let mut name = log.as_os_str().to_os_string();
    name.push(format!(".{index}"));
    PathBuf::from(name)
}

/// Rotates `log` if it exceeds `max_bytes`. Call before spawning only.
///
/// - `max_bytes == 0` disables rotation.
/// - `max_files <= 1` truncates in place instead of archiving.
/// - A missing log file is not an error.
pub fn rotate_at_start(log: &Path, max_bytes: u64, max_files: u32) -> io::Result<()> {
    if max_bytes == 0 {
        return Ok(());
    }
    let len = match fs::metadata(log) {
        Ok(meta) => meta.len(),
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };
    if len <= max_bytes {
        return Ok(());
    }

    if max_files <= 1 {
        fs::OpenOptions::new().write(true).truncate(true).open(log)?;
        return Ok(());
    }

    let archives = max_files - 1;
    for index in (1..archives).rev() {
        let from = archive_path(log, index);
        if from.exists() {
            let to = archive_path(log, index + 1);
            let _ = fs::remove_file(&to);
            fs::rename(&from, &to)?;
        }
    }
    let first = archive_path(log, 1);
    let _ = fs::remove_file(&first);
    fs::rename(log, &first)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(path: &Path, content: &str) {
        fs::write(path, content).unwrap();
    }

    #[test]
    fn below_limit_is_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("proc.log");
        write(&log, "short");
        rotate_at_start(&log, 1024, 3).unwrap();
        assert_eq!(fs::read_to_string(&log).unwrap(), "short");
        assert!(!archive_path(&log, 1).exists());
    }

    #[test]
    fn zero_max_bytes_disables_rotation() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("proc.log");
        write(&log, &"x".repeat(4096));
        rotate_at_start(&log, 0, 3).unwrap();
        assert_eq!(fs::metadata(&log).unwrap().len(), 4096);
    }

    #[test]
    fn missing_file_is_fine() {
        let dir = tempfile::tempdir().unwrap();
        rotate_at_start(&dir.path().join("absent.log"), 64, 3).unwrap();
    }

    #[test]
    fn single_file_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("proc.log");
        write(&log, &"x".repeat(256));
        rotate_at_start(&log, 64, 1).unwrap();
        assert_eq!(fs::metadata(&log).unwrap().len(), 0);
        assert!(!archive_path(&log, 1).exists());
    }

    #[test]
    fn oversize_moves_to_first_archive() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("proc.log");
        write(&log, &"a".repeat(256));
        rotate_at_start(&log, 64, 2).unwrap();
        assert!(!log.exists());
        assert_eq!(
            fs::read_to_string(archive_path(&log, 1)).unwrap(),
            "a".repeat(256)
        );
    }

    #[test]
    fn archives_shift_and_oldest_drops() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("proc.log");
        write(&log, &"new".repeat(64));
        write(&archive_path(&log, 1), "old-1");
        write(&archive_path(&log, 2), "old-2");

        rotate_at_start(&log, 64, 3).unwrap();

        // old-2 dropped, old-1 became .2, active became .1
        assert!(!log.exists());
        assert_eq!(
            fs::read_to_string(archive_path(&log, 1)).unwrap(),
            "new".repeat(64)
        );
        assert_eq!(fs::read_to_string(archive_path(&log, 2)).unwrap(), "old-1");
        assert!(!archive_path(&log, 3).exists());
    }

    #[test]
    fn repeated_rotation_keeps_at_most_max_files() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("proc.log");
        for round in 0..6 {
            write(&log, &format!("round-{round}").repeat(64));
            rotate_at_start(&log, 16, 3).unwrap();
        }
        let files: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert!(files.len() <= 3);
        assert!(archive_path(&log, 1).exists());
        assert!(archive_path(&log, 2).exists());
        assert!(!archive_path(&log, 3).exists());
    }
}
