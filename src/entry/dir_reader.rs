//! Directory listing behind `dirReaderWithResult`
//!
//! Entries are sorted by their path text so the order is the same on every
//! platform. Any failure, including a name that is not UTF-8, turns the whole
//! read into a failure envelope.

use crate::marshal::Envelope;
use std::fs;
use std::io;
use std::path::Path;
use tracing::{debug, warn};

/// Paths of the entries directly under `path`, sorted
pub fn read_entries(path: &Path) -> io::Result<Vec<String>> {
    let mut entries = Vec::new();

    for entry in fs::read_dir(path)? {
        let entry_path = entry?.path();
        let text = entry_path.into_os_string().into_string().map_err(|raw| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("entry {:?} is not valid UTF-8", raw),
            )
        })?;
        entries.push(text);
    }

    entries.sort();
    Ok(entries)
}

pub fn read_dir_envelope(path: &Path) -> Envelope {
    match read_entries(path) {
        Ok(entries) => {
            debug!(path = %path.display(), entries = entries.len(), "Directory read");
            Envelope::success(entries)
        }
        Err(err) => {
            warn!(path = %path.display(), error = %err, "Directory read failed");
            Envelope::failure([format!(
                "could not read directory `{}`: {}",
                path.display(),
                err
            )])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;

    #[test]
    fn test_entries_are_sorted() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["zeta", "alpha", "mid"] {
            File::create(dir.path().join(name)).unwrap();
        }

        let entries = read_entries(dir.path()).unwrap();
        let names: Vec<String> = entries
            .iter()
            .map(|e| Path::new(e).file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["alpha", "mid", "zeta"]);
    }

    #[test]
    fn test_missing_directory_is_a_failure_envelope() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("does-not-exist");

        let envelope = read_dir_envelope(&missing);
        assert!(envelope.success_data().is_empty());
        assert_eq!(envelope.failure_data().len(), 1);
        assert!(envelope.failure_data()[0].starts_with("could not read directory"));
    }

    #[test]
    fn test_empty_directory_is_an_empty_success() {
        let dir = tempfile::tempdir().unwrap();
        let envelope = read_dir_envelope(dir.path());
        assert!(!envelope.is_failure());
        assert!(envelope.success_data().is_empty());
    }
}
