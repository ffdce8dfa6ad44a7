use std::fs;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::{ErrorKind, JobError};

/// Destination must already exist, be a directory, and accept new files.
pub fn check_destination(dir: &Path) -> Result<(), JobError> {
    let meta = fs::metadata(dir).map_err(|err| {
        JobError::invalid_input(format!("destination {} is unusable: {err}", dir.display()))
    })?;
    if !meta.is_dir() {
        return Err(JobError::invalid_input(format!(
            "destination {} is not a directory",
            dir.display()
        )));
    }
    // Basic writability probe: try creating a temp file.
    NamedTempFile::new_in(dir).map_err(|err| {
        JobError::invalid_input(format!(
            "destination {} is not writable: {err}",
            dir.display()
        ))
    })?;
    Ok(())
}

/// Existing files are never overwritten.
pub fn check_output_free(path: &Path) -> Result<(), JobError> {
    match fs::symlink_metadata(path) {
        Ok(_) => Err(JobError::new(
            ErrorKind::AlreadyExists,
            format!("file '{}' already exists", path.display()),
        )),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(JobError::invalid_input(format!(
            "cannot inspect {}: {err}",
            path.display()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_destination_is_invalid_input() {
        let temp = TempDir::new().unwrap();
        let err = check_destination(&temp.path().join("nope")).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidInput);
    }

    #[test]
    fn file_as_destination_is_invalid_input() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("file.txt");
        fs::write(&file, "x").unwrap();
        let err = check_destination(&file).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidInput);
    }

    #[test]
    fn writable_directory_passes_and_leaves_no_probe_file() {
        let temp = TempDir::new().unwrap();
        check_destination(temp.path()).unwrap();
        assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 0);
    }

    #[test]
    fn existing_output_is_reported() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("song.mp3");
        check_output_free(&target).unwrap();
        fs::write(&target, "data").unwrap();
        assert_eq!(
            check_output_free(&target).unwrap_err().kind,
            ErrorKind::AlreadyExists
        );
    }
}
