use std::path::{Path, PathBuf};
use tracing::info;

/// Extension of persisted result frames.
pub const FRAME_EXTENSION: &str = "tiff";

/// First frame index a run can emit: the seed frame is index 1 and never
/// written, so output starts at 2.
pub const FIRST_EMITTED_INDEX: u64 = 2;

/// Path of the result for a given capture position.
/// e.g. "out/17.tiff"
pub fn frame_path(dir: &Path, frame_index: u64) -> PathBuf {
    dir.join(format!("{frame_index}.{FRAME_EXTENSION}"))
}

/// Create the output directory if needed and refuse one that already holds
/// results from an earlier run.
pub fn prepare_output_dir(dir: &Path) -> Result<(), LayoutError> {
    if !dir.exists() {
        std::fs::create_dir_all(dir).map_err(|e| LayoutError::CreateDir(dir.to_path_buf(), e))?;
        info!(dir = %dir.display(), "created output directory");
        return Ok(());
    }
    if !dir.is_dir() {
        return Err(LayoutError::NotADirectory(dir.to_path_buf()));
    }
    let first = frame_path(dir, FIRST_EMITTED_INDEX);
    if first.exists() {
        return Err(LayoutError::PriorResults(first));
    }
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum LayoutError {
    #[error("unable to create output directory {0}: {1}")]
    CreateDir(PathBuf, std::io::Error),
    #[error("output path {0} is not a directory")]
    NotADirectory(PathBuf),
    #[error("refusing to overwrite existing capture output ({0} exists)")]
    PriorResults(PathBuf),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_path_format() {
        assert_eq!(frame_path(Path::new("out"), 17), PathBuf::from("out/17.tiff"));
    }

    #[test]
    fn creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested").join("out");
        prepare_output_dir(&out).unwrap();
        assert!(out.is_dir());
    }

    #[test]
    fn accepts_empty_existing_directory() {
        let dir = tempfile::tempdir().unwrap();
        prepare_output_dir(dir.path()).unwrap();
    }

    #[test]
    fn refuses_prior_results() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(frame_path(dir.path(), 2), b"old").unwrap();
        assert!(matches!(
            prepare_output_dir(dir.path()),
            Err(LayoutError::PriorResults(_))
        ));
    }

    #[test]
    fn refuses_plain_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("out");
        std::fs::write(&file, b"").unwrap();
        assert!(matches!(
            prepare_output_dir(&file),
            Err(LayoutError::NotADirectory(_))
        ));
    }
}
