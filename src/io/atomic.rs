//! Atomic file output
//!
//! Output is first written to a hidden sibling of its final path. Only once every file of a set
//! has been written completely are they renamed into place.
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Sibling of `path` that output is written to before it is moved into place
pub(crate) fn temporary_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "output".to_string());
    path.with_file_name(format!(".{name}.tmp"))
}

/// A completely written temporary file waiting to be renamed into place
///
/// The temporary file is removed if this is dropped without being committed.
#[derive(Debug)]
pub(crate) struct StagedFile {
    tmp_path: PathBuf,
    path: PathBuf,
    bytes: u64,
    committed: bool,
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if !self.committed {
            let _ = fs::remove_file(&self.tmp_path);
        }
    }
}

/// Write a file to the temporary sibling of `path`
///
/// If `encode` fails the temporary file is removed and `path` is left untouched.
pub(crate) fn stage<E: From<std::io::Error>>(
    path: &Path,
    encode: impl FnOnce(&mut dyn Write) -> Result<(), E>,
) -> Result<StagedFile, E> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut staged = StagedFile {
        tmp_path: temporary_path(path),
        path: path.to_path_buf(),
        bytes: 0,
        committed: false,
    };
    let file = File::create(&staged.tmp_path)?;
    let mut writer = BufWriter::new(file);
    encode(&mut writer)?;
    let file = writer.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()?;
    staged.bytes = file.metadata()?.len();
    Ok(staged)
}

/// Rename a set of staged files into place
///
/// If a rename fails, the files of the set that were already renamed are removed and the
/// remaining temporary files are discarded. Returns the path and size of every file.
pub(crate) fn commit_all(files: Vec<StagedFile>) -> std::io::Result<Vec<(PathBuf, u64)>> {
    let mut committed = Vec::with_capacity(files.len());
    for mut file in files {
        if let Err(e) = fs::rename(&file.tmp_path, &file.path) {
            for (path, _) in &committed {
                let _ = fs::remove_file(path);
            }
            return Err(e);
        }
        file.committed = true;
        committed.push((file.path.clone(), file.bytes));
    }
    Ok(committed)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_failed_write_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.plt");
        let result = stage(&path, |w| {
            w.write_all(b"partial")?;
            Err(std::io::Error::other("encoder failed"))
        });
        assert!(result.is_err());
        assert!(!path.exists());
        assert!(!temporary_path(&path).exists());
    }

    #[test]
    fn test_dropped_file_is_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.plt");
        let staged = stage::<std::io::Error>(&path, |w| w.write_all(b"TITLE")).unwrap();
        assert!(temporary_path(&path).exists());
        assert!(!path.exists());
        drop(staged);
        assert!(!temporary_path(&path).exists());
        assert!(!path.exists());
    }

    #[test]
    fn test_commit_replaces_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out.csv");
        let other = dir.path().join("nested").join("out_1.csv");
        let staged = vec![
            stage::<std::io::Error>(&path, |w| w.write_all(b"a,b\n")).unwrap(),
            stage::<std::io::Error>(&other, |w| w.write_all(b"c\n")).unwrap(),
        ];
        assert_eq!(
            commit_all(staged).unwrap(),
            vec![(path.clone(), 4), (other.clone(), 2)]
        );
        let staged = vec![stage::<std::io::Error>(&path, |w| w.write_all(b"d\n")).unwrap()];
        commit_all(staged).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "d\n");
        assert_eq!(fs::read_to_string(&other).unwrap(), "c\n");
        assert_eq!(
            temporary_path(&path),
            dir.path().join("nested").join(".out.csv.tmp")
        );
    }
}
