//! Filesystem helpers for pipeline output.
//!
//! Bundle and case-book files are written to a sibling temporary file and renamed into place,
//! so a failed run never leaves a half-written file behind.

use crate::error::{CoreError, CoreResult};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Write `contents` to `path` via `<path>.tmp` and a rename, creating parent directories.
///
/// # Errors
///
/// Returns [`CoreError::Io`] naming the path that failed.
pub fn write_atomically(path: &Path, contents: &str) -> CoreResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(CoreError::io(parent))?;
    }

    let mut temp_name = path.as_os_str().to_owned();
    temp_name.push(".tmp");
    let temp = PathBuf::from(temp_name);

    fs::write(&temp, contents).map_err(CoreError::io(&temp))?;
    if let Err(err) = fs::rename(&temp, path) {
        let _ = fs::remove_file(&temp);
        return Err(CoreError::io(path)(err));
    }
    Ok(())
}

/// Append `text` to `path`, creating the file and its parent directories as needed.
///
/// # Errors
///
/// Returns [`CoreError::Io`] naming the path that failed.
pub fn append_text(path: &Path, text: &str) -> CoreResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(CoreError::io(parent))?;
    }
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(CoreError::io(path))?;
    file.write_all(text.as_bytes()).map_err(CoreError::io(path))
}

/// All `*.json` files below `root`, recursively, in sorted path order.
///
/// # Errors
///
/// Returns [`CoreError::Io`] if a directory cannot be read.
pub fn find_json_files(root: &Path) -> CoreResult<Vec<PathBuf>> {
    fn walk(dir: &Path, found: &mut Vec<PathBuf>) -> CoreResult<()> {
        for entry in fs::read_dir(dir).map_err(CoreError::io(dir))? {
            let entry = entry.map_err(CoreError::io(dir))?;
            let path = entry.path();
            let file_type = entry.file_type().map_err(CoreError::io(&path))?;
            if file_type.is_dir() {
                walk(&path, found)?;
            } else if file_type.is_file()
                && path.extension().and_then(|e| e.to_str()) == Some("json")
            {
                found.push(path);
            }
        }
        Ok(())
    }

    let mut found = Vec::new();
    walk(root, &mut found)?;
    found.sort();
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_atomically_creates_parents_and_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/diabetes/case_1_abc.json");

        write_atomically(&path, "{}").unwrap();
        write_atomically(&path, "{\"a\": 1}").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "{\"a\": 1}");
        let names: Vec<_> = fs::read_dir(path.parent().unwrap())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names.len(), 1);
    }

    #[test]
    fn append_text_accumulates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("parsed/summary.txt");

        append_text(&path, "one\n").unwrap();
        append_text(&path, "two\n").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "one\ntwo\n");
    }

    #[test]
    fn find_json_files_walks_subdirectories() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("b")).unwrap();
        fs::create_dir_all(dir.path().join("a")).unwrap();
        fs::write(dir.path().join("b/2.json"), "{}").unwrap();
        fs::write(dir.path().join("a/1.json"), "{}").unwrap();
        fs::write(dir.path().join("a/notes.txt"), "").unwrap();

        let found = find_json_files(dir.path()).unwrap();
        assert_eq!(
            found,
            vec![dir.path().join("a/1.json"), dir.path().join("b/2.json")]
        );
    }
}
