use std::fs;
use std::io::{self, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tempfile::Builder;
use tracing::debug;

use crate::types::{Direction, Result};

/// Region label derived from an input path: the file stem up to the first `-`.
///
/// `japan-geoglows-catchment.csv` becomes `japan`.
pub fn region_name(input: &Path) -> String {
    let stem = input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    match stem.split('-').next() {
        Some(prefix) if !prefix.is_empty() => prefix.to_string(),
        _ => stem,
    }
}

/// Output path for a region: `<dir>/<region>-<direction>-dict.json`.
pub fn region_output_path(dir: &Path, input: &Path, direction: Direction) -> PathBuf {
    dir.join(format!("{}-{}-dict.json", region_name(input), direction))
}

/// Writes `value` as JSON to `path` unless the file already exists.
///
/// The document is written to a hidden temporary sibling and then persisted
/// without clobbering; a partial output never appears at `path`. Returns `false` when `path` was
/// already present; the existing file is left untouched. The temporary file is
/// removed on every failure path.
pub fn write_json_new<T: Serialize>(path: &Path, value: &T) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    let dir = ensure_parent_dir(path)?;

    let mut tmp = Builder::new()
        .prefix(".adjoin-")
        .suffix(".partial")
        .tempfile_in(dir)?;
    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        serde_json::to_writer(&mut writer, value)?;
        writer.flush()?;
    }
    tmp.as_file().sync_all()?;

    let placed = match tmp.persist_noclobber(path) {
        Ok(_) => true,
        Err(err) if err.error.kind() == ErrorKind::AlreadyExists => false,
        Err(err) => return Err(err.error.into()),
    };
    debug!(path = %path.display(), placed, "persisted json output");
    Ok(placed)
}

fn ensure_parent_dir(path: &Path) -> io::Result<&Path> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent)?;
            Ok(parent)
        }
        _ => Ok(Path::new(".")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    #[test]
    fn region_names_follow_input_stem() {
        assert_eq!(
            region_name(Path::new("/data/japan-geoglows-catchment.csv")),
            "japan"
        );
        assert_eq!(region_name(Path::new("islands.csv")), "islands");
        assert_eq!(
            region_output_path(
                Path::new("out"),
                Path::new("in/europe-catchment.csv"),
                Direction::Upstream
            ),
            PathBuf::from("out/europe-upstream-dict.json")
        );
    }

    #[test]
    fn existing_output_is_never_overwritten() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("out.json");

        assert!(write_json_new(&path, &vec![1, 2, 3]).unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap(), "[1,2,3]");

        assert!(!write_json_new(&path, &vec![4]).unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap(), "[1,2,3]");

        let leftovers: Vec<_> = fs::read_dir(path.parent().unwrap())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(leftovers.len(), 1);
    }

    #[test]
    fn failed_serialization_leaves_no_files_behind() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out").join("bad.json");
        // JSON object keys must be strings; a sequence key cannot be encoded.
        let value = BTreeMap::from([(vec![1, 2], 3)]);

        assert!(write_json_new(&path, &value).is_err());
        assert!(!path.exists());
        let leftovers = fs::read_dir(path.parent().unwrap()).unwrap().count();
        assert_eq!(leftovers, 0);
    }
}
