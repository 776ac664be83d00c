use crate::error::{BarkError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Serialize `value` next to `path` and rename it into place, so readers see
/// either the old file or the new one, never a partial write.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|err| BarkError::persistence(parent, err))?;
    }
    let bytes = serde_json::to_vec_pretty(value)
        .map_err(|err| BarkError::persistence(path, io::Error::other(err)))?;
    let tmp = temp_path(path);
    let written = fs::File::create(&tmp).and_then(|mut file| {
        file.write_all(&bytes)?;
        file.sync_all()
    });
    if let Err(err) = written {
        let _ = fs::remove_file(&tmp);
        return Err(BarkError::persistence(&tmp, err));
    }
    fs::rename(&tmp, path).map_err(|err| {
        let _ = fs::remove_file(&tmp);
        BarkError::persistence(path, err)
    })
}

/// Read a JSON document. A missing file is `Ok(None)`; an unreadable or
/// malformed one is `CorruptState`.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(BarkError::corrupt(path, err)),
    };
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|err| BarkError::corrupt(path, err))
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Doc {
        value: u32,
    }

    #[test]
    fn round_trips_and_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/doc.json");
        write_json_atomic(&path, &Doc { value: 3 }).unwrap();
        assert_eq!(read_json::<Doc>(&path).unwrap(), Some(Doc { value: 3 }));
        assert!(!dir.path().join("nested/doc.json.tmp").exists());
    }

    #[test]
    fn missing_file_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(read_json::<Doc>(&dir.path().join("absent.json")).unwrap(), None);
    }

    #[test]
    fn malformed_file_is_corrupt_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.json");
        fs::write(&path, b"{\"value\": ").unwrap();
        assert!(matches!(
            read_json::<Doc>(&path),
            Err(BarkError::CorruptState { .. })
        ));
    }
}
