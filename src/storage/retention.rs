use super::DAY_BUCKET_FORMAT;
use crate::error::{BarkError, Result};
use chrono::{DateTime, Local, NaiveDate, NaiveTime};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Days a day bucket is kept when no retention is configured.
pub const DEFAULT_RETENTION_DAYS: u32 = 10;

/// Parse a `DD-MM-YYYY` bucket name. Anything else is not a bucket.
pub fn parse_day_bucket(name: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(name, DAY_BUCKET_FORMAT).ok()
}

/// Remove day buckets under `audio_root` whose midnight is more than
/// `max_age_days` before `now`. Entries that are not date-named directories
/// are left alone. Returns the removed directories.
pub fn sweep(audio_root: &Path, max_age_days: u32, now: DateTime<Local>) -> Result<Vec<PathBuf>> {
    let entries = match fs::read_dir(audio_root) {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(BarkError::persistence(audio_root, err)),
    };

    let max_age = chrono::Duration::days(i64::from(max_age_days));
    let now = now.naive_local();
    let mut removed = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| BarkError::persistence(audio_root, err))?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let Some(day) = entry.file_name().to_str().and_then(parse_day_bucket) else {
            debug!(path = %path.display(), "skipping non-bucket entry");
            continue;
        };
        if now - day.and_time(NaiveTime::MIN) <= max_age {
            continue;
        }
        match fs::remove_dir_all(&path) {
            Ok(()) => {
                info!(path = %path.display(), "removed expired recordings");
                removed.push(path);
            }
            Err(err) => warn!(path = %path.display(), error = %err, "failed to remove day bucket"),
        }
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Local> {
        Local
            .with_ymd_and_hms(2024, 6, 20, 9, 0, 0)
            .single()
            .unwrap()
    }

    #[test]
    fn parses_only_day_bucket_names() {
        assert_eq!(
            parse_day_bucket("07-03-2024"),
            NaiveDate::from_ymd_opt(2024, 3, 7)
        );
        assert_eq!(parse_day_bucket("2024-03-07"), None);
        assert_eq!(parse_day_bucket("notes"), None);
        assert_eq!(parse_day_bucket("31-02-2024"), None);
    }

    #[test]
    fn sweep_removes_only_expired_buckets() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        for name in ["01-06-2024", "09-06-2024", "12-06-2024", "20-06-2024", "misc"] {
            fs::create_dir(root.join(name)).unwrap();
        }
        fs::write(root.join("01-05-2024"), b"a file, not a bucket").unwrap();

        let removed = sweep(root, 10, now()).unwrap();

        assert_eq!(removed.len(), 2);
        assert!(!root.join("01-06-2024").exists());
        assert!(!root.join("09-06-2024").exists());
        assert!(root.join("12-06-2024").exists());
        assert!(root.join("20-06-2024").exists());
        assert!(root.join("misc").exists());
        assert!(root.join("01-05-2024").is_file());
    }

    #[test]
    fn bucket_exactly_at_the_limit_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("10-06-2024")).unwrap();
        let midnight = Local
            .with_ymd_and_hms(2024, 6, 20, 0, 0, 0)
            .single()
            .unwrap();
        assert!(sweep(dir.path(), 10, midnight).unwrap().is_empty());
        assert!(dir.path().join("10-06-2024").exists());
    }

    #[test]
    fn missing_root_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let removed = sweep(&dir.path().join("audio"), 10, now()).unwrap();
        assert!(removed.is_empty());
    }

    #[test]
    fn buckets_remove_their_recordings() {
        let dir = tempfile::tempdir().unwrap();
        let bucket = dir.path().join("01-01-2024");
        fs::create_dir(&bucket).unwrap();
        fs::write(bucket.join("01-01-2024_10-00-00.wav"), b"RIFF").unwrap();
        let removed = sweep(dir.path(), DEFAULT_RETENTION_DAYS, now()).unwrap();
        assert_eq!(removed, vec![bucket.clone()]);
        assert!(!bucket.exists());
    }
}
