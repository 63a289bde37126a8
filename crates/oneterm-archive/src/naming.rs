use std::path::Path;
use std::path::PathBuf;
use std::sync::Mutex;

use chrono::Local;
use chrono::NaiveDateTime;

use oneterm_common::mutex_lock_or_recover;

const ARCHIVE_PREFIX: &str = "terminal";
const ARCHIVE_EXTENSION: &str = "logz";

/// `terminal_<YYYYMMDD>_<HHMMSS>[_<n>].logz`
pub fn archive_file_name(stamp: &str, disambiguator: u32) -> String {
    if disambiguator == 0 {
        format!("{}_{}.{}", ARCHIVE_PREFIX, stamp, ARCHIVE_EXTENSION)
    } else {
        format!(
            "{}_{}_{}.{}",
            ARCHIVE_PREFIX, stamp, disambiguator, ARCHIVE_EXTENSION
        )
    }
}

/// Hands out a fresh destination path per job.
///
/// Paths are unique within the process for a given second; the existence
/// check skips names left behind by earlier runs.
pub struct ArchiveNamer {
    dir: PathBuf,
    last: Mutex<Option<(String, u32)>>,
}

impl ArchiveNamer {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            last: Mutex::new(None),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn next_path(&self) -> PathBuf {
        self.path_at(Local::now().naive_local())
    }

    pub fn path_at(&self, at: NaiveDateTime) -> PathBuf {
        let stamp = at.format("%Y%m%d_%H%M%S").to_string();
        let mut last = mutex_lock_or_recover(&self.last);

        let mut n = match last.as_ref() {
            Some((prev, used)) if *prev == stamp => used + 1,
            _ => 0,
        };
        loop {
            let path = self.dir.join(archive_file_name(&stamp, n));
            if !path.exists() {
                *last = Some((stamp, n));
                return path;
            }
            n += 1;
        }
    }
}
