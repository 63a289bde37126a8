use std::fmt;
use std::path::Path;
use std::path::PathBuf;

use crate::error::ArchiveError;

/// zstd effort for one archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CompressionLevel(i32);

impl CompressionLevel {
    /// User-triggered archive; the user is still at the keyboard.
    pub const INTERACTIVE: Self = Self(15);
    /// Archives taken when nobody waits on the result (session exit).
    pub const BACKGROUND: Self = Self(19);

    pub fn new(level: i32) -> Result<Self, ArchiveError> {
        let range = zstd::compression_level_range();
        if !range.contains(&level) {
            return Err(ArchiveError::InvalidLevel {
                level,
                min: *range.start(),
                max: *range.end(),
            });
        }
        Ok(Self(level))
    }

    pub fn get(self) -> i32 {
        self.0
    }
}

impl fmt::Display for CompressionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// True when the text has nothing worth archiving.
pub fn is_blank(text: &str) -> bool {
    text.trim().is_empty()
}

/// One request to persist a compressed snapshot of a session's scrollback.
///
/// Built on the thread that captured the text and moved into the pool;
/// the worker drops it after a single attempt.
pub struct ArchivalJob {
    text: String,
    destination: PathBuf,
    level: CompressionLevel,
}

impl ArchivalJob {
    pub fn new(text: String, destination: PathBuf, level: CompressionLevel) -> Self {
        Self {
            text,
            destination,
            level,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    pub fn level(&self) -> CompressionLevel {
        self.level
    }
}

impl fmt::Debug for ArchivalJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArchivalJob")
            .field("text_bytes", &self.text.len())
            .field("destination", &self.destination)
            .field("level", &self.level)
            .finish()
    }
}
