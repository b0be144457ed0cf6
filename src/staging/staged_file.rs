use std::fmt;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::clients::client_model::ClientRef;

const KIB: f64 = 1024.0;
const MIB: u64 = 1024 * 1024;

/// Stable identity of a staged file, independent of its row position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct FileId(pub u64);

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Where the bytes of a file come from.
#[derive(Debug, Clone)]
pub enum FileSource {
    Path(PathBuf),
    Memory(Vec<u8>),
}

impl FileSource {
    /// Open a fresh reader over the content.
    pub fn open(&self) -> std::io::Result<Box<dyn Read + Send>> {
        match self {
            FileSource::Path(path) => Ok(Box::new(std::fs::File::open(path)?)),
            FileSource::Memory(bytes) => Ok(Box::new(Cursor::new(bytes.clone()))),
        }
    }
}

/// A file as handed over by the picker, before it has an id.
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub name: String,
    pub byte_size: u64,
    pub source: FileSource,
    pub client: Option<ClientRef>,
}

impl IncomingFile {
    /// Describe a file on disk. Fails if it cannot be stat'ed.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let metadata = std::fs::metadata(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Ok(Self {
            name,
            byte_size: metadata.len(),
            source: FileSource::Path(path.to_path_buf()),
            client: None,
        })
    }

    pub fn from_bytes(name: &str, bytes: Vec<u8>) -> Self {
        Self {
            name: name.to_string(),
            byte_size: bytes.len() as u64,
            source: FileSource::Memory(bytes),
            client: None,
        }
    }

    pub fn with_client(mut self, client: ClientRef) -> Self {
        self.client = Some(client);
        self
    }
}

/// Upload progress of a single staged file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FileStatus {
    Ready,
    Uploading(u8),
    Completed,
    Failed,
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileStatus::Ready => write!(f, "Ready"),
            FileStatus::Uploading(percent) => write!(f, "Uploading: {}%", percent),
            FileStatus::Completed => write!(f, "Completed"),
            FileStatus::Failed => write!(f, "Failed"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StagedFile {
    pub id: FileId,
    pub name: String,
    pub byte_size: u64,
    pub source: FileSource,
    pub client: Option<ClientRef>,
    pub status: FileStatus,
}

impl StagedFile {
    /// Text after the last dot, or the whole name when there is none.
    pub fn extension(&self) -> &str {
        file_extension(&self.name)
    }

    /// Bytes known to have been sent, derived from the status.
    pub fn bytes_sent(&self) -> u64 {
        match self.status {
            FileStatus::Ready | FileStatus::Failed => 0,
            FileStatus::Uploading(percent) => self.byte_size * percent as u64 / 100,
            FileStatus::Completed => self.byte_size,
        }
    }
}

pub fn file_extension(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}

/// Human-readable size: KB below 1 MiB, MB from there on, two decimals.
pub fn format_file_size(bytes: u64) -> String {
    if bytes >= MIB {
        format!("{:.2} MB", bytes as f64 / MIB as f64)
    } else {
        format!("{:.2} KB", bytes as f64 / KIB)
    }
}
