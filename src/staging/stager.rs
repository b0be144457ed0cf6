use serde::Serialize;
use tracing::debug;

use crate::staging::staged_file::{
    FileId, FileStatus, IncomingFile, StagedFile, format_file_size,
};

// ============================================================================
// File stager: ordered list of pending uploads
// ============================================================================

/// One rendered row of the staged-file list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileRow {
    /// Position in the visible list (always 0..n-1)
    pub index: usize,
    pub id: FileId,
    pub extension: String,
    pub name: String,
    /// `"<sent> / <size>"`
    pub transfer: String,
    pub status: String,
    pub client_name: Option<String>,
}

/// Owns the staged files. Rows are identified by a stable `FileId`; the
/// display index is simply the position in `files`, so removing a row
/// never leaves gaps or stale handlers behind.
#[derive(Debug, Default)]
pub struct FileStager {
    files: Vec<StagedFile>,
    next_id: u64,
}

impl FileStager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append files at the end of the list with status `Ready`.
    pub fn stage(&mut self, incoming: Vec<IncomingFile>) -> Vec<FileId> {
        let mut ids = Vec::with_capacity(incoming.len());
        for file in incoming {
            let id = FileId(self.next_id);
            self.next_id += 1;
            debug!(%id, name = %file.name, size = file.byte_size, "staged file");
            self.files.push(StagedFile {
                id,
                name: file.name,
                byte_size: file.byte_size,
                source: file.source,
                client: file.client,
                status: FileStatus::Ready,
            });
            ids.push(id);
        }
        ids
    }

    /// Remove the file shown at `index`. Out-of-range indices are ignored.
    pub fn remove(&mut self, index: usize) -> Option<StagedFile> {
        if index >= self.files.len() {
            return None;
        }
        let removed = self.files.remove(index);
        debug!(id = %removed.id, index, "removed staged file");
        Some(removed)
    }

    /// Remove a file by identity, wherever it currently sits.
    pub fn remove_file(&mut self, id: FileId) -> Option<StagedFile> {
        let index = self.index_of(id)?;
        self.remove(index)
    }

    pub fn clear(&mut self) {
        self.files.clear();
    }

    pub fn index_of(&self, id: FileId) -> Option<usize> {
        self.files.iter().position(|f| f.id == id)
    }

    pub fn get(&self, id: FileId) -> Option<&StagedFile> {
        self.files.iter().find(|f| f.id == id)
    }

    pub fn files(&self) -> &[StagedFile] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Update a file's status. Returns false when the file is gone.
    pub fn set_status(&mut self, id: FileId, status: FileStatus) -> bool {
        match self.files.iter_mut().find(|f| f.id == id) {
            Some(file) => {
                file.status = status;
                true
            }
            None => false,
        }
    }

    pub fn completed_count(&self) -> usize {
        self.files
            .iter()
            .filter(|f| f.status == FileStatus::Completed)
            .count()
    }

    /// Aggregate line shown above the list.
    pub fn summary_line(&self) -> String {
        format!(
            "{} / {} files ready for submission",
            self.completed_count(),
            self.files.len()
        )
    }

    pub fn rows(&self) -> Vec<FileRow> {
        self.files
            .iter()
            .enumerate()
            .map(|(index, file)| FileRow {
                index,
                id: file.id,
                extension: file.extension().to_string(),
                name: file.name.clone(),
                transfer: format!(
                    "{} / {}",
                    format_file_size(file.bytes_sent()),
                    format_file_size(file.byte_size)
                ),
                status: file.status.to_string(),
                client_name: file.client.as_ref().map(|c| c.name.clone()),
            })
            .collect()
    }
}
