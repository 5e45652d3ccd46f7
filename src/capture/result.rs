use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::capture::timer::ScheduledTask;
use crate::error::CaptureError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Video,
    Image,
}

/// A dereferenceable reference to captured bytes.
///
/// Not `Clone`: the only way to release it is [`ObjectUrls::revoke`], which
/// consumes it, so a handle can be revoked at most once.
#[derive(Debug, PartialEq, Eq)]
pub struct ResultHandle {
    id: Uuid,
    url: String,
}

impl ResultHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[derive(Debug, Clone)]
pub struct Blob {
    pub data: Arc<[u8]>,
    pub mime_type: String,
}

#[derive(Default)]
struct ObjectTable {
    blobs: HashMap<Uuid, Blob>,
    created: usize,
    revoked: usize,
}

/// In-memory registry backing result handles, shared with whoever serves
/// previews and downloads.
#[derive(Clone, Default)]
pub struct ObjectUrls {
    table: Arc<Mutex<ObjectTable>>,
}

impl ObjectUrls {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, data: Vec<u8>, mime_type: &str) -> ResultHandle {
        let id = Uuid::new_v4();
        let mut table = self.lock();
        table.blobs.insert(
            id,
            Blob {
                data: data.into(),
                mime_type: mime_type.to_string(),
            },
        );
        table.created += 1;
        ResultHandle {
            id,
            url: format!("blob:pagecap/{id}"),
        }
    }

    pub fn resolve(&self, handle: &ResultHandle) -> Option<Blob> {
        self.lock().blobs.get(&handle.id).cloned()
    }

    /// Look a blob up by its URL, as a preview server would.
    pub fn resolve_url(&self, url: &str) -> Option<Blob> {
        let id = url.strip_prefix("blob:pagecap/")?.parse::<Uuid>().ok()?;
        self.lock().blobs.get(&id).cloned()
    }

    pub fn revoke(&self, handle: ResultHandle) {
        let mut table = self.lock();
        if table.blobs.remove(&handle.id).is_some() {
            table.revoked += 1;
            log::debug!("Revoked {}", handle.url);
        }
    }

    /// Handles created and not yet revoked.
    pub fn live(&self) -> usize {
        self.lock().blobs.len()
    }

    pub fn created(&self) -> usize {
        self.lock().created
    }

    pub fn revoked(&self) -> usize {
        self.lock().revoked
    }

    fn lock(&self) -> MutexGuard<'_, ObjectTable> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// What the copy action puts on the clipboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CopyPayload {
    /// PNG-encoded screenshot.
    Image(Vec<u8>),
    /// Suggested file name of a recording.
    Text(String),
}

/// The finished capture shown in the result dialog.
#[derive(Debug)]
pub struct CaptureResult {
    kind: MediaKind,
    handle: ResultHandle,
    mime_type: String,
    extension: &'static str,
    size_bytes: usize,
    elapsed_secs: Option<u64>,
    created_at: DateTime<Utc>,
    copied: bool,
    feedback: Option<ScheduledTask>,
}

impl CaptureResult {
    pub(crate) fn new(
        kind: MediaKind,
        handle: ResultHandle,
        mime_type: &str,
        extension: &'static str,
        size_bytes: usize,
        elapsed_secs: Option<u64>,
    ) -> Self {
        Self {
            kind,
            handle,
            mime_type: mime_type.to_string(),
            extension,
            size_bytes,
            elapsed_secs,
            created_at: Utc::now(),
            copied: false,
            feedback: None,
        }
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    pub fn id(&self) -> Uuid {
        self.handle.id()
    }

    pub fn url(&self) -> &str {
        self.handle.url()
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn extension(&self) -> &'static str {
        self.extension
    }

    pub fn size_bytes(&self) -> usize {
        self.size_bytes
    }

    pub fn elapsed_secs(&self) -> Option<u64> {
        self.elapsed_secs
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn is_copied(&self) -> bool {
        self.copied
    }

    pub fn download_filename(&self) -> String {
        let date = self.created_at.format("%Y-%m-%d");
        match self.kind {
            MediaKind::Video => format!("PageCap_{}_Recording.{}", date, self.extension),
            MediaKind::Image => format!("PageCap_{}_Screenshot.{}", date, self.extension),
        }
    }

    pub fn download_label(&self) -> String {
        match self.kind {
            MediaKind::Video => format!("Download .{}", self.extension.to_uppercase()),
            MediaKind::Image => "Download PNG".to_string(),
        }
    }

    pub fn copy_label(&self) -> &'static str {
        match (self.copied, self.kind) {
            (true, _) => "Copied!",
            (false, MediaKind::Video) => "Copy File Path",
            (false, MediaKind::Image) => "Copy Image",
        }
    }

    pub(crate) fn copy_payload(&self, objects: &ObjectUrls) -> Result<CopyPayload, CaptureError> {
        match self.kind {
            MediaKind::Image => {
                let blob = objects
                    .resolve(&self.handle)
                    .ok_or(CaptureError::ResultNotAvailable)?;
                Ok(CopyPayload::Image(blob.data.to_vec()))
            }
            MediaKind::Video => Ok(CopyPayload::Text(self.download_filename())),
        }
    }

    pub(crate) fn mark_copied(&mut self, feedback: ScheduledTask) {
        self.copied = true;
        self.feedback = Some(feedback);
    }

    pub(crate) fn clear_copied(&mut self) {
        self.copied = false;
        self.feedback = None;
    }

    /// Write the captured bytes into `dir` under the suggested file name.
    pub(crate) fn save_to(&self, objects: &ObjectUrls, dir: &Path) -> Result<PathBuf, CaptureError> {
        let blob = objects
            .resolve(&self.handle)
            .ok_or(CaptureError::ResultNotAvailable)?;
        std::fs::create_dir_all(dir)?;
        let path = dir.join(self.download_filename());
        std::fs::write(&path, &blob.data)?;
        log::info!("Saved {} bytes to {}", blob.data.len(), path.display());
        Ok(path)
    }

    pub(crate) fn release(self, objects: &ObjectUrls) {
        objects.revoke(self.handle);
    }
}
