//! Display policy for synced files.
//!
//! [`resolve_display_state`] reconciles the synced [`FileRecord`] with this device's
//! [`LocalFileEntry`] into a [`DisplayState`]. It is pure and cheap: callers recompute it
//! from scratch on every change notification instead of patching a previous result.
//!
//! # Downloading vs. displayable
//!
//! `is_downloading` is reported as the raw transfer flag, even when the file is already
//! displayable. Consumers must tell apart:
//!
//! - nothing to show yet and a download is running ([`DisplayState::is_blocking_download`]),
//! - something is shown and a transfer refreshes it in the background
//!   ([`DisplayState::is_background_activity`]).

use crate::types::{FileRecord, LocalFileEntry};
use serde::Serialize;
use std::fmt;
use std::time::UNIX_EPOCH;

/// Presentation decision for one file on this device. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayState {
    /// A local blob matching the content hash, or a remote copy, is fetchable now.
    pub can_display: bool,
    pub is_uploading: bool,
    /// Raw download flag; see the module docs for how to surface it.
    pub is_downloading: bool,
    /// The tracking entry that was consulted, for diagnostics.
    pub local_state: Option<LocalFileEntry>,
}

impl DisplayState {
    /// Nothing displayable yet while bytes are on their way.
    pub fn is_blocking_download(&self) -> bool {
        self.is_downloading && !self.can_display
    }

    /// Displayable, with an upload or download still running.
    pub fn is_background_activity(&self) -> bool {
        self.can_display && (self.is_uploading || self.is_downloading)
    }

    /// Placeholder to render when the file cannot be displayed; `None` when it can.
    pub fn placeholder(&self) -> Option<PlaceholderLabel> {
        if self.can_display {
            return None;
        }
        Some(if self.is_uploading {
            PlaceholderLabel::Uploading
        } else if self.is_downloading {
            PlaceholderLabel::Downloading
        } else {
            PlaceholderLabel::Waiting
        })
    }
}

/// Reconciles a synced record with this device's tracking entry.
///
/// A missing `local_entry` means this device has no knowledge of the file yet. A local
/// blob only counts when its hash equals the record's content hash, so stale bytes from
/// an earlier version are never shown.
pub fn resolve_display_state(
    file: &FileRecord,
    local_entry: Option<&LocalFileEntry>,
) -> DisplayState {
    let local_bytes_usable = local_entry.is_some_and(|entry| entry.holds(&file.content_hash));
    let remote_bytes_usable = file.remote_key.is_some();

    DisplayState {
        can_display: local_bytes_usable || remote_bytes_usable,
        is_uploading: local_entry.is_some_and(|entry| entry.upload_status.is_active()),
        is_downloading: local_entry.is_some_and(|entry| entry.download_status.is_active()),
        local_state: local_entry.cloned(),
    }
}

/// Text shown in place of a file that cannot be displayed yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PlaceholderLabel {
    Uploading,
    Downloading,
    Waiting,
}

impl fmt::Display for PlaceholderLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaceholderLabel::Uploading => write!(f, "Uploading..."),
            PlaceholderLabel::Downloading => write!(f, "Downloading..."),
            PlaceholderLabel::Waiting => write!(f, "Waiting for file..."),
        }
    }
}

/// Diagnostic snapshot of a file's sync state, as shown on debug surfaces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DebugReport {
    pub file_path: String,
    pub remote_key: Option<String>,
    pub content_hash: String,
    /// Milliseconds since the Unix epoch.
    pub updated_at_ms: u128,
    pub local_hash: Option<String>,
    pub download_status: Option<String>,
    pub upload_status: Option<String>,
    pub can_display: bool,
    pub last_sync_error: Option<String>,
}

impl DebugReport {
    pub fn new(file: &FileRecord, local_entry: Option<&LocalFileEntry>) -> Self {
        let state = resolve_display_state(file, local_entry);
        let local = state.local_state.as_ref();

        Self {
            file_path: file.path.clone(),
            remote_key: file.remote_key.clone(),
            content_hash: file.content_hash.to_string(),
            updated_at_ms: file
                .updated_at
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis())
                .unwrap_or_default(),
            local_hash: local.and_then(|e| e.local_hash.as_ref().map(ToString::to_string)),
            download_status: local.map(|e| e.download_status.to_string()),
            upload_status: local.map(|e| e.upload_status.to_string()),
            can_display: state.can_display,
            last_sync_error: local.and_then(|e| e.last_sync_error.clone()),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

impl fmt::Display for DebugReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn or_null(value: &Option<String>) -> &str {
            value.as_deref().unwrap_or("null")
        }

        writeln!(f, "File Path:    {}", self.file_path)?;
        writeln!(f, "Remote Key:   {}", or_null(&self.remote_key))?;
        writeln!(f, "Content Hash: {}", self.content_hash)?;
        writeln!(f, "Updated At:   {}", self.updated_at_ms)?;
        writeln!(f, "Local Hash:   {}", or_null(&self.local_hash))?;
        writeln!(f, "Download:     {}", or_null(&self.download_status))?;
        writeln!(f, "Upload:       {}", or_null(&self.upload_status))?;
        write!(f, "Can Display:  {}", self.can_display)?;
        if let Some(error) = &self.last_sync_error {
            write!(f, "\nError:        {error}")?;
        }
        Ok(())
    }
}
