use std::sync::Arc;

use crate::error::Result;
use crate::preview_content::PreviewImage;
use crate::remote::FileRecord;

/// Identity of one selection; preview results carry the token they were
/// requested under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SelectionToken(u64);

/// What the preview pane currently holds.
#[derive(Debug, Default)]
pub enum PreviewStatus {
    #[default]
    Idle,
    Loading,
    Ready(PreviewImage),
    Failed(String),
}

/// Everything a preview task needs, detached from the session.
#[derive(Debug, Clone)]
pub struct PreviewRequest {
    pub token: SelectionToken,
    pub path: String,
    pub hidden_key: String,
}

/// Owns the selected file and its preview.
///
/// Every `select`, `clear`, or hidden-key change moves to a new token, so a
/// preview fetched for an earlier selection can never overwrite a later one.
#[derive(Debug, Default)]
pub struct Session {
    selection: Option<Arc<FileRecord>>,
    pub preview: PreviewStatus,
    hidden_key: String,
    token: SelectionToken,
}

impl Session {
    pub fn selection(&self) -> Option<&Arc<FileRecord>> {
        self.selection.as_ref()
    }

    pub fn hidden_key(&self) -> &str {
        &self.hidden_key
    }

    #[cfg(test)]
    pub fn current_token(&self) -> SelectionToken {
        self.token
    }

    fn next_token(&mut self) -> SelectionToken {
        self.token = SelectionToken(self.token.0 + 1);
        self.token
    }

    /// Select `file` and describe the preview fetch it needs.
    ///
    /// Without a hidden key there is nothing to fetch: the preview is marked
    /// failed and `None` is returned.
    pub fn select(&mut self, file: Arc<FileRecord>) -> Option<PreviewRequest> {
        let token = self.next_token();
        let path = file.path.clone();
        self.selection = Some(file);

        if self.hidden_key.is_empty() {
            self.preview = PreviewStatus::Failed("Hidden key not available yet".into());
            return None;
        }

        self.preview = PreviewStatus::Loading;
        tracing::debug!(path = %path, token = token.0, "preview requested");
        Some(PreviewRequest {
            token,
            path,
            hidden_key: self.hidden_key.clone(),
        })
    }

    /// Close the preview and forget the selection.
    pub fn clear(&mut self) {
        self.next_token();
        self.selection = None;
        self.preview = PreviewStatus::Idle;
    }

    /// Install a newly derived key; a different key invalidates the preview.
    pub fn set_hidden_key(&mut self, key: String) {
        if key != self.hidden_key {
            self.hidden_key = key;
            self.clear();
        }
    }

    /// Apply a finished preview fetch. Returns `false` if it was stale.
    pub fn apply_preview(&mut self, token: SelectionToken, result: Result<Vec<u8>>) -> bool {
        if token != self.token {
            tracing::debug!(token = token.0, current = self.token.0, "dropping stale preview");
            return false;
        }
        self.preview = match result.and_then(|bytes| PreviewImage::decode(&bytes)) {
            Ok(image) => {
                let (width, height) = image.dimensions();
                tracing::debug!(width, height, "preview decoded");
                PreviewStatus::Ready(image)
            }
            Err(e) => {
                tracing::warn!(error = %e, "preview failed");
                PreviewStatus::Failed(e.to_string())
            }
        };
        true
    }
}
