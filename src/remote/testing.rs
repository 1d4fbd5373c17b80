//! Scripted in-memory backend for tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::client::RemoteFileService;
use super::model::FileRecord;
use crate::error::{AppError, Result};

/// Replays a fixed list of `fetch_next_file` answers in order.
#[derive(Default)]
pub struct ScriptedService {
    responses: Mutex<VecDeque<Result<FileRecord>>>,
    /// Size of the `known` slice passed to each `fetch_next_file` call.
    pub known_lens: Mutex<Vec<usize>>,
    /// `(path, hidden_key)` of each preview request.
    pub preview_calls: Mutex<Vec<(String, String)>>,
    preview_bytes: Vec<u8>,
}

impl ScriptedService {
    pub fn new(responses: Vec<Result<FileRecord>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            ..Default::default()
        }
    }

    pub fn with_preview(mut self, bytes: Vec<u8>) -> Self {
        self.preview_bytes = bytes;
        self
    }

    pub fn calls(&self) -> usize {
        self.known_lens.lock().unwrap().len()
    }
}

/// `count` valid records with distinct paths, handed out in reverse order.
pub fn valid_records(count: usize) -> Vec<FileRecord> {
    (0..count)
        .rev()
        .map(|i| FileRecord::new(format!("d{}/file_{:02}.png", i % 3, i), format!("sum{}", i)))
        .collect()
}

#[async_trait]
impl RemoteFileService for ScriptedService {
    async fn fetch_next_file(&self, known: &[Arc<FileRecord>]) -> Result<FileRecord> {
        self.known_lens.lock().unwrap().push(known.len());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(AppError::Transport("script exhausted".into())))
    }

    async fn fetch_preview_image(&self, path: &str, hidden_key: &str) -> Result<Vec<u8>> {
        self.preview_calls
            .lock()
            .unwrap()
            .push((path.to_string(), hidden_key.to_string()));
        Ok(self.preview_bytes.clone())
    }
}
