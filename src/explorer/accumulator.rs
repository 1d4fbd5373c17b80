use std::borrow::Borrow;
use std::cmp::Ordering as CmpOrdering;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::remote::{validate_file, FileRecord, RemoteFileService};

/// Number of files a collection holds once complete.
pub const MAX_FILES: usize = 30;
/// Consecutive invalid responses tolerated before giving up.
pub const DEFAULT_MAX_STALLED_FETCHES: u32 = 100;

/// Result of offering a record to a [`FileCollection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Added,
    /// A record with the same path is already present; nothing changed.
    Duplicate,
    /// The collection is frozen; nothing changed.
    Full,
}

/// Unique-by-path set of records with a fixed target size.
///
/// Members keep insertion order while the collection fills. On reaching the
/// target the collection freezes and sorts itself by path; only then does
/// [`FileCollection::visible`] expose anything.
#[derive(Debug, Clone)]
pub struct FileCollection {
    records: Vec<Arc<FileRecord>>,
    paths: HashSet<String>,
    target: usize,
    frozen: bool,
}

impl FileCollection {
    pub fn new(target: usize) -> Self {
        Self {
            records: Vec::with_capacity(target),
            paths: HashSet::with_capacity(target),
            target,
            frozen: target == 0,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_ready(&self) -> bool {
        self.frozen
    }

    pub fn contains(&self, path: &str) -> bool {
        self.paths.contains(path)
    }

    /// Add `record` unless its path is already present.
    ///
    /// Validity is the caller's concern.
    pub fn merge(&mut self, record: FileRecord) -> MergeOutcome {
        if self.frozen {
            return MergeOutcome::Full;
        }
        if self.contains(&record.path) {
            return MergeOutcome::Duplicate;
        }
        self.paths.insert(record.path.clone());
        self.records.push(Arc::new(record));
        if self.records.len() >= self.target {
            sort_by_path(&mut self.records);
            self.frozen = true;
        }
        MergeOutcome::Added
    }

    /// Members collected so far, in insertion order until frozen.
    ///
    /// Sent to the backend as context; views use [`FileCollection::visible`].
    pub fn members(&self) -> &[Arc<FileRecord>] {
        &self.records
    }

    /// The sorted records once ready, an empty slice before that.
    pub fn visible(&self) -> &[Arc<FileRecord>] {
        if self.frozen {
            &self.records
        } else {
            &[]
        }
    }
}

/// Keep the first occurrence of every path, preserving order.
#[allow(dead_code)]
pub fn deduplicate(records: Vec<FileRecord>) -> Vec<FileRecord> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|r| seen.insert(r.path.clone()))
        .collect()
}

/// Dictionary order: compare case-folded, then break ties byte-wise so the
/// order stays total.
pub fn collate(a: &str, b: &str) -> CmpOrdering {
    a.chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase))
        .then_with(|| a.cmp(b))
}

/// Stable ascending sort by path in [`collate`] order.
pub fn sort_by_path<T: Borrow<FileRecord>>(records: &mut [T]) {
    records.sort_by(|a, b| collate(&a.borrow().path, &b.borrow().path));
}

/// Sequential fetch-validate-merge loop that fills a [`FileCollection`].
#[derive(Debug, Clone, Copy)]
pub struct FileAccumulator {
    target: usize,
    /// Cap on consecutive invalid responses; `0` disables it.
    max_stalled_fetches: u32,
}

impl Default for FileAccumulator {
    fn default() -> Self {
        Self::new(MAX_FILES, DEFAULT_MAX_STALLED_FETCHES)
    }
}

impl FileAccumulator {
    pub fn new(target: usize, max_stalled_fetches: u32) -> Self {
        Self {
            target,
            max_stalled_fetches,
        }
    }

    pub fn target(&self) -> usize {
        self.target
    }

    /// Fetch one file at a time until the collection is full.
    ///
    /// - `progress_fn`: called with `(collected, target)` after each new file
    /// - `cancel`: checked before each fetch; if set, stops with `Cancelled`
    ///
    /// Invalid and duplicate responses trigger an immediate re-fetch with the
    /// same state and do not count toward the target. Only a run of invalid
    /// responses trips the stall guard; duplicates are absorbed.
    pub async fn run<P>(
        &self,
        service: &dyn RemoteFileService,
        mut progress_fn: P,
        cancel: &AtomicBool,
    ) -> Result<FileCollection>
    where
        P: FnMut(usize, usize) + Send,
    {
        let mut collection = FileCollection::new(self.target);
        let mut stalled: u32 = 0;

        while !collection.is_ready() {
            if cancel.load(Ordering::Relaxed) {
                tracing::debug!(collected = collection.len(), "accumulation cancelled");
                return Err(AppError::Cancelled);
            }

            let candidate = service.fetch_next_file(collection.members()).await?;

            if !validate_file(&candidate) {
                tracing::debug!(path = %candidate.path, "discarding invalid file record");
                stalled += 1;
            } else {
                stalled = 0;
                match collection.merge(candidate) {
                    MergeOutcome::Added => progress_fn(collection.len(), self.target),
                    MergeOutcome::Duplicate => tracing::trace!("dropping duplicate file record"),
                    MergeOutcome::Full => break,
                }
            }

            if self.max_stalled_fetches > 0 && stalled >= self.max_stalled_fetches {
                tracing::warn!(stalled, collected = collection.len(), "backend keeps sending invalid files");
                return Err(AppError::Stalled(stalled));
            }
        }

        tracing::info!(files = collection.len(), "file collection complete");
        Ok(collection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::testing::{valid_records, ScriptedService};
    use proptest::prelude::*;

    fn record(path: &str) -> FileRecord {
        FileRecord::new(path, "sum")
    }

    fn paths(records: &[Arc<FileRecord>]) -> Vec<&str> {
        records.iter().map(|r| r.path.as_str()).collect()
    }

    #[test]
    fn collection_hidden_until_target_reached() {
        let mut c = FileCollection::new(3);
        assert_eq!(c.merge(record("c")), MergeOutcome::Added);
        assert_eq!(c.merge(record("a")), MergeOutcome::Added);
        assert!(!c.is_ready());
        assert!(c.visible().is_empty());
        assert_eq!(paths(c.members()), vec!["c", "a"]);

        assert_eq!(c.merge(record("b")), MergeOutcome::Added);
        assert!(c.is_ready());
        assert_eq!(paths(c.visible()), vec!["a", "b", "c"]);
    }

    #[test]
    fn collection_drops_duplicates_without_progress() {
        let mut c = FileCollection::new(2);
        c.merge(record("x"));
        assert_eq!(c.merge(record("x")), MergeOutcome::Duplicate);
        assert_eq!(c.len(), 1);
        assert!(c.contains("x"));
    }

    #[test]
    fn frozen_collection_rejects_more() {
        let mut c = FileCollection::new(1);
        c.merge(record("only"));
        assert_eq!(c.merge(record("extra")), MergeOutcome::Full);
        assert_eq!(c.len(), 1);
    }

    #[test]
    fn zero_target_is_ready_immediately() {
        let c = FileCollection::new(0);
        assert!(c.is_ready());
        assert!(c.visible().is_empty());
    }

    #[test]
    fn deduplicate_prefers_first_seen() {
        let mut first = record("a");
        first.metadata.size = 1;
        let mut second = record("a");
        second.metadata.size = 2;
        let out = deduplicate(vec![first, record("b"), second]);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].metadata.size, 1);
        assert_eq!(out[1].path, "b");
    }

    #[tokio::test]
    async fn skips_invalid_records_then_fills_to_target() {
        let mut script: Vec<Result<FileRecord>> = vec![
            Ok(FileRecord::new("", "sum")),
            Ok(FileRecord::new("bad/no_checksum.png", "")),
            Ok(FileRecord::default()),
        ];
        script.extend(valid_records(MAX_FILES).into_iter().map(Ok));
        let service = ScriptedService::new(script);
        let cancel = AtomicBool::new(false);
        let mut progress = Vec::new();

        let collection = FileAccumulator::default()
            .run(&service, |n, total| progress.push((n, total)), &cancel)
            .await
            .unwrap();

        assert!(collection.is_ready());
        assert_eq!(collection.visible().len(), MAX_FILES);
        let got = paths(collection.visible());
        let mut sorted = got.clone();
        sorted.sort();
        assert_eq!(got, sorted);
        assert_eq!(service.calls(), MAX_FILES + 3);
        assert_eq!(progress.len(), MAX_FILES);
        assert_eq!(progress.last(), Some(&(MAX_FILES, MAX_FILES)));
    }

    #[tokio::test]
    async fn duplicates_force_another_fetch() {
        let script = vec![
            Ok(record("b")),
            Ok(record("b")),
            Ok(record("a")),
            Ok(record("b")),
            Ok(record("c")),
        ];
        let service = ScriptedService::new(script);
        let cancel = AtomicBool::new(false);

        let collection = FileAccumulator::new(3, 0)
            .run(&service, |_, _| {}, &cancel)
            .await
            .unwrap();

        assert_eq!(paths(collection.visible()), vec!["a", "b", "c"]);
        // Each fetch sees the collection as it stood after the previous merge.
        assert_eq!(*service.known_lens.lock().unwrap(), vec![0, 1, 1, 2, 2]);
    }

    #[tokio::test]
    async fn transport_error_ends_the_run() {
        let service = ScriptedService::new(vec![
            Ok(record("a")),
            Err(AppError::Transport("connection refused".into())),
        ]);
        let cancel = AtomicBool::new(false);
        let result = FileAccumulator::new(5, 0)
            .run(&service, |_, _| {}, &cancel)
            .await;
        assert!(matches!(result, Err(AppError::Transport(_))));
    }

    #[tokio::test]
    async fn stall_guard_caps_unproductive_fetches() {
        let script = (0..10).map(|_| Ok(FileRecord::default())).collect();
        let service = ScriptedService::new(script);
        let cancel = AtomicBool::new(false);
        let result = FileAccumulator::new(5, 4)
            .run(&service, |_, _| {}, &cancel)
            .await;
        assert!(matches!(result, Err(AppError::Stalled(4))));
        assert_eq!(service.calls(), 4);
    }

    #[tokio::test]
    async fn long_duplicate_runs_do_not_trip_the_stall_guard() {
        let mut script = vec![Ok(record("a.png"))];
        script.extend((0..DEFAULT_MAX_STALLED_FETCHES + 5).map(|_| Ok(record("a.png"))));
        script.push(Ok(record("b.png")));
        let service = ScriptedService::new(script);
        let cancel = AtomicBool::new(false);

        let collection = FileAccumulator::new(2, DEFAULT_MAX_STALLED_FETCHES)
            .run(&service, |_, _| {}, &cancel)
            .await
            .unwrap();
        assert_eq!(paths(collection.visible()), vec!["a.png", "b.png"]);
    }

    #[tokio::test]
    async fn valid_duplicate_resets_invalid_run() {
        let script = vec![
            Ok(record("a")),
            Ok(FileRecord::default()),
            Ok(FileRecord::default()),
            Ok(record("a")),
            Ok(FileRecord::default()),
            Ok(FileRecord::default()),
            Ok(record("b")),
        ];
        let service = ScriptedService::new(script);
        let cancel = AtomicBool::new(false);
        let result = FileAccumulator::new(2, 3)
            .run(&service, |_, _| {}, &cancel)
            .await;
        assert!(result.is_ok());
    }

    #[test]
    fn mixed_case_paths_sort_in_dictionary_order() {
        let mut c = FileCollection::new(3);
        c.merge(record("Bz.png"));
        c.merge(record("ay.png"));
        c.merge(record("c/A.png"));
        assert_eq!(paths(c.visible()), vec!["ay.png", "Bz.png", "c/A.png"]);
        assert_eq!(crate::explorer::derive_hidden_key(&c), "yz/");
    }

    #[test]
    fn collate_breaks_case_ties_bytewise() {
        assert_eq!(collate("B", "b"), CmpOrdering::Less);
        assert_eq!(collate("a", "B"), CmpOrdering::Less);
        assert_eq!(collate("same", "same"), CmpOrdering::Equal);
    }

    #[tokio::test]
    async fn cancel_flag_stops_before_fetching() {
        let service = ScriptedService::new(vec![Ok(record("a"))]);
        let cancel = AtomicBool::new(true);
        let result = FileAccumulator::new(1, 0)
            .run(&service, |_, _| {}, &cancel)
            .await;
        assert!(matches!(result, Err(AppError::Cancelled)));
        assert_eq!(service.calls(), 0);
    }

    proptest! {
        #[test]
        fn deduplicate_keeps_one_per_path(raw in prop::collection::vec("[a-c]{1,2}", 0..20)) {
            let input: Vec<FileRecord> = raw.iter().map(|p| record(p)).collect();
            let out = deduplicate(input);
            let unique: HashSet<&str> = raw.iter().map(String::as_str).collect();
            prop_assert_eq!(out.len(), unique.len());
            // First-seen order is preserved.
            let mut expected = Vec::new();
            for p in &raw {
                if !expected.contains(p) {
                    expected.push(p.clone());
                }
            }
            let got: Vec<String> = out.into_iter().map(|r| r.path).collect();
            prop_assert_eq!(got, expected);
        }

        #[test]
        fn sort_is_ordered_and_idempotent(raw in prop::collection::vec("[a-zA-Z/]{0,6}", 0..20)) {
            let mut records: Vec<FileRecord> = raw.iter().map(|p| record(p)).collect();
            sort_by_path(&mut records);
            prop_assert!(records
                .windows(2)
                .all(|w| collate(&w[0].path, &w[1].path) != CmpOrdering::Greater));
            let once = records.clone();
            sort_by_path(&mut records);
            prop_assert_eq!(once, records);
        }
    }
}
