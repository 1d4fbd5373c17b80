use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

use crate::config::AppConfig;
use crate::error::{AppError, Result};
use crate::event::Event;
use crate::explorer::tree::leaf_count;
use crate::explorer::{build_tree, derive_hidden_key, FileAccumulator, FileCollection, TreeState};
use crate::remote::RemoteFileService;
use crate::session::{PreviewRequest, SelectionToken, Session};
use crate::theme::{self, ThemeColors};

/// Where the file list stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    Loading { collected: usize, target: usize },
    Ready,
    Failed(String),
}

/// Presentation settings resolved from config.
#[derive(Debug, Clone)]
pub struct AppOptions {
    pub accumulator: FileAccumulator,
    pub theme: ThemeColors,
    pub use_icons: bool,
    pub expand_all: bool,
    pub preview_enabled: bool,
}

impl AppOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            accumulator: FileAccumulator::new(config.max_files(), config.max_stalled_fetches()),
            theme: theme::resolve_theme(&config.theme),
            use_icons: config.use_icons(),
            expand_all: config.expand_all(),
            preview_enabled: config.preview_enabled(),
        }
    }
}

impl Default for AppOptions {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

/// Main application state.
pub struct App {
    pub load_state: LoadState,
    pub collection: FileCollection,
    pub tree_state: TreeState,
    pub session: Session,
    pub should_quit: bool,
    pub status_message: Option<(String, Instant)>,
    pub options: AppOptions,
    service: Arc<dyn RemoteFileService>,
    event_tx: UnboundedSender<Event>,
    generation: u64,
    cancel: Arc<AtomicBool>,
    loader: Option<JoinHandle<()>>,
    preview_task: Option<JoinHandle<()>>,
}

impl App {
    /// Create an idle App; call [`App::start_loading`] to fetch files.
    pub fn new(
        service: Arc<dyn RemoteFileService>,
        event_tx: UnboundedSender<Event>,
        options: AppOptions,
    ) -> Self {
        let target = options.accumulator.target();
        Self {
            load_state: LoadState::Loading {
                collected: 0,
                target,
            },
            collection: FileCollection::new(target),
            tree_state: TreeState::default(),
            session: Session::default(),
            should_quit: false,
            status_message: None,
            options,
            service,
            event_tx,
            generation: 0,
            cancel: Arc::new(AtomicBool::new(false)),
            loader: None,
            preview_task: None,
        }
    }

    /// Throw away everything and accumulate a fresh collection in the background.
    pub fn start_loading(&mut self) {
        self.stop_loader();
        self.close_preview();

        self.generation += 1;
        let target = self.options.accumulator.target();
        self.collection = FileCollection::new(target);
        self.tree_state = TreeState::default();
        self.session.set_hidden_key(String::new());
        self.load_state = LoadState::Loading {
            collected: 0,
            target,
        };

        let generation = self.generation;
        let accumulator = self.options.accumulator;
        let service = Arc::clone(&self.service);
        let cancel = Arc::new(AtomicBool::new(false));
        self.cancel = Arc::clone(&cancel);
        let tx = self.event_tx.clone();

        tracing::info!(generation, target, "starting file accumulation");
        self.loader = Some(tokio::spawn(async move {
            let progress_tx = tx.clone();
            let result = accumulator
                .run(
                    service.as_ref(),
                    move |collected, target| {
                        let _ = progress_tx.send(Event::LoadProgress {
                            generation,
                            collected,
                            target,
                        });
                    },
                    &cancel,
                )
                .await;
            if matches!(result, Err(AppError::Cancelled)) {
                return;
            }
            if tx.send(Event::FilesLoaded { generation, result }).is_err() {
                tracing::debug!(generation, "explorer closed before files arrived");
            }
        }));
    }

    fn stop_loader(&mut self) {
        self.cancel.store(true, Ordering::Relaxed);
        if let Some(handle) = self.loader.take() {
            handle.abort();
        }
    }

    pub fn handle_load_progress(&mut self, generation: u64, collected: usize, target: usize) {
        if generation != self.generation {
            return;
        }
        if let LoadState::Loading { .. } = self.load_state {
            self.load_state = LoadState::Loading { collected, target };
        }
    }

    pub fn handle_files_loaded(&mut self, generation: u64, result: Result<FileCollection>) {
        if generation != self.generation {
            tracing::debug!(generation, current = self.generation, "ignoring stale load");
            return;
        }
        self.loader = None;
        match result {
            Ok(collection) => {
                let forest = build_tree(collection.visible());
                let shown = leaf_count(&forest);
                if shown != collection.len() {
                    tracing::warn!(shown, collected = collection.len(), "some files collide in the tree");
                }
                self.tree_state = TreeState::new(forest, self.options.expand_all);
                self.session.set_hidden_key(derive_hidden_key(&collection));
                self.set_status_message(format!("Loaded {} files", collection.len()));
                self.collection = collection;
                self.load_state = LoadState::Ready;
            }
            Err(e) => {
                tracing::error!(error = %e, "file accumulation failed");
                self.load_state = LoadState::Failed(e.to_string());
            }
        }
    }

    /// Enter on the selected row: toggle a folder, or preview a file.
    pub fn open_selected(&mut self) {
        let Some(item) = self.tree_state.selected_item() else {
            return;
        };
        if item.is_folder {
            self.tree_state.toggle_selected();
            return;
        }
        let Some(file) = self.tree_state.selected_file() else {
            return;
        };
        if !self.options.preview_enabled {
            self.set_status_message("Preview is disabled".into());
            return;
        }
        if let Some(request) = self.session.select(file) {
            self.spawn_preview(request);
        }
    }

    fn spawn_preview(&mut self, request: PreviewRequest) {
        if let Some(handle) = self.preview_task.take() {
            handle.abort();
        }
        let service = Arc::clone(&self.service);
        let tx = self.event_tx.clone();
        self.preview_task = Some(tokio::spawn(async move {
            let result = service
                .fetch_preview_image(&request.path, &request.hidden_key)
                .await;
            let _ = tx.send(Event::PreviewLoaded {
                token: request.token,
                result,
            });
        }));
    }

    pub fn handle_preview_loaded(&mut self, token: SelectionToken, result: Result<Vec<u8>>) {
        if self.session.apply_preview(token, result) {
            self.preview_task = None;
        }
    }

    /// Close the preview pane and drop the selection.
    pub fn close_preview(&mut self) {
        if let Some(handle) = self.preview_task.take() {
            handle.abort();
        }
        self.session.clear();
    }

    /// Set a status message with current timestamp.
    pub fn set_status_message(&mut self, msg: String) {
        self.status_message = Some((msg, Instant::now()));
    }

    /// Clear the status message if it has been displayed for more than 3 seconds.
    pub fn clear_expired_status(&mut self) {
        if let Some((_, ref created)) = self.status_message {
            if created.elapsed().as_secs() > 3 {
                self.status_message = None;
            }
        }
    }

    /// Quit the application.
    pub fn quit(&mut self) {
        self.stop_loader();
        self.close_preview();
        self.should_quit = true;
    }

    /// Move selection down by one item.
    pub fn select_next(&mut self) {
        let len = self.tree_state.flat_items.len();
        if len > 0 && self.tree_state.selected_index < len - 1 {
            self.tree_state.selected_index += 1;
        }
    }

    /// Move selection up by one item.
    pub fn select_previous(&mut self) {
        if self.tree_state.selected_index > 0 {
            self.tree_state.selected_index -= 1;
        }
    }

    /// Jump to the first item.
    pub fn select_first(&mut self) {
        self.tree_state.selected_index = 0;
    }

    /// Jump to the last item.
    pub fn select_last(&mut self) {
        let len = self.tree_state.flat_items.len();
        if len > 0 {
            self.tree_state.selected_index = len - 1;
        }
    }

    /// Expand the selected folder (or no-op on files).
    pub fn expand_selected(&mut self) {
        self.tree_state.expand_selected();
    }

    /// Collapse the selected folder, or jump to parent.
    pub fn collapse_selected(&mut self) {
        self.tree_state.collapse_selected();
    }
}
