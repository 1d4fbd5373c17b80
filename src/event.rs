use std::time::Duration;

use crossterm::event::{self, Event as CrosstermEvent, KeyEvent, KeyEventKind};
use tokio::sync::mpsc;

use crate::error::Result;
use crate::explorer::FileCollection;
use crate::session::SelectionToken;

/// Application events.
#[derive(Debug)]
pub enum Event {
    /// A key press event.
    Key(KeyEvent),
    /// A periodic tick for rendering.
    Tick,
    /// Terminal resize event.
    Resize,
    /// Load `generation` has collected `collected` of `target` files.
    LoadProgress {
        generation: u64,
        collected: usize,
        target: usize,
    },
    /// Load `generation` finished, for better or worse.
    FilesLoaded {
        generation: u64,
        result: Result<FileCollection>,
    },
    /// A preview fetch started under `token` finished.
    PreviewLoaded {
        token: SelectionToken,
        result: Result<Vec<u8>>,
    },
}

/// Async event handler that polls crossterm events and forwards them via a channel.
pub struct EventHandler {
    rx: mpsc::UnboundedReceiver<Event>,
    tx: mpsc::UnboundedSender<Event>,
}

impl EventHandler {
    /// Create a new EventHandler with the given tick rate.
    pub fn new(tick_rate: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let event_tx = tx.clone();

        // Polling blocks, so keep it off the async workers. The loop ends once
        // the receiver is dropped.
        tokio::task::spawn_blocking(move || loop {
            let forwarded = if event::poll(tick_rate).unwrap_or(false) {
                match event::read() {
                    Ok(CrosstermEvent::Key(key)) if key.kind == KeyEventKind::Press => {
                        event_tx.send(Event::Key(key))
                    }
                    Ok(CrosstermEvent::Resize(_, _)) => event_tx.send(Event::Resize),
                    _ => Ok(()),
                }
            } else {
                event_tx.send(Event::Tick)
            };
            if forwarded.is_err() {
                break;
            }
        });

        Self { rx, tx }
    }

    /// Get a sender clone for background tasks to report back on.
    pub fn sender(&self) -> mpsc::UnboundedSender<Event> {
        self.tx.clone()
    }

    /// Receive the next event (blocks until available).
    pub async fn next(&mut self) -> Result<Event> {
        self.rx
            .recv()
            .await
            .ok_or_else(|| crate::error::AppError::Terminal("Event channel closed".into()))
    }
}
