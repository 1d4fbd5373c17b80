use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::app::{App, LoadState};

/// Handle a key event.
pub fn handle_key_event(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => return app.quit(),
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => return app.quit(),
        KeyCode::Char('r') => return app.start_loading(),
        _ => {}
    }

    // Everything else needs a tree to act on.
    if app.load_state != LoadState::Ready {
        return;
    }

    match key.code {
        KeyCode::Char('j') | KeyCode::Down => app.select_next(),
        KeyCode::Char('k') | KeyCode::Up => app.select_previous(),
        KeyCode::Char('g') | KeyCode::Home => app.select_first(),
        KeyCode::Char('G') | KeyCode::End => app.select_last(),
        KeyCode::Char('l') | KeyCode::Right => app.expand_selected(),
        KeyCode::Char('h') | KeyCode::Left => app.collapse_selected(),
        KeyCode::Enter => app.open_selected(),
        KeyCode::Esc | KeyCode::Char('x') => app.close_preview(),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::AppOptions;
    use crate::explorer::FileCollection;
    use crate::remote::testing::ScriptedService;
    use crate::remote::FileRecord;
    use crossterm::event::KeyEventKind;
    use std::sync::Arc;
    use tokio::sync::mpsc;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Press,
            state: crossterm::event::KeyEventState::NONE,
        }
    }

    fn ready_app() -> App {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut app = App::new(
            Arc::new(ScriptedService::new(vec![])),
            tx,
            AppOptions::default(),
        );
        let mut collection = FileCollection::new(3);
        for p in ["a/b.png", "a/c.png", "d.png"] {
            collection.merge(FileRecord::new(p, "s"));
        }
        app.handle_files_loaded(0, Ok(collection));
        app
    }

    #[test]
    fn arrows_and_vim_keys_move_selection() {
        let mut app = ready_app();
        handle_key_event(&mut app, key(KeyCode::Char('j')));
        handle_key_event(&mut app, key(KeyCode::Down));
        assert_eq!(app.tree_state.selected_index, 2);
        handle_key_event(&mut app, key(KeyCode::Up));
        assert_eq!(app.tree_state.selected_index, 1);
        handle_key_event(&mut app, key(KeyCode::Char('G')));
        assert_eq!(app.tree_state.selected_index, 3);
        handle_key_event(&mut app, key(KeyCode::Char('g')));
        assert_eq!(app.tree_state.selected_index, 0);
    }

    #[test]
    fn left_collapses_folder() {
        let mut app = ready_app();
        handle_key_event(&mut app, key(KeyCode::Left));
        assert_eq!(app.tree_state.flat_items.len(), 2);
        handle_key_event(&mut app, key(KeyCode::Right));
        assert_eq!(app.tree_state.flat_items.len(), 4);
    }

    #[test]
    fn navigation_ignored_while_loading() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut app = App::new(
            Arc::new(ScriptedService::new(vec![])),
            tx,
            AppOptions::default(),
        );
        handle_key_event(&mut app, key(KeyCode::Down));
        assert_eq!(app.tree_state.selected_index, 0);
    }

    #[test]
    fn q_and_ctrl_c_quit() {
        let mut app = ready_app();
        handle_key_event(&mut app, key(KeyCode::Char('q')));
        assert!(app.should_quit);

        let mut app = ready_app();
        let mut ctrl_c = key(KeyCode::Char('c'));
        ctrl_c.modifiers = KeyModifiers::CONTROL;
        handle_key_event(&mut app, ctrl_c);
        assert!(app.should_quit);
    }
}
