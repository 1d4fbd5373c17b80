use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::app::{App, LoadState};
use crate::components::preview::{self, PreviewWidget};
use crate::components::status_bar::StatusBarWidget;
use crate::components::tree::TreeWidget;
use crate::session::PreviewStatus;

/// Render the application UI.
pub fn render(app: &mut App, frame: &mut Frame) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(frame.area());
    let (main_area, status_area) = (rows[0], rows[1]);

    let (tree_area, preview_area) = if app.options.preview_enabled {
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
            .split(main_area);
        (cols[0], Some(cols[1]))
    } else {
        (main_area, None)
    };

    render_tree(app, frame, tree_area);
    if let Some(area) = preview_area {
        render_preview(app, frame, area);
    }
    render_status_bar(app, frame, status_area);
}

fn render_tree(app: &mut App, frame: &mut Frame, area: Rect) {
    let theme = &app.options.theme;
    let block = Block::default()
        .title(" Files ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.border_focused_fg));

    match &app.load_state {
        LoadState::Ready => {
            // Keep the selected item visible; two rows go to the border.
            app.tree_state
                .update_scroll(area.height.saturating_sub(2) as usize);
            let widget = TreeWidget::new(&app.tree_state, &app.options.theme, app.options.use_icons)
                .previewed(app.session.selection().map(|f| f.path.as_str()))
                .block(block);
            frame.render_widget(widget, area);
        }
        LoadState::Loading { collected, target } => {
            let text = format!("Loading files… {}/{}", collected, target);
            let widget = Paragraph::new(Line::from(Span::styled(
                text,
                Style::default().fg(theme.info_fg),
            )))
            .alignment(Alignment::Center)
            .block(block);
            frame.render_widget(widget, area);
        }
        LoadState::Failed(msg) => {
            let widget = Paragraph::new(vec![
                Line::from(Span::styled(
                    format!("✗ {}", msg),
                    Style::default().fg(theme.error_fg),
                )),
                Line::from(Span::styled(
                    "press r to retry",
                    Style::default().fg(theme.dim_fg),
                )),
            ])
            .alignment(Alignment::Center)
            .block(block);
            frame.render_widget(widget, area);
        }
    }
}

fn render_preview(app: &mut App, frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .title(" Preview ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(app.options.theme.border_fg));

    // Scale the image to the space it will actually get.
    if let PreviewStatus::Ready(image) = &mut app.session.preview {
        let body = preview::image_area(block.inner(area));
        image.fit(body.width, body.height);
    }

    let widget = PreviewWidget::new(&app.session, &app.options.theme).block(block);
    frame.render_widget(widget, area);
}

fn render_status_bar(app: &App, frame: &mut Frame, area: Rect) {
    let path = app
        .tree_state
        .selected_item()
        .map(|item| item.full_path.as_str())
        .unwrap_or("");
    let key_ready = !app.session.hidden_key().is_empty();

    let mut widget = StatusBarWidget::new(path, key_ready, &app.options.theme);
    if let Some((msg, _)) = &app.status_message {
        widget = widget.status_message(msg, false);
    } else if let LoadState::Failed(msg) = &app.load_state {
        widget = widget.status_message(msg, true);
    }
    frame.render_widget(widget, area);
}
