use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Widget},
};

use crate::explorer::tree::{FlatItem, TreeState};
use crate::theme::ThemeColors;

/// Tree widget that renders the remote file tree with box-drawing characters.
pub struct TreeWidget<'a> {
    tree_state: &'a TreeState,
    theme: &'a ThemeColors,
    use_icons: bool,
    /// Path of the file currently shown in the preview pane.
    previewed: Option<&'a str>,
    block: Option<Block<'a>>,
}

impl<'a> TreeWidget<'a> {
    pub fn new(tree_state: &'a TreeState, theme: &'a ThemeColors, use_icons: bool) -> Self {
        Self {
            tree_state,
            theme,
            use_icons,
            previewed: None,
            block: None,
        }
    }

    pub fn previewed(mut self, path: Option<&'a str>) -> Self {
        self.previewed = path;
        self
    }

    pub fn block(mut self, block: Block<'a>) -> Self {
        self.block = block.into();
        self
    }

    /// Build the indentation prefix; each ancestor level draws a continuation
    /// line unless that ancestor was the last of its siblings.
    fn build_prefix(item: &FlatItem, items: &[FlatItem], item_index: usize) -> String {
        let mut prefix = String::new();

        for d in 0..item.depth {
            let mut ancestor_is_last = false;
            for j in (0..item_index).rev() {
                if items[j].depth == d {
                    ancestor_is_last = items[j].is_last_sibling;
                    break;
                }
            }
            prefix.push_str(if ancestor_is_last { "   " } else { "│  " });
        }

        prefix.push_str(if item.is_last_sibling { "└──" } else { "├──" });
        prefix
    }

    fn item_indicator(&self, item: &FlatItem) -> &'static str {
        match (self.use_icons, item.is_folder) {
            (true, true) if item.is_expanded => " ",
            (true, true) => " ",
            (true, false) => Self::file_icon_by_ext(&item.name),
            (false, true) if item.is_expanded => "[-] ",
            (false, true) => "[+] ",
            (false, false) => "[F] ",
        }
    }

    /// Get a Nerd Font icon for a file based on its extension.
    fn file_icon_by_ext(name: &str) -> &'static str {
        let ext = name.rsplit('.').next().unwrap_or("").to_lowercase();
        match ext.as_str() {
            "png" | "jpg" | "jpeg" | "gif" | "bmp" | "svg" | "ico" | "webp" => " ",
            "mp4" | "mkv" | "avi" | "mov" | "webm" => " ",
            "mp3" | "wav" | "flac" | "ogg" => " ",
            "pdf" => " ",
            "json" => " ",
            "md" | "txt" => " ",
            "zip" | "tar" | "gz" | "7z" => " ",
            _ => " ",
        }
    }
}

impl<'a> Widget for TreeWidget<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let inner_area = if let Some(block) = &self.block {
            let inner = block.inner(area);
            block.clone().render(area, buf);
            inner
        } else {
            area
        };

        let items = &self.tree_state.flat_items;
        let visible_height = inner_area.height as usize;
        if items.is_empty() || visible_height == 0 {
            return;
        }

        let selected = self.tree_state.selected_index;
        let visible_items = items
            .iter()
            .enumerate()
            .skip(self.tree_state.scroll_offset)
            .take(visible_height);

        for (row, (idx, item)) in visible_items.enumerate() {
            let y = inner_area.y + row as u16;

            let is_previewed = !item.is_folder && self.previewed == Some(item.full_path.as_str());
            let style = if idx == selected {
                Style::default()
                    .bg(self.theme.tree_selected_bg)
                    .fg(self.theme.tree_selected_fg)
                    .add_modifier(Modifier::BOLD)
            } else if is_previewed {
                Style::default()
                    .fg(self.theme.accent_fg)
                    .add_modifier(Modifier::BOLD)
            } else if item.is_folder {
                Style::default()
                    .fg(self.theme.tree_dir_fg)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(self.theme.tree_file_fg)
            };

            let line = Line::from(Span::styled(
                format!(
                    "{}{}{}",
                    Self::build_prefix(item, items, idx),
                    self.item_indicator(item),
                    item.name
                ),
                style,
            ));
            buf.set_line(inner_area.x, y, &line, inner_area.width);
        }
    }
}
