use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Widget},
};

use crate::preview_content::{metadata_lines, PreviewImage};
use crate::session::{PreviewStatus, Session};
use crate::theme::ThemeColors;

/// Rows reserved above the image for file metadata.
const HEADER_ROWS: u16 = 5;

/// Part of the preview pane's inner area that holds the image.
pub fn image_area(inner: Rect) -> Rect {
    let offset = HEADER_ROWS.min(inner.height);
    Rect::new(inner.x, inner.y + offset, inner.width, inner.height - offset)
}

/// Preview widget showing the selected file's metadata and image.
pub struct PreviewWidget<'a> {
    session: &'a Session,
    theme: &'a ThemeColors,
    block: Option<Block<'a>>,
}

impl<'a> PreviewWidget<'a> {
    pub fn new(session: &'a Session, theme: &'a ThemeColors) -> Self {
        Self {
            session,
            theme,
            block: None,
        }
    }

    pub fn block(mut self, block: Block<'a>) -> Self {
        self.block = block.into();
        self
    }

    fn message(&self, area: Rect, buf: &mut Buffer, text: &str, color: Color) {
        if area.height == 0 {
            return;
        }
        let line = Line::from(Span::styled(format!(" {}", text), Style::default().fg(color)));
        buf.set_line(area.x, area.y, &line, area.width);
    }

    /// Draw the image with upper-half blocks: foreground is the top pixel,
    /// background the bottom one.
    fn draw_image(image: &PreviewImage, area: Rect, buf: &mut Buffer) {
        let Some(img) = image.fitted() else {
            return;
        };
        let cols = (img.width() as u16).min(area.width);
        let rows = (img.height().div_ceil(2) as u16).min(area.height);
        let x0 = area.x + (area.width - cols) / 2;

        for row in 0..rows {
            for col in 0..cols {
                let top = img.get_pixel(u32::from(col), u32::from(row) * 2);
                let bottom_y = u32::from(row) * 2 + 1;
                let bottom = if bottom_y < img.height() {
                    *img.get_pixel(u32::from(col), bottom_y)
                } else {
                    *top
                };
                if let Some(cell) = buf.cell_mut((x0 + col, area.y + row)) {
                    cell.set_symbol("▀")
                        .set_fg(Color::Rgb(top[0], top[1], top[2]))
                        .set_bg(Color::Rgb(bottom[0], bottom[1], bottom[2]));
                }
            }
        }
    }
}

impl<'a> Widget for PreviewWidget<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let inner = if let Some(block) = &self.block {
            let inner = block.inner(area);
            block.clone().render(area, buf);
            inner
        } else {
            area
        };

        if inner.width == 0 || inner.height == 0 {
            return;
        }

        let Some(file) = self.session.selection() else {
            self.message(inner, buf, "Select a file and press Enter", self.theme.dim_fg);
            return;
        };

        for (i, line) in metadata_lines(file, self.theme).iter().enumerate() {
            let y = inner.y + i as u16;
            if y >= inner.y + inner.height {
                break;
            }
            buf.set_line(inner.x, y, line, inner.width);
        }

        let body = image_area(inner);
        match &self.session.preview {
            PreviewStatus::Idle => {}
            PreviewStatus::Loading => {
                self.message(body, buf, "Loading preview…", self.theme.info_fg)
            }
            PreviewStatus::Failed(msg) => {
                self.message(body, buf, &format!("✗ {}", msg), self.theme.error_fg)
            }
            PreviewStatus::Ready(image) => Self::draw_image(image, body, buf),
        }
    }
}
