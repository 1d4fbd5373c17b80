use image::{DynamicImage, RgbImage};
use ratatui::{
    style::{Modifier, Style},
    text::{Line, Span},
};

use crate::error::Result;
use crate::remote::FileRecord;
use crate::theme::ThemeColors;

/// A decoded preview image plus a copy scaled for the last pane size.
#[derive(Debug, Clone)]
pub struct PreviewImage {
    source: DynamicImage,
    fitted: Option<((u16, u16), RgbImage)>,
}

impl PreviewImage {
    /// Decode PNG, JPEG, or GIF bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let source = image::load_from_memory(bytes)?;
        Ok(Self {
            source,
            fitted: None,
        })
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.source.width(), self.source.height())
    }

    /// Scale to fit `cols × rows` cells, two pixel rows per cell.
    ///
    /// The result is cached until the pane size changes.
    pub fn fit(&mut self, cols: u16, rows: u16) {
        if cols == 0 || rows == 0 {
            self.fitted = None;
            return;
        }
        if matches!(&self.fitted, Some((size, _)) if *size == (cols, rows)) {
            return;
        }
        let scaled = self
            .source
            .thumbnail(u32::from(cols), u32::from(rows) * 2)
            .to_rgb8();
        self.fitted = Some(((cols, rows), scaled));
    }

    pub fn fitted(&self) -> Option<&RgbImage> {
        self.fitted.as_ref().map(|(_, img)| img)
    }
}

/// Format bytes into human-readable size string.
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * KB;
    const GB: u64 = 1024 * MB;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Render a backend timestamp for display, keeping unparseable values as sent.
fn format_created(raw: &str) -> String {
    if raw.is_empty() {
        return "Unknown".to_string();
    }
    match chrono::DateTime::parse_from_rfc3339(raw) {
        Ok(ts) => ts
            .with_timezone(&chrono::Utc)
            .format("%Y-%m-%d %H:%M UTC")
            .to_string(),
        Err(_) => raw.to_string(),
    }
}

/// Metadata header shown above the image.
pub fn metadata_lines(record: &FileRecord, theme: &ThemeColors) -> Vec<Line<'static>> {
    let label_style = Style::default()
        .fg(theme.accent_fg)
        .add_modifier(Modifier::BOLD);
    let value_style = Style::default().fg(theme.preview_fg);

    let field = |label: &str, value: String| {
        Line::from(vec![
            Span::styled(format!(" {:<9}", label), label_style),
            Span::styled(value, value_style),
        ])
    };

    vec![
        field("Path:", record.path.clone()),
        field("Size:", format_size(record.metadata.size)),
        field("Created:", format_created(&record.metadata.created_at)),
        field("Checksum:", record.metadata.checksum.clone()),
    ]
}
