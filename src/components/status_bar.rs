use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Widget,
};

use crate::theme::ThemeColors;

const KEY_HINTS: &str = " ↵:open  x:close  r:reload  q:quit ";

/// Status bar widget that displays the selected path, hidden-key state, key
/// hints, or a transient status message.
pub struct StatusBarWidget<'a> {
    path_str: &'a str,
    key_ready: bool,
    theme: &'a ThemeColors,
    status_message: Option<&'a str>,
    is_error: bool,
}

impl<'a> StatusBarWidget<'a> {
    pub fn new(path_str: &'a str, key_ready: bool, theme: &'a ThemeColors) -> Self {
        Self {
            path_str,
            key_ready,
            theme,
            status_message: None,
            is_error: false,
        }
    }

    pub fn status_message(mut self, msg: &'a str, is_error: bool) -> Self {
        self.status_message = Some(msg);
        self.is_error = is_error;
        self
    }
}

/// Keep the last `budget` characters, marking the cut with "...".
fn truncate_left(s: &str, budget: usize) -> String {
    let len = s.chars().count();
    if len <= budget {
        return s.to_string();
    }
    if budget <= 3 {
        return s.chars().take(budget).collect();
    }
    let tail: String = s.chars().skip(len - (budget - 3)).collect();
    format!("...{}", tail)
}

impl<'a> Widget for StatusBarWidget<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 || area.width == 0 {
            return;
        }

        let width = area.width as usize;

        if let Some(msg) = self.status_message {
            let style = if self.is_error {
                Style::default()
                    .bg(self.theme.error_fg)
                    .fg(self.theme.status_fg)
            } else {
                Style::default().fg(self.theme.success_fg)
            };

            let display: String = msg.chars().take(width).collect();
            let line = Line::from(Span::styled(format!("{:<width$}", display), style));
            buf.set_line(area.x, area.y, &line, area.width);
            return;
        }

        // Normal bar: [path] [key state] [key hints]
        let (key_info, key_style) = if self.key_ready {
            ("● key", Style::default().fg(self.theme.success_fg))
        } else {
            ("○ key", Style::default().fg(self.theme.warning_fg))
        };
        let hints_len = KEY_HINTS.chars().count();
        let info_len = key_info.chars().count();

        let remaining = width.saturating_sub(hints_len);
        let path_budget = remaining.saturating_sub(info_len + 1);
        let path_display = truncate_left(self.path_str, path_budget);

        let gap = remaining
            .saturating_sub(path_display.chars().count())
            .saturating_sub(info_len);

        let spans = vec![
            Span::styled(path_display, Style::default().fg(self.theme.status_fg)),
            Span::raw(" ".repeat(gap)),
            Span::styled(key_info, key_style.add_modifier(Modifier::BOLD)),
            Span::styled(
                KEY_HINTS,
                Style::default()
                    .fg(self.theme.dim_fg)
                    .add_modifier(Modifier::DIM),
            ),
        ];

        let line = Line::from(spans);
        let bar_style = Style::default().bg(self.theme.status_bg);
        buf.set_style(area, bar_style);
        buf.set_line(area.x, area.y, &line, area.width);
    }
}
