//! Box-drawn tables sized to their content.

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::color;

/// Styles a cell after it has been padded, so escape codes never count
/// towards the column width.
pub type CellStyle = fn(&str) -> String;

pub struct Table {
    headers: Vec<&'static str>,
    max_widths: Vec<usize>,
    styles: Vec<Option<CellStyle>>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: &[&'static str]) -> Self {
        Self {
            headers: headers.to_vec(),
            max_widths: vec![40; headers.len()],
            styles: vec![None; headers.len()],
            rows: Vec::new(),
        }
    }

    /// Cap a column's width; longer cells are truncated with `...`.
    pub fn max_width(mut self, column: usize, width: usize) -> Self {
        if let Some(slot) = self.max_widths.get_mut(column) {
            *slot = width.max(4);
        }
        self
    }

    pub fn style(mut self, column: usize, style: CellStyle) -> Self {
        if let Some(slot) = self.styles.get_mut(column) {
            *slot = Some(style);
        }
        self
    }

    pub fn add_row(&mut self, cells: Vec<String>) {
        self.rows.push(cells);
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn widths(&self) -> Vec<usize> {
        self.headers
            .iter()
            .enumerate()
            .map(|(i, header)| {
                let content = self
                    .rows
                    .iter()
                    .filter_map(|row| row.get(i))
                    .map(|cell| cell.width())
                    .max()
                    .unwrap_or(0);
                content.max(header.width()).min(self.max_widths[i])
            })
            .collect()
    }

    pub fn render(&self) -> String {
        self.layout(true)
    }

    fn layout(&self, styled: bool) -> String {
        let widths = self.widths();
        let frame = |text: String| if styled { color::muted(&text) } else { text };
        let border = |left: &str, mid: &str, right: &str| {
            let segments: Vec<String> = widths.iter().map(|w| "─".repeat(w + 2)).collect();
            frame(format!("{}{}{}", left, segments.join(mid), right))
        };
        let bar = frame("│".to_string());
        let separator = format!(" {} ", bar);

        let mut out = Vec::with_capacity(self.rows.len() + 4);
        out.push(border("┌", "┬", "┐"));
        let header: Vec<String> = self
            .headers
            .iter()
            .zip(&widths)
            .map(|(h, w)| {
                let cell = pad(h, *w);
                if styled { color::bold(&cell) } else { cell }
            })
            .collect();
        out.push(format!("{} {} {}", bar, header.join(&separator), bar));
        out.push(border("├", "┼", "┤"));
        for row in &self.rows {
            let cells: Vec<String> = widths
                .iter()
                .enumerate()
                .map(|(i, w)| {
                    let text = truncate_str(row.get(i).map(String::as_str).unwrap_or(""), *w);
                    let padding = " ".repeat(w.saturating_sub(text.width()));
                    match self.styles[i] {
                        Some(style) if styled => format!("{}{}", style(&text), padding),
                        _ => format!("{}{}", text, padding),
                    }
                })
                .collect();
            out.push(format!("{} {} {}", bar, cells.join(&separator), bar));
        }
        out.push(border("└", "┴", "┘"));
        out.join("\n")
    }

    pub fn print(&self) {
        println!("{}", self.render());
    }
}

fn pad(text: &str, width: usize) -> String {
    let text = truncate_str(text, width);
    let padding = " ".repeat(width.saturating_sub(text.width()));
    format!("{}{}", text, padding)
}

/// Truncate to `max_width` display columns, ending in `...` when cut.
pub fn truncate_str(s: &str, max_width: usize) -> String {
    if s.width() <= max_width {
        return s.to_string();
    }
    let budget = max_width.saturating_sub(3);
    let mut used = 0;
    let mut truncated = String::new();
    for ch in s.chars() {
        let w = ch.width().unwrap_or(0);
        if used + w > budget {
            break;
        }
        used += w;
        truncated.push(ch);
    }
    format!("{}...", truncated)
}
