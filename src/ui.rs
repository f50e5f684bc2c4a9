// src/ui.rs
//
// Plain-text rendering for command output: aligned tables and the string
// helpers used to keep them narrow.

use unicode_width::UnicodeWidthStr;

/* ============================================================
   Tables
   ============================================================ */

#[derive(Debug, Clone, Default)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new<S: Into<String>>(headers: impl IntoIterator<Item = S>) -> Self {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn row<S: Into<String>>(&mut self, cells: impl IntoIterator<Item = S>) -> &mut Self {
        self.rows.push(cells.into_iter().map(Into::into).collect());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// `+---+` bordered table, columns padded by display width.
    pub fn render(&self) -> String {
        let columns = self
            .rows
            .iter()
            .map(Vec::len)
            .chain(std::iter::once(self.headers.len()))
            .max()
            .unwrap_or(0);

        let mut widths = vec![0usize; columns];
        for line in std::iter::once(&self.headers).chain(self.rows.iter()) {
            for (i, cell) in line.iter().enumerate() {
                widths[i] = widths[i].max(UnicodeWidthStr::width(cell.as_str()));
            }
        }

        let border: String = widths
            .iter()
            .map(|w| format!("+{}", "-".repeat(w + 2)))
            .collect::<String>()
            + "+";

        let mut out = String::new();
        out.push_str(&border);
        out.push('\n');
        out.push_str(&render_line(&self.headers, &widths));
        out.push_str(&border);
        out.push('\n');
        for row in &self.rows {
            out.push_str(&render_line(row, &widths));
        }
        out.push_str(&border);
        out
    }
}

fn render_line(cells: &[String], widths: &[usize]) -> String {
    let mut out = String::new();
    for (i, w) in widths.iter().enumerate() {
        let cell = cells.get(i).map(String::as_str).unwrap_or("");
        let pad = w - UnicodeWidthStr::width(cell).min(*w);
        out.push_str(&format!("| {}{} ", cell, " ".repeat(pad)));
    }
    out.push_str("|\n");
    out
}

/* ============================================================
   String helpers
   ============================================================ */

/// Keep the tail: `...` followed by the last `max - 3` characters.
pub fn truncate_left(s: &str, max: usize) -> String {
    let count = s.chars().count();
    if count <= max {
        return s.to_string();
    }

    let keep = max.saturating_sub(3);
    let tail: String = s.chars().skip(count - keep).collect();
    format!("...{tail}")
}

/// Keep the head: the first `max - 3` characters followed by `...`.
pub fn truncate_right(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }

    let head: String = s.chars().take(max.saturating_sub(3)).collect();
    format!("{head}...")
}

/// Fixed decimals with `,` thousands separators (`1,500.00`).
pub fn number_format(value: f64, decimals: usize) -> String {
    let formatted = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match formatted.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (formatted.as_str(), None),
    };

    let mut grouped = String::new();
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    let sign = if value < 0.0 && formatted.chars().any(|c| c != '0' && c != '.') {
        "-"
    } else {
        ""
    };

    match frac_part {
        Some(f) => format!("{sign}{grouped}.{f}"),
        None => format!("{sign}{grouped}"),
    }
}

/// `80`, `72.5`: drop a zero fraction.
pub fn trim_number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value}")
    }
}
