//! Plain-text table rendering for operational-mode output.
//!
//! Column-aligned output with a dashed header underline. Cells may contain
//! newlines (group member lists); a logical row then spans several physical
//! lines. Rows shorter than the header are padded with empty cells, which
//! the counter views rely on when a chain had no live data.

/// Column-aligned text table.
#[derive(Debug, Clone)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Renders the table. Empty tables render to an empty string.
    pub fn render(&self) -> String {
        if self.rows.is_empty() {
            return String::new();
        }

        let columns = self.headers.len();
        let mut widths: Vec<usize> = self.headers.iter().map(String::len).collect();
        for row in &self.rows {
            for (i, cell) in row.iter().enumerate().take(columns) {
                let cell_width = cell.lines().map(str::len).max().unwrap_or(0);
                if cell_width > widths[i] {
                    widths[i] = cell_width;
                }
            }
        }

        let mut out = String::new();
        render_line(&mut out, &self.headers, &widths);
        let dashes: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        render_line(&mut out, &dashes, &widths);

        for row in &self.rows {
            // A row expands to as many physical lines as its tallest cell.
            let height = row.iter().map(|c| c.lines().count().max(1)).max().unwrap_or(1);
            for line_no in 0..height {
                let cells: Vec<String> = (0..columns)
                    .map(|i| {
                        row.get(i)
                            .and_then(|cell| cell.lines().nth(line_no))
                            .unwrap_or("")
                            .to_string()
                    })
                    .collect();
                render_line(&mut out, &cells, &widths);
            }
        }
        out
    }
}

fn render_line(out: &mut String, cells: &[String], widths: &[usize]) {
    let mut line = String::new();
    for (i, cell) in cells.iter().enumerate() {
        if i > 0 {
            line.push_str("  ");
        }
        line.push_str(cell);
        if i + 1 < cells.len() {
            let pad = widths.get(i).copied().unwrap_or(0).saturating_sub(cell.len());
            line.push_str(&" ".repeat(pad));
        }
    }
    out.push_str(line.trim_end());
    out.push('\n');
}
