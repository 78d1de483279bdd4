//! Grid recovery from loosely column-aligned plain text.
//!
//! PDF extraction yields tables with no delimiters, only whitespace padding,
//! and the padding width jitters from row to row. The parser infers a global
//! column grid from whitespace-run modes and then adjusts it per row so no
//! boundary ever splits inside a word.

use std::collections::HashMap;

/// A tool for sifting through plain-text tables.
pub struct TableParser {
    lines: Vec<Vec<char>>,
    boundaries: Vec<usize>,
}

impl TableParser {
    /// Parse `text` into a grid of at most `max_cols` columns.
    pub fn new(text: &str, max_cols: usize) -> Self {
        let lines: Vec<Vec<char>> = text
            .lines()
            .filter(|l| l.chars().any(|c| !c.is_whitespace()))
            .map(|l| l.chars().collect())
            .collect();
        let boundaries = Self::column_modes(&lines, max_cols);
        Self { lines, boundaries }
    }

    /// End offsets of every run of two or more whitespace characters —
    /// the leading edges of hypothetical columns within a line.
    fn boundaries_of(line: &[char]) -> Vec<usize> {
        let mut out = Vec::new();
        let mut run = 0usize;
        for (i, c) in line.iter().enumerate() {
            if c.is_whitespace() {
                run += 1;
            } else {
                if run >= 2 {
                    out.push(i);
                }
                run = 0;
            }
        }
        out
    }

    /// The `max_cols - 1` most frequent boundary offsets across all lines,
    /// sorted ascending. Ties break toward the smaller offset so the grid
    /// is stable for any input.
    fn column_modes(lines: &[Vec<char>], max_cols: usize) -> Vec<usize> {
        let mut freq: HashMap<usize, usize> = HashMap::new();
        for line in lines {
            for b in Self::boundaries_of(line) {
                *freq.entry(b).or_default() += 1;
            }
        }
        let mut candidates: Vec<(usize, usize)> = freq.into_iter().collect();
        candidates.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        let mut modes: Vec<usize> = candidates
            .into_iter()
            .take(max_cols.saturating_sub(1))
            .map(|(offset, _)| offset)
            .collect();
        modes.sort_unstable();
        modes
    }

    /// Shift a boundary left if it falls inside this line's non-whitespace
    /// run, back to the nearest preceding whitespace, so the whole word
    /// lands in the right-hand cell.
    fn adjust(line: &[char], boundary: usize) -> usize {
        let mut b = boundary.min(line.len());
        if b == 0 || b == line.len() || line[b].is_whitespace() {
            return b;
        }
        while b > 0 && !line[b - 1].is_whitespace() {
            b -= 1;
        }
        b
    }

    /// Slice one line at the adjusted boundaries, trimming each cell.
    fn cells_of(&self, line: &[char]) -> Vec<String> {
        let mut cells = Vec::with_capacity(self.boundaries.len() + 1);
        let mut start = 0usize;
        for &boundary in &self.boundaries {
            let end = Self::adjust(line, boundary).max(start);
            cells.push(line[start.min(line.len())..end.min(line.len())].iter().collect());
            start = end;
        }
        cells.push(line[start.min(line.len())..].iter().collect());
        cells
            .into_iter()
            .map(|c: String| c.trim().to_string())
            .collect()
    }

    /// Produce a cols-within-a-row matrix, sans any blank rows.
    /// A position blank in a given row yields an empty cell.
    pub fn rows(&self) -> Vec<Vec<String>> {
        self.lines
            .iter()
            .map(|l| self.cells_of(l))
            .filter(|cells| cells.iter().any(|c| !c.is_empty()))
            .collect()
    }

    /// All cell values linearly, sans any empty cells.
    pub fn values(&self) -> Vec<String> {
        self.rows()
            .into_iter()
            .flatten()
            .filter(|v| !v.is_empty())
            .collect()
    }
}
