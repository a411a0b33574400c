//! Source excerpts for diagnostics.

use rhizome_sprig_ir::Position;

/// Display width of a tab before the error column.
pub const TAB_WIDTH: usize = 4;

/// Lines shown above and below the error line.
const CONTEXT_RADIUS: usize = 2;

/// One line of a source excerpt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextLine {
    /// 1-based line number.
    pub number: usize,
    /// Line text with tabs expanded to [`TAB_WIDTH`] spaces.
    pub text: String,
    pub is_error_line: bool,
    /// 0-based display column of the caret on the error line.
    pub caret: Option<usize>,
}

/// Extract the lines around `location` from `source`.
pub fn extract(source: &str, location: &Position) -> Vec<ContextLine> {
    let lines: Vec<&str> = source.lines().collect();
    if location.line == 0 || location.line > lines.len() {
        return Vec::new();
    }

    let error_idx = location.line - 1;
    let start = error_idx.saturating_sub(CONTEXT_RADIUS);
    let end = (error_idx + CONTEXT_RADIUS).min(lines.len() - 1);

    (start..=end)
        .map(|idx| {
            let raw = lines[idx];
            let is_error_line = idx == error_idx;
            ContextLine {
                number: idx + 1,
                text: raw.replace('\t', &" ".repeat(TAB_WIDTH)),
                is_error_line,
                caret: is_error_line.then(|| effective_column(raw, location.column)),
            }
        })
        .collect()
}

/// Display offset of a 1-based source column: a tab occupies one source
/// column but [`TAB_WIDTH`] display columns.
pub fn effective_column(line: &str, column: usize) -> usize {
    line.chars()
        .take(column.saturating_sub(1))
        .map(|c| if c == '\t' { TAB_WIDTH } else { 1 })
        .sum()
}

/// Render an excerpt with a line-number gutter and a caret.
pub fn render(lines: &[ContextLine]) -> String {
    let width = lines
        .iter()
        .map(|l| l.number.to_string().len())
        .max()
        .unwrap_or(1);

    let mut out = format!("{} |\n", " ".repeat(width));
    for line in lines {
        out.push_str(&format!("{:>width$} | {}\n", line.number, line.text, width = width));
        if let Some(caret) = line.caret {
            out.push_str(&format!(
                "{} | {}^\n",
                " ".repeat(width),
                " ".repeat(caret)
            ));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_column_counts_tabs() {
        assert_eq!(effective_column("\t(add 1)", 2), 4);
        assert_eq!(effective_column("\t\tx", 3), 8);
        assert_eq!(effective_column("abc", 3), 2);
        assert_eq!(effective_column("abc", 1), 0);
    }

    #[test]
    fn test_extract_window() {
        let source = "a\nb\nc\nd\ne\nf";
        let lines = extract(source, &Position::new(4, 1));
        let numbers: Vec<usize> = lines.iter().map(|l| l.number).collect();
        assert_eq!(numbers, vec![2, 3, 4, 5, 6]);
        assert!(lines[2].is_error_line);
        assert_eq!(lines[2].caret, Some(0));
        assert_eq!(lines[0].caret, None);
    }

    #[test]
    fn test_extract_out_of_range() {
        assert!(extract("one line", &Position::new(5, 1)).is_empty());
        assert!(extract("one line", &Position::new(0, 1)).is_empty());
    }

    #[test]
    fn test_render_aligns_caret_under_tab() {
        let lines = extract("\t(add 1)", &Position::new(1, 2));
        let out = render(&lines);
        assert_eq!(out, "  |\n1 |     (add 1)\n  |     ^\n");
    }
}
