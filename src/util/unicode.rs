//! Terminal-cell measurements for the column layouts in CLI output.

use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

const ELLIPSIS: char = '\u{2026}';

/// Display width in terminal cells
pub fn display_width(s: &str) -> usize {
    UnicodeWidthStr::width(s)
}

/// Truncate to at most `max_cells` cells, ending in `…` when anything was cut.
/// Never splits a grapheme cluster.
pub fn truncate_to_width(s: &str, max_cells: usize) -> String {
    if display_width(s) <= max_cells {
        return s.to_string();
    }
    if max_cells == 0 {
        return String::new();
    }
    let budget = max_cells - 1;
    let mut width = 0;
    let mut result = String::new();
    for grapheme in s.graphemes(true) {
        let gw = UnicodeWidthStr::width(grapheme);
        if width + gw > budget {
            break;
        }
        width += gw;
        result.push_str(grapheme);
    }
    result.push(ELLIPSIS);
    result
}

/// Truncate or right-pad with spaces to exactly `cells` cells.
/// A wide character that does not fit is replaced by padding.
pub fn fit_to_width(s: &str, cells: usize) -> String {
    let mut fitted = truncate_to_width(s, cells);
    let width = display_width(&fitted);
    fitted.extend(std::iter::repeat_n(' ', cells.saturating_sub(width)));
    fitted
}
