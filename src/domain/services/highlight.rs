use crate::domain::model::FillColor;
use crate::domain::ports::SheetSource;
use std::collections::BTreeSet;

/// Column holding the inclusion marker.
pub const MARKER_COLUMN: u32 = 1;

pub fn is_highlight(color: FillColor) -> bool {
    !color.is_transparent() && !color.is_white() && !color.is_black()
}

/// Rows (1-based, header excluded) whose marker cell carries a highlight fill.
pub fn highlighted_rows<S: SheetSource + ?Sized>(sheet: &S) -> BTreeSet<u32> {
    let mut rows = BTreeSet::new();

    for row in 2..=sheet.last_row() {
        match sheet.fill_color(row, MARKER_COLUMN) {
            Some(color) if is_highlight(color) => {
                rows.insert(row);
            }
            Some(color) => {
                tracing::trace!("Row {} fill {:08X} is not a highlight", row, color.0);
            }
            None => {}
        }
    }

    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::services::testing::MemorySheet;

    #[test]
    fn test_is_highlight() {
        assert!(is_highlight(FillColor::from_rgb(0xFF, 0xFF, 0x00)));
        assert!(is_highlight(FillColor::from_hex("00FFFF00").unwrap()));
        assert!(!is_highlight(FillColor::TRANSPARENT));
        assert!(!is_highlight(FillColor::from_rgb(0xFF, 0xFF, 0xFF)));
        assert!(!is_highlight(FillColor::from_rgb(0, 0, 0)));
    }

    #[test]
    fn test_selects_only_highlighted_rows() {
        let mut sheet = MemorySheet::new("Sales");
        sheet.set_text(1, 1, "Id");
        sheet.set_text(2, 1, "A");
        sheet.set_text(3, 1, "B");
        sheet.set_text(4, 1, "C");
        sheet.set_text(5, 1, "D");
        sheet.set_fill(2, 1, FillColor::from_rgb(0xFF, 0xFF, 0x00));
        sheet.set_fill(3, 1, FillColor::from_rgb(0xFF, 0xFF, 0xFF));
        sheet.set_fill(4, 1, FillColor::from_rgb(0x92, 0xD0, 0x50));
        sheet.set_fill(5, 1, FillColor::from_rgb(0, 0, 0));

        let rows: Vec<u32> = highlighted_rows(&sheet).into_iter().collect();
        assert_eq!(rows, vec![2, 4]);
    }

    #[test]
    fn test_header_fill_is_ignored() {
        let mut sheet = MemorySheet::new("Sales");
        sheet.set_text(1, 1, "Id");
        sheet.set_fill(1, 1, FillColor::from_rgb(0xFF, 0, 0));

        assert!(highlighted_rows(&sheet).is_empty());
    }

    #[test]
    fn test_empty_sheet_yields_empty_set() {
        let sheet = MemorySheet::new("Sales");
        assert!(highlighted_rows(&sheet).is_empty());
    }
}
