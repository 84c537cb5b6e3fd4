use crate::domain::model::{FillColor, OrderData, ResolvedCell, SalesRow};
use crate::utils::error::{Result, RowError};
use std::path::{Path, PathBuf};

/// Read access to one worksheet. Rows and columns are 1-based.
pub trait SheetSource {
    fn name(&self) -> &str;

    /// Last row number holding a `<row>` entry, 0 for an empty sheet.
    fn last_row(&self) -> u32;

    /// Resolves a cell to a typed scalar, evaluating formulas. `None` when the
    /// cell does not exist.
    fn resolve(&self, row: u32, col: u32) -> Option<ResolvedCell>;

    /// Background fill of a cell, `None` when there is no fill or the color
    /// cannot be determined.
    fn fill_color(&self, row: u32, col: u32) -> Option<FillColor>;
}

/// A workbook format able to hand out named sheets.
pub trait WorkbookSource: Sized {
    type Sheet: SheetSource;

    fn open(path: &Path) -> Result<Self>;
    fn sheet(&mut self, name: &str) -> Result<Self::Sheet>;
}

pub trait Storage {
    /// Creates the storage root if it does not exist yet.
    fn prepare(&self) -> Result<()>;
    fn write_file(&self, path: &str, data: &[u8]) -> Result<String>;
}

pub trait ConfigProvider {
    fn excel_file(&self) -> PathBuf;
    fn sheet_name(&self) -> &str;
    fn output_path(&self) -> &str;
}

/// Rows pulled out of a sheet before grouping.
#[derive(Debug, Default)]
pub struct Extraction {
    pub rows_scanned: usize,
    pub highlighted: Vec<u32>,
    pub rows: Vec<SalesRow>,
    pub skipped: Vec<(u32, RowError)>,
}

pub trait Pipeline {
    type Workbook;
    type Sheet: SheetSource;

    fn open_workbook(&self) -> Result<Self::Workbook>;
    fn resolve_sheet(&self, workbook: &mut Self::Workbook) -> Result<Self::Sheet>;
    fn extract(&self, sheet: &Self::Sheet) -> Result<Extraction>;
    fn transform(&self, extraction: Extraction) -> Result<Vec<OrderData>>;
    fn load(&self, orders: &[OrderData]) -> Result<Vec<String>>;
}
