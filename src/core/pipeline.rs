use crate::adapters::xml::{file_name_for, render_order};
use crate::core::{ConfigProvider, Extraction, Pipeline, Storage};
use crate::domain::model::OrderData;
use crate::domain::ports::{SheetSource, WorkbookSource};
use crate::domain::services::{extract_row, highlighted_rows, OrderBook};
use crate::utils::error::Result;
use std::collections::HashSet;
use std::marker::PhantomData;

/// Highlighted rows of one sheet → grouped orders → one XML file per order.
pub struct ShipOrderPipeline<W: WorkbookSource, S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
    _workbook: PhantomData<fn() -> W>,
}

impl<W: WorkbookSource, S: Storage, C: ConfigProvider> ShipOrderPipeline<W, S, C> {
    pub fn new(storage: S, config: C) -> Self {
        Self {
            storage,
            config,
            _workbook: PhantomData,
        }
    }
}

impl<W: WorkbookSource, S: Storage, C: ConfigProvider> Pipeline for ShipOrderPipeline<W, S, C> {
    type Workbook = W;
    type Sheet = W::Sheet;

    fn open_workbook(&self) -> Result<W> {
        let path = self.config.excel_file();
        tracing::info!("📖 Reading workbook {}", path.display());
        W::open(&path)
    }

    fn resolve_sheet(&self, workbook: &mut W) -> Result<W::Sheet> {
        let sheet = workbook.sheet(self.config.sheet_name())?;
        tracing::debug!("Using worksheet '{}' (last row {})", sheet.name(), sheet.last_row());
        Ok(sheet)
    }

    fn extract(&self, sheet: &W::Sheet) -> Result<Extraction> {
        let highlighted = highlighted_rows(sheet);
        let listed: Vec<String> = highlighted.iter().map(|r| r.to_string()).collect();
        tracing::info!(
            "🔍 Found {} highlighted rows: {}",
            highlighted.len(),
            listed.join(", ")
        );

        let mut extraction = Extraction {
            rows_scanned: sheet.last_row().saturating_sub(1) as usize,
            highlighted: highlighted.iter().copied().collect(),
            ..Extraction::default()
        };

        for row in highlighted {
            match extract_row(sheet, row) {
                Ok(sales_row) => extraction.rows.push(sales_row),
                Err(e) => {
                    // 單列錯誤只記錄，不中斷整個流程
                    tracing::warn!("⚠️ Skipping row {}: {}", row, e);
                    extraction.skipped.push((row, e));
                }
            }
        }

        Ok(extraction)
    }

    fn transform(&self, extraction: Extraction) -> Result<Vec<OrderData>> {
        let mut book = OrderBook::new();
        for row in &extraction.rows {
            let identity = book.add_row(row);
            tracing::debug!("Row {} -> {}", row.row_number, identity);
        }

        tracing::info!(
            "📦 Grouped {} rows into {} orders",
            extraction.rows.len(),
            book.len()
        );
        Ok(book.finish())
    }

    fn load(&self, orders: &[OrderData]) -> Result<Vec<String>> {
        tracing::debug!("Writing {} orders to {}", orders.len(), self.config.output_path());
        self.storage.prepare()?;

        let mut written = Vec::with_capacity(orders.len());
        let mut taken = HashSet::new();
        for order in orders {
            let xml = render_order(order)?;
            let file_name = unique_file_name(&mut taken, &order.unique_identity);
            let path = self.storage.write_file(&file_name, &xml)?;
            written.push(path);
        }

        tracing::info!("💾 Wrote {} XML files", written.len());
        Ok(written)
    }
}

/// 不同的訂單識別碼淨化後可能撞名，撞名時加上 `-2`、`-3`…
/// Names are compared case-insensitively so they stay distinct on Windows and macOS too.
fn unique_file_name(taken: &mut HashSet<String>, identity: &str) -> String {
    let base = file_name_for(identity);
    if taken.insert(base.to_lowercase()) {
        return base;
    }

    let stem = base.trim_end_matches(".xml");
    let mut n = 2u32;
    loop {
        let candidate = format!("{}-{}.xml", stem, n);
        if taken.insert(candidate.to_lowercase()) {
            tracing::warn!(
                "⚠️ Order '{}' maps to an existing file name, writing {} instead",
                identity,
                candidate
            );
            return candidate;
        }
        n += 1;
    }
}
