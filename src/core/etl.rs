use crate::adapters::xml::file_name_for;
use crate::core::Pipeline;
use crate::domain::model::RunSummary;
use crate::utils::error::Result;

/// Where a run currently is. `Failed` can be reached from any state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Start,
    WorkbookOpened,
    SheetResolved,
    RowsScanned,
    OrdersAggregated,
    Done,
    Failed,
}

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
    dry_run: bool,
    state: PipelineState,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self {
            pipeline,
            dry_run: false,
            state: PipelineState::Start,
        }
    }

    /// Stops after grouping and only reports the files a run would write.
    pub fn new_dry_run(pipeline: P) -> Self {
        Self {
            dry_run: true,
            ..Self::new(pipeline)
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn run(&mut self) -> Result<RunSummary> {
        tracing::info!("🚀 Starting ship order ETL{}", if self.dry_run { " (dry run)" } else { "" });
        self.state = PipelineState::Start;

        match self.execute() {
            Ok(summary) => {
                self.transition(PipelineState::Done);
                tracing::info!(
                    "✅ {} rows scanned, {} highlighted, {} skipped, {} orders, {} files written",
                    summary.rows_scanned,
                    summary.highlighted_rows,
                    summary.rows_skipped,
                    summary.orders,
                    summary.written.len()
                );
                Ok(summary)
            }
            Err(e) => {
                tracing::error!("❌ Run failed in state {:?}: {}", self.state, e);
                self.transition(PipelineState::Failed);
                Err(e)
            }
        }
    }

    fn execute(&mut self) -> Result<RunSummary> {
        let mut summary = RunSummary::default();

        // Extract
        let mut workbook = self.pipeline.open_workbook()?;
        self.transition(PipelineState::WorkbookOpened);

        let sheet = self.pipeline.resolve_sheet(&mut workbook)?;
        self.transition(PipelineState::SheetResolved);

        let extraction = self.pipeline.extract(&sheet)?;
        summary.rows_scanned = extraction.rows_scanned;
        summary.highlighted_rows = extraction.highlighted.len();
        summary.rows_skipped = extraction.skipped.len();
        self.transition(PipelineState::RowsScanned);

        // Transform
        let orders = self.pipeline.transform(extraction)?;
        summary.orders = orders.len();
        self.transition(PipelineState::OrdersAggregated);

        // Load
        if self.dry_run {
            for order in &orders {
                tracing::info!(
                    "📝 Would write {} ({} items)",
                    file_name_for(&order.unique_identity),
                    order.items.len()
                );
                tracing::debug!("{}", serde_json::to_string(order)?);
            }
        } else {
            summary.written = self.pipeline.load(&orders)?;
        }

        Ok(summary)
    }

    fn transition(&mut self, next: PipelineState) {
        tracing::debug!("State {:?} -> {:?}", self.state, next);
        self.state = next;
    }
}
