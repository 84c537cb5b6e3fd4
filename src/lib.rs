pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::cli::CliArgs;
pub use config::AppConfig;

pub use adapters::{LocalStorage, XlsxWorkbook};
pub use crate::core::{etl::EtlEngine, etl::PipelineState, pipeline::ShipOrderPipeline};
pub use domain::model::{OrderData, RunSummary};
pub use utils::error::{EtlError, Result};

/// The production pipeline: `.xlsx` in, XML files on local disk out.
pub type XlsxPipeline = ShipOrderPipeline<XlsxWorkbook, LocalStorage, AppConfig>;

/// Builds the production pipeline from a validated configuration.
pub fn build_pipeline(config: AppConfig) -> XlsxPipeline {
    let storage = LocalStorage::new(config.xml_output_path.clone());
    ShipOrderPipeline::new(storage, config)
}
