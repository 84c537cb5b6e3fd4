pub mod etl;
pub mod pipeline;

pub use crate::domain::model::{OrderData, RunSummary};
pub use crate::domain::ports::{ConfigProvider, Extraction, Pipeline, Storage};
pub use crate::utils::error::Result;
