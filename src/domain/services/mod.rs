pub mod aggregator;
pub mod contact;
pub mod extractor;
pub mod highlight;

pub use aggregator::{order_identity, OrderBook};
pub use contact::parse_contact;
pub use extractor::extract_row;
pub use highlight::{highlighted_rows, is_highlight};
