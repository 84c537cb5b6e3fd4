// Adapters layer: concrete implementations of the domain ports
// (workbook reading, XML rendering, file output).

pub mod storage;
pub mod xlsx;
pub mod xml;

pub use storage::LocalStorage;
pub use xlsx::{XlsxSheet, XlsxWorkbook};
pub use xml::{file_name_for, render_order};
