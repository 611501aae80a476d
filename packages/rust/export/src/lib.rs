//! Flat-table output: record flattening and CSV writing.

pub mod table;
pub mod writer;

pub use stockscraper_shared::ArrivalLayout;
pub use table::{BASE_COLUMNS, EXTRACTED_AT_COLUMN, StockTable, flatten, max_arrivals};
pub use writer::{CsvOptions, UTF8_BOM, write_csv, write_csv_file, write_csv_stdout};
