//! CSV output for a [`StockTable`].
//!
//! Files are written as UTF-8 with a byte-order mark and CRLF line endings
//! so spreadsheet tools detect the encoding. Stdout gets plain LF output
//! without a BOM so it can be piped.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use csv::{Terminator, WriterBuilder};
use tracing::{debug, instrument};

use stockscraper_shared::{Result, ScraperError};

use crate::table::StockTable;

/// UTF-8 byte-order mark.
pub const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Encoding details of a CSV stream.
#[derive(Debug, Clone, Copy)]
pub struct CsvOptions {
    /// Prefix the output with [`UTF8_BOM`].
    pub bom: bool,
    pub terminator: Terminator,
}

impl CsvOptions {
    /// Settings for a CSV file on disk.
    pub fn file() -> Self {
        Self {
            bom: true,
            terminator: Terminator::CRLF,
        }
    }

    /// Settings for a pipe or terminal.
    pub fn stream() -> Self {
        Self {
            bom: false,
            terminator: Terminator::Any(b'\n'),
        }
    }
}

/// Write `table` to `writer` and hand the writer back.
pub fn write_csv<W: Write>(mut writer: W, table: &StockTable, options: &CsvOptions) -> Result<W> {
    if options.bom {
        writer
            .write_all(UTF8_BOM)
            .map_err(|e| ScraperError::Export(format!("failed to write BOM: {e}")))?;
    }

    let mut csv = WriterBuilder::new()
        .terminator(options.terminator)
        .from_writer(writer);

    csv.write_record(&table.headers)
        .map_err(|e| ScraperError::Export(e.to_string()))?;
    for row in &table.rows {
        csv.write_record(row)
            .map_err(|e| ScraperError::Export(e.to_string()))?;
    }
    csv.flush()
        .map_err(|e| ScraperError::Export(e.to_string()))?;

    csv.into_inner()
        .map_err(|e| ScraperError::Export(e.to_string()))
}

/// Write `table` to a file at `path` (BOM, CRLF), replacing any existing file.
#[instrument(skip(table), fields(path = %path.display(), rows = table.len()))]
pub fn write_csv_file(path: &Path, table: &StockTable) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| ScraperError::io(parent, e))?;
        }
    }

    let file = File::create(path).map_err(|e| ScraperError::io(path, e))?;
    let mut out = write_csv(BufWriter::new(file), table, &CsvOptions::file())?;
    out.flush().map_err(|e| ScraperError::io(path, e))?;

    debug!("csv file written");
    Ok(())
}

/// Write `table` to stdout (no BOM, LF).
pub fn write_csv_stdout(table: &StockTable) -> Result<()> {
    let stdout = std::io::stdout();
    let mut out = write_csv(stdout.lock(), table, &CsvOptions::stream())?;
    out.flush()
        .map_err(|e| ScraperError::Export(format!("failed to flush stdout: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn sample() -> StockTable {
        StockTable {
            headers: vec!["product_url".into(), "variant_name".into(), "stock_units".into()],
            rows: vec![
                vec![
                    "https://shop.example/mug".into(),
                    "Taza cerámica, blanca".into(),
                    "1250".into(),
                ],
                vec![
                    "https://shop.example/pen".into(),
                    "Bolígrafo \"premium\"".into(),
                    "".into(),
                ],
            ],
        }
    }

    fn read_back(bytes: &[u8]) -> (Vec<String>, Vec<Vec<String>>) {
        let mut reader = csv::ReaderBuilder::new().from_reader(bytes);
        let headers = reader
            .headers()
            .expect("headers")
            .iter()
            .map(String::from)
            .collect();
        let rows = reader
            .records()
            .map(|r| r.expect("record").iter().map(String::from).collect())
            .collect();
        (headers, rows)
    }

    #[test]
    fn file_options_write_bom_and_crlf() {
        let table = sample();
        let bytes = write_csv(Vec::new(), &table, &CsvOptions::file()).unwrap();

        assert!(bytes.starts_with(UTF8_BOM));
        let text = std::str::from_utf8(&bytes[UTF8_BOM.len()..]).unwrap();
        assert!(text.starts_with("product_url,variant_name,stock_units\r\n"));

        let (headers, rows) = read_back(&bytes[UTF8_BOM.len()..]);
        assert_eq!(headers, table.headers);
        assert_eq!(rows, table.rows);
    }

    #[test]
    fn stream_options_have_no_bom() {
        let bytes = write_csv(Vec::new(), &sample(), &CsvOptions::stream()).unwrap();
        let text = String::from_utf8(bytes).unwrap();

        assert!(text.starts_with("product_url,"));
        assert!(!text.contains('\r'));
        assert!(text.contains("\"Taza cerámica, blanca\""));
        assert!(text.contains("\"Bolígrafo \"\"premium\"\"\""));
    }

    #[test]
    fn header_only_table() {
        let table = StockTable {
            headers: vec!["a".into(), "b".into()],
            rows: vec![],
        };
        let bytes = write_csv(Vec::new(), &table, &CsvOptions::stream()).unwrap();
        assert_eq!(bytes, b"a,b\n");
    }

    #[test]
    fn file_round_trip() {
        let table = sample();
        let path = std::env::temp_dir()
            .join(format!("ss_csv_{}", Uuid::now_v7()))
            .join("stock.csv");

        write_csv_file(&path, &table).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..3], UTF8_BOM);
        let (headers, rows) = read_back(&bytes[3..]);
        assert_eq!(headers, table.headers);
        assert_eq!(rows, table.rows);

        if let Some(dir) = path.parent() {
            let _ = std::fs::remove_dir_all(dir);
        }
    }
}
