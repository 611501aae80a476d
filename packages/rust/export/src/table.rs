//! Flattening of variant records into a rectangular table.
//!
//! The number of arrival columns is dynamic: with [`ArrivalLayout::All`] the
//! table grows one `arrival_date_N` / `arrival_qty_N` pair per scheduled
//! arrival of the record with the most arrivals. Shorter records are padded
//! with empty cells.

use stockscraper_shared::{ArrivalLayout, VariantRecord};

/// Columns every table starts with, in order.
pub const BASE_COLUMNS: [&str; 6] = [
    "product_url",
    "model_parent",
    "variant_name",
    "variant_sku",
    "stock_units",
    "reserved_units",
];

/// Column appended when records are stamped.
pub const EXTRACTED_AT_COLUMN: &str = "extracted_at";

/// A header row plus one string row per record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StockTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl StockTable {
    /// Number of data rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Largest arrival list across `records`.
pub fn max_arrivals(records: &[VariantRecord]) -> usize {
    records.iter().map(|r| r.arrivals.len()).max().unwrap_or(0)
}

/// Flatten `records` into a table, one row per record.
pub fn flatten(records: &[VariantRecord], layout: ArrivalLayout, stamped: bool) -> StockTable {
    let arrival_slots = match layout {
        ArrivalLayout::All => max_arrivals(records),
        ArrivalLayout::Next => 1,
    };

    let mut headers: Vec<String> = BASE_COLUMNS.iter().map(|c| c.to_string()).collect();
    match layout {
        ArrivalLayout::All => {
            for i in 1..=arrival_slots {
                headers.push(format!("arrival_date_{i}"));
                headers.push(format!("arrival_qty_{i}"));
            }
        }
        ArrivalLayout::Next => {
            headers.push("next_arrival_date".into());
            headers.push("next_arrival_qty".into());
        }
    }
    if stamped {
        headers.push(EXTRACTED_AT_COLUMN.into());
    }

    let rows = records
        .iter()
        .map(|record| {
            let mut row = Vec::with_capacity(headers.len());
            row.push(record.product_url.clone());
            row.push(record.model_parent.clone());
            row.push(record.variant_name.clone());
            row.push(record.variant_sku.clone());
            row.push(optional_number(record.stock_units));
            row.push(record.reserved_units.to_string());

            for slot in 0..arrival_slots {
                match record.arrivals.get(slot) {
                    Some(arrival) => {
                        row.push(arrival.date.clone());
                        row.push(optional_number(arrival.quantity));
                    }
                    None => {
                        row.push(String::new());
                        row.push(String::new());
                    }
                }
            }

            if stamped {
                row.push(record.extracted_at_string());
            }
            row
        })
        .collect();

    StockTable { headers, rows }
}

fn optional_number(value: Option<i64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;
    use stockscraper_shared::{Arrival, EXTRACTED_AT_FORMAT};

    fn record(sku: &str, arrivals: usize) -> VariantRecord {
        VariantRecord {
            product_url: "https://shop.example/mug".into(),
            model_parent: "GE-8801".into(),
            variant_name: format!("Mug {sku}"),
            variant_sku: sku.into(),
            stock_units: Some(10),
            reserved_units: 2,
            arrivals: (1..=arrivals)
                .map(|i| Arrival {
                    date: format!("2025-0{i}-01"),
                    quantity: Some(i as i64 * 100),
                })
                .collect(),
            extracted_at: None,
        }
    }

    #[test]
    fn no_arrivals_means_base_columns_only() {
        let table = flatten(&[record("A", 0), record("B", 0)], ArrivalLayout::All, false);
        assert_eq!(table.headers, BASE_COLUMNS);
        assert_eq!(table.len(), 2);
        assert_eq!(
            table.rows[0],
            vec!["https://shop.example/mug", "GE-8801", "Mug A", "A", "10", "2"]
        );
    }

    #[test]
    fn columns_sized_to_longest_arrival_list() {
        let table = flatten(
            &[record("A", 0), record("B", 1), record("C", 3)],
            ArrivalLayout::All,
            false,
        );

        assert_eq!(table.headers.len(), 6 + 3 * 2);
        assert_eq!(
            &table.headers[6..],
            [
                "arrival_date_1",
                "arrival_qty_1",
                "arrival_date_2",
                "arrival_qty_2",
                "arrival_date_3",
                "arrival_qty_3"
            ]
        );

        // One row per record, each as wide as the header
        assert_eq!(table.len(), 3);
        assert!(table.rows.iter().all(|r| r.len() == table.headers.len()));

        // Record without arrivals is padded with empty cells
        assert!(table.rows[0][6..].iter().all(String::is_empty));

        // Record with one arrival fills the first pair only
        assert_eq!(table.rows[1][6], "2025-01-01");
        assert_eq!(table.rows[1][7], "100");
        assert!(table.rows[1][8..].iter().all(String::is_empty));

        assert_eq!(table.rows[2][10], "2025-03-01");
        assert_eq!(table.rows[2][11], "300");
    }

    #[test]
    fn next_layout_uses_first_arrival() {
        let table = flatten(&[record("A", 2), record("B", 0)], ArrivalLayout::Next, false);
        assert_eq!(&table.headers[6..], ["next_arrival_date", "next_arrival_qty"]);
        assert_eq!(&table.rows[0][6..], ["2025-01-01", "100"]);
        assert_eq!(&table.rows[1][6..], ["", ""]);
    }

    #[test]
    fn missing_numbers_render_empty() {
        let mut rec = record("A", 1);
        rec.stock_units = None;
        rec.arrivals[0].quantity = None;
        let table = flatten(&[rec], ArrivalLayout::All, false);
        assert_eq!(table.rows[0][4], "");
        assert_eq!(table.rows[0][5], "2");
        assert_eq!(table.rows[0][7], "");
    }

    #[test]
    fn stamped_table_ends_with_extracted_at() {
        let mut rec = record("A", 1);
        rec.extracted_at =
            NaiveDateTime::parse_from_str("2025-02-03 10:11:12", EXTRACTED_AT_FORMAT).ok();
        let table = flatten(&[rec], ArrivalLayout::All, true);
        assert_eq!(table.headers.last().map(String::as_str), Some(EXTRACTED_AT_COLUMN));
        assert_eq!(table.rows[0].last().map(String::as_str), Some("2025-02-03 10:11:12"));
    }

    #[test]
    fn empty_input() {
        let table = flatten(&[], ArrivalLayout::All, false);
        assert!(table.is_empty());
        assert_eq!(table.headers, BASE_COLUMNS);
    }
}
