//! Mapping from configurator options to variant records.

use chrono::{NaiveDateTime, Timelike, Utc};

use stockscraper_shared::{VariantOption, VariantRecord};

/// One record per option, in API order, all carrying `extracted_at`.
pub fn records_from_options(
    product_url: &str,
    options: &[VariantOption],
    extracted_at: Option<NaiveDateTime>,
) -> Vec<VariantRecord> {
    options
        .iter()
        .map(|option| {
            let mut record = VariantRecord::from_option(product_url, option);
            record.extracted_at = extracted_at;
            record
        })
        .collect()
}

/// Current UTC time truncated to whole seconds.
///
/// Output formats carry second precision, so the stored key and the CSV
/// value must agree.
pub fn extraction_timestamp() -> NaiveDateTime {
    let now = Utc::now().naive_utc();
    now.with_nanosecond(0).unwrap_or(now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockscraper_shared::{ConfiguratorResponse, EXTRACTED_AT_FORMAT};
    use stockscraper_fetcher::variant_options;

    fn fixture_options() -> Vec<VariantOption> {
        let json = std::fs::read_to_string("../../../fixtures/json/configurator.json")
            .expect("read configurator fixture");
        let response: ConfiguratorResponse = serde_json::from_str(&json).expect("parse fixture");
        variant_options(&response).expect("options")
    }

    #[test]
    fn one_record_per_option() {
        let options = fixture_options();
        let records = records_from_options("https://shop.example/mug", &options, None);

        assert_eq!(records.len(), 3);
        assert!(records.iter().all(|r| r.product_url == "https://shop.example/mug"));
        assert!(records.iter().all(|r| r.extracted_at.is_none()));

        assert_eq!(records[0].stock_units, Some(1250));
        assert_eq!(records[0].reserved_units, 300);
        assert_eq!(records[0].arrivals.len(), 2);
        assert_eq!(records[0].arrivals[0].date, "2025-03-14");

        assert_eq!(records[1].stock_units, Some(0));
        assert_eq!(records[1].reserved_units, 0);

        assert_eq!(records[2].stock_units, None);
        assert!(records[2].arrivals.is_empty());
    }

    #[test]
    fn stamp_applies_to_every_record() {
        let ts = NaiveDateTime::parse_from_str("2025-02-01 10:30:00", EXTRACTED_AT_FORMAT).unwrap();
        let records = records_from_options("u", &fixture_options(), Some(ts));
        assert!(records.iter().all(|r| r.extracted_at == Some(ts)));
        assert_eq!(records[0].extracted_at_string(), "2025-02-01 10:30:00");
    }

    #[test]
    fn no_options_no_records() {
        assert!(records_from_options("u", &[], None).is_empty());
    }

    #[test]
    fn timestamp_has_whole_seconds() {
        assert_eq!(extraction_timestamp().nanosecond(), 0);
    }
}
