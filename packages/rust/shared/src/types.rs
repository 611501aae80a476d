//! Domain types: the configurator API payload and the flat variant record.
//!
//! The configurator API is loosely typed in practice. Every field is
//! optional, numbers sometimes arrive as strings, and `stock` may be `null`.
//! The deserializers here absorb all of that so callers only see `Option`s.

use chrono::NaiveDateTime;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Step type that carries the per-variant stock options.
pub const QUANTITY_PER_VARIANT: &str = "quantity_per_variant";

/// Format used when an extraction timestamp is written out.
pub const EXTRACTED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ---------------------------------------------------------------------------
// Configurator API payload
// ---------------------------------------------------------------------------

/// Root of the `/products/{id}/configurator` response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfiguratorResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub steps: Vec<ConfiguratorStep>,
}

/// A configurator step. Only `quantity_per_variant` steps are interpreted;
/// the options of other steps have unrelated shapes and stay raw.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfiguratorStep {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub options: Value,
}

/// One purchasable variant inside a `quantity_per_variant` step.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantOption {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: Option<String>,
    /// Parent model code shared by all variants of a product.
    #[serde(default, deserialize_with = "lenient_string")]
    pub product_code: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub variant_code: Option<String>,
    /// `None` when the API sends `null` or anything that is not an object.
    #[serde(default, deserialize_with = "lenient_struct")]
    pub stock: Option<StockInfo>,
}

/// Stock block of a variant.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockInfo {
    #[serde(default, deserialize_with = "lenient_i64")]
    pub quantity: Option<i64>,
    /// Units already reserved by open orders.
    #[serde(default, deserialize_with = "lenient_i64")]
    pub total_option: Option<i64>,
    /// Entries that are not objects, or a value that is not a list, are dropped.
    #[serde(default, deserialize_with = "lenient_list")]
    pub incoming_stocks: Vec<IncomingStock>,
}

/// A scheduled inbound delivery.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomingStock {
    /// ISO-8601 timestamp, e.g. `2025-03-14T00:00:00+01:00`.
    #[serde(default, deserialize_with = "lenient_string")]
    pub expected_arrival_date: Option<String>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub quantity: Option<i64>,
}

// ---------------------------------------------------------------------------
// Flat record
// ---------------------------------------------------------------------------

/// A single inbound delivery, reduced to what the output needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Arrival {
    /// Calendar date (`YYYY-MM-DD`), empty when the API omitted it.
    pub date: String,
    pub quantity: Option<i64>,
}

impl From<&IncomingStock> for Arrival {
    fn from(incoming: &IncomingStock) -> Self {
        let date = incoming
            .expected_arrival_date
            .as_deref()
            .and_then(|d| d.split('T').next())
            .unwrap_or("")
            .trim()
            .to_string();

        Self {
            date,
            quantity: incoming.quantity,
        }
    }
}

/// One variant of one product page, ready to be flattened or stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantRecord {
    pub product_url: String,
    pub model_parent: String,
    pub variant_name: String,
    pub variant_sku: String,
    pub stock_units: Option<i64>,
    pub reserved_units: i64,
    pub arrivals: Vec<Arrival>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted_at: Option<NaiveDateTime>,
}

impl VariantRecord {
    /// Build a record from an API option.
    pub fn from_option(product_url: &str, option: &VariantOption) -> Self {
        let stock = option.stock.clone().unwrap_or_default();

        Self {
            product_url: product_url.to_string(),
            model_parent: option.product_code.clone().unwrap_or_default(),
            variant_name: option.name.clone().unwrap_or_default(),
            variant_sku: option.variant_code.clone().unwrap_or_default(),
            stock_units: stock.quantity,
            reserved_units: stock.total_option.unwrap_or(0),
            arrivals: stock.incoming_stocks.iter().map(Arrival::from).collect(),
            extracted_at: None,
        }
    }

    /// The earliest scheduled arrival, if any.
    pub fn next_arrival(&self) -> Option<&Arrival> {
        self.arrivals.first()
    }

    /// Extraction timestamp formatted for output; empty when unstamped.
    pub fn extracted_at_string(&self) -> String {
        self.extracted_at
            .map(|ts| ts.format(EXTRACTED_AT_FORMAT).to_string())
            .unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Lenient deserializers
// ---------------------------------------------------------------------------

/// Interpret a JSON value as an integer: integral numbers and numeric
/// strings. Fractional or out-of-range values give `None`.
pub fn number_from_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(integral)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(integral))
        }
        _ => None,
    }
}

/// `12.0` is 12; `12.7`, NaN and anything beyond `i64` are rejected.
fn integral(f: f64) -> Option<i64> {
    // i64::MAX as f64 rounds up to 2^63, which is already out of range.
    let in_range = f >= i64::MIN as f64 && f < i64::MAX as f64;
    (f.is_finite() && f.fract() == 0.0 && in_range).then_some(f as i64)
}

/// Interpret a JSON scalar as text. Codes sometimes arrive as numbers.
pub fn text_from_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(text_from_value))
}

fn lenient_struct<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .filter(Value::is_object)
        .and_then(|v| serde_json::from_value(v).ok()))
}

fn lenient_list<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let items = match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Array(items)) => items,
        _ => return Ok(Vec::new()),
    };

    Ok(items
        .into_iter()
        .filter(Value::is_object)
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect())
}

fn lenient_i64<'de, D>(deserializer: D) -> std::result::Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(number_from_value))
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn option_with_full_stock() {
        let json = r#"{
            "name": "Mug white",
            "productCode": "GE-100",
            "variantCode": "GE-100-WH",
            "stock": {
                "quantity": 120,
                "totalOption": 15,
                "incomingStocks": [
                    {"expectedArrivalDate": "2025-03-14T00:00:00+01:00", "quantity": 500}
                ]
            }
        }"#;
        let option: VariantOption = serde_json::from_str(json).expect("parse option");
        let record = VariantRecord::from_option("https://shop.example/mug", &option);

        assert_eq!(record.model_parent, "GE-100");
        assert_eq!(record.variant_sku, "GE-100-WH");
        assert_eq!(record.stock_units, Some(120));
        assert_eq!(record.reserved_units, 15);
        assert_eq!(
            record.arrivals,
            vec![Arrival {
                date: "2025-03-14".into(),
                quantity: Some(500)
            }]
        );
    }

    #[test]
    fn option_with_null_stock() {
        let json = r#"{"name": "Pen", "productCode": "P1", "variantCode": "P1-BL", "stock": null}"#;
        let option: VariantOption = serde_json::from_str(json).expect("parse option");
        let record = VariantRecord::from_option("u", &option);

        assert_eq!(record.stock_units, None);
        assert_eq!(record.reserved_units, 0);
        assert!(record.arrivals.is_empty());
    }

    #[test]
    fn numbers_as_strings_and_nulls() {
        let json = r#"{
            "quantity": "42",
            "totalOption": null,
            "incomingStocks": null
        }"#;
        let stock: StockInfo = serde_json::from_str(json).expect("parse stock");
        assert_eq!(stock.quantity, Some(42));
        assert_eq!(stock.total_option, None);
        assert!(stock.incoming_stocks.is_empty());
    }

    #[test]
    fn unparseable_number_becomes_none() {
        let stock: StockInfo =
            serde_json::from_str(r#"{"quantity": "n/a"}"#).expect("parse stock");
        assert_eq!(stock.quantity, None);
    }

    #[test]
    fn missing_fields_default_to_empty() {
        let option: VariantOption = serde_json::from_str("{}").expect("parse empty");
        let record = VariantRecord::from_option("u", &option);
        assert_eq!(record.variant_name, "");
        assert_eq!(record.model_parent, "");
        assert_eq!(record.variant_sku, "");
    }

    #[test]
    fn arrival_without_date() {
        let incoming = IncomingStock {
            expected_arrival_date: None,
            quantity: Some(3),
        };
        let arrival = Arrival::from(&incoming);
        assert_eq!(arrival.date, "");
        assert_eq!(arrival.quantity, Some(3));
    }

    #[test]
    fn steps_keep_foreign_options_raw() {
        let json = r#"{"steps": [
            {"type": "color", "options": [{"stock": "weird"}]},
            {"type": "quantity_per_variant", "options": []}
        ]}"#;
        let response: ConfiguratorResponse = serde_json::from_str(json).expect("parse");
        assert_eq!(response.steps.len(), 2);
        assert_eq!(response.steps[1].kind.as_deref(), Some(QUANTITY_PER_VARIANT));
    }

    #[test]
    fn extracted_at_formatting() {
        let mut record = VariantRecord::from_option("u", &VariantOption::default());
        assert_eq!(record.extracted_at_string(), "");

        record.extracted_at =
            NaiveDateTime::parse_from_str("2025-01-02 03:04:05", EXTRACTED_AT_FORMAT).ok();
        assert_eq!(record.extracted_at_string(), "2025-01-02 03:04:05");
    }

    #[test]
    fn numeric_codes_are_kept_as_text() {
        let json = r#"{
            "name": 42,
            "productCode": 8801,
            "variantCode": 880101,
            "stock": {
                "quantity": 5,
                "incomingStocks": [{"expectedArrivalDate": 20250314, "quantity": 7}]
            }
        }"#;
        let option: VariantOption = serde_json::from_str(json).expect("parse option");
        let record = VariantRecord::from_option("u", &option);

        assert_eq!(record.variant_name, "42");
        assert_eq!(record.model_parent, "8801");
        assert_eq!(record.variant_sku, "880101");
        assert_eq!(record.arrivals[0].date, "20250314");
        assert_eq!(record.arrivals[0].quantity, Some(7));
    }

    #[test]
    fn non_list_incoming_stocks_become_empty() {
        let json = r#"{
            "productCode": "GE-1",
            "stock": {
                "quantity": 3,
                "incomingStocks": {"0": {"expectedArrivalDate": "2025-05-01", "quantity": 9}}
            }
        }"#;
        let option: VariantOption = serde_json::from_str(json).expect("parse option");
        let stock = option.stock.expect("stock kept");
        assert_eq!(stock.quantity, Some(3));
        assert!(stock.incoming_stocks.is_empty());
    }

    #[test]
    fn non_object_entries_are_dropped_from_incoming_stocks() {
        let json = r#"{"incomingStocks": [7, null, {"quantity": "12"}]}"#;
        let stock: StockInfo = serde_json::from_str(json).expect("parse stock");
        assert_eq!(stock.incoming_stocks.len(), 1);
        assert_eq!(stock.incoming_stocks[0].quantity, Some(12));
    }

    #[test]
    fn non_object_stock_becomes_none() {
        let option: VariantOption =
            serde_json::from_str(r#"{"name": "Pen", "stock": "unknown"}"#).expect("parse option");
        assert!(option.stock.is_none());
        assert_eq!(option.name.as_deref(), Some("Pen"));
    }

    #[test]
    fn fractional_and_huge_numbers_are_rejected() {
        use serde_json::json;

        assert_eq!(number_from_value(&json!(12.0)), Some(12));
        assert_eq!(number_from_value(&json!("12.0")), Some(12));
        assert_eq!(number_from_value(&json!(12.7)), None);
        assert_eq!(number_from_value(&json!("12.7")), None);
        assert_eq!(number_from_value(&json!(1e300)), None);
        assert_eq!(number_from_value(&json!("-4")), Some(-4));
        assert_eq!(number_from_value(&json!(true)), None);
    }
}
