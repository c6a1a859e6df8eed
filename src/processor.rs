use crate::config::RowPolicy;
use crate::error::SnapshotError;
use crate::models::{FlatRecord, RejectedEntry, SnapshotTable};
use crate::symbol::decode_symbol;
use serde_json::Value;
use tracing::{debug, warn};

/// Sub-objects whose inner fields become `<name>_<field>` columns.
pub const NESTED_SECTIONS: &[&str] = &[
    "greeks",
    "dailyBar",
    "latestQuote",
    "latestTrade",
    "minuteBar",
    "prevDailyBar",
];

pub const IMPLIED_VOLATILITY: &str = "impliedVolatility";

/// Flatten one snapshot entry into a single record.
///
/// Values are copied verbatim. Keys outside [`NESTED_SECTIONS`] and
/// `impliedVolatility` are dropped. A symbol that fails to decode yields an
/// error and no record.
pub fn flatten_entry(
    symbol: &str,
    entry: &Value,
    underlying_len: usize,
) -> Result<FlatRecord, SnapshotError> {
    let mut record = FlatRecord::new();
    record.insert("symbol", Value::String(symbol.to_string()));

    if let Some(details) = entry.as_object() {
        // Step 1: implied volatility (scalar only)
        if let Some(iv) = details.get(IMPLIED_VOLATILITY) {
            if !iv.is_object() && !iv.is_array() {
                record.insert(IMPLIED_VOLATILITY, iv.clone());
            }
        }

        // Step 2: nested sections
        for section in NESTED_SECTIONS {
            if let Some(Value::Object(inner)) = details.get(*section) {
                for (key, value) in inner {
                    record.insert(format!("{}_{}", section, key), value.clone());
                }
            }
        }

        for key in details.keys() {
            if key != IMPLIED_VOLATILITY && !NESTED_SECTIONS.contains(&key.as_str()) {
                debug!(symbol, key = %key, "Ignoring unknown snapshot field");
            }
        }
    }

    // Step 3: fields derived from the symbol itself
    let decoded = decode_symbol(symbol, underlying_len)?;
    record.insert(
        "expires",
        Value::String(decoded.expires.format("%Y-%m-%d").to_string()),
    );
    if let Some(option_type) = decoded.option_type {
        record.insert("optionType", Value::String(option_type.to_string()));
    }
    record.insert("price", Value::from(decoded.price));

    Ok(record)
}

/// Build the table from a full API response.
///
/// A response without a `snapshots` object is an API contract violation and
/// fails with `EmptyResponse`. An empty `snapshots` object is a valid empty
/// table.
pub fn build_table(
    response: &Value,
    underlying_len: usize,
    policy: RowPolicy,
) -> Result<SnapshotTable, SnapshotError> {
    let snapshots = match response.get("snapshots") {
        Some(Value::Object(map)) => map,
        Some(other) => {
            return Err(SnapshotError::EmptyResponse(format!(
                "'snapshots' is not an object: {}",
                preview(other)
            )));
        }
        None => return Err(SnapshotError::EmptyResponse(preview(response))),
    };

    let results = snapshots
        .iter()
        .map(|(symbol, entry)| (symbol, flatten_entry(symbol, entry, underlying_len)));

    let mut table = SnapshotTable::default();
    for (symbol, result) in results {
        match result {
            Ok(record) => table.records.push(record),
            Err(e) => match policy {
                RowPolicy::Strict => return Err(e),
                RowPolicy::Lenient => {
                    warn!(symbol = %symbol, error = %e, "Skipping snapshot entry");
                    table.rejected.push(RejectedEntry {
                        symbol: symbol.clone(),
                        reason: e.to_string(),
                    });
                }
            },
        }
    }

    Ok(table)
}

fn preview(value: &Value) -> String {
    value.to_string().chars().take(200).collect()
}
