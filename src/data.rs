//! CSV persistence for downloaded exchange data
//!
//! Candlesticks are stored one file per instrument/timeframe with a
//! `datetime,open,high,low,close,volume` header. Order history accumulates
//! in a single CSV that successive exports append to, deduplicated by
//! order id so re-running an export never produces duplicate rows.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::types::{Candle, Order, OrderStatus};

// =============================================================================
// Candlestick CSV
// =============================================================================

/// Save candles to a CSV file, oldest first
pub fn save_candles_csv(path: impl AsRef<Path>, candles: &[Candle]) -> Result<PathBuf> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut file = File::create(path)?;
    writeln!(file, "datetime,open,high,low,close,volume")?;

    for candle in candles {
        let datetime = DateTime::<Utc>::from_timestamp_millis(candle.time)
            .ok_or_else(|| Error::Config(format!("invalid bar timestamp: {}", candle.time)))?;
        writeln!(
            file,
            "{},{},{},{},{},{}",
            datetime.format("%Y-%m-%d %H:%M:%S"),
            candle.open,
            candle.high,
            candle.low,
            candle.close,
            candle.volume
        )?;
    }

    info!("saved {} rows to {}", candles.len(), path.display());
    Ok(path.to_path_buf())
}

/// Load candles from a CSV file written by [`save_candles_csv`]
pub fn load_candles_csv(path: impl AsRef<Path>) -> Result<Vec<Candle>> {
    let path = path.as_ref();
    let mut reader = csv::Reader::from_path(path)?;

    let mut candles = Vec::new();
    for (row_idx, result) in reader.records().enumerate() {
        let record = result?;
        match parse_candle_row(&record) {
            Some(candle) => candles.push(candle),
            None => {
                return Err(Error::Config(format!(
                    "malformed candle row {} in {}",
                    row_idx + 2, // 1-indexed plus header row
                    path.display()
                )))
            }
        }
    }

    Ok(candles)
}

fn parse_candle_row(record: &csv::StringRecord) -> Option<Candle> {
    let dt_str = record.get(0)?;
    let datetime = dt_str
        .parse::<DateTime<Utc>>()
        .ok()
        .or_else(|| {
            chrono::NaiveDateTime::parse_from_str(dt_str, "%Y-%m-%d %H:%M:%S")
                .map(|ndt| DateTime::<Utc>::from_naive_utc_and_offset(ndt, Utc))
                .ok()
        })?;

    Some(Candle {
        time: datetime.timestamp_millis(),
        open: record.get(1)?.parse().ok()?,
        high: record.get(2)?.parse().ok()?,
        low: record.get(3)?.parse().ok()?,
        close: record.get(4)?.parse().ok()?,
        volume: record.get(5)?.parse().ok()?,
    })
}

/// Conventional filename for a downloaded instrument/timeframe pair,
/// e.g. `BTC_USD_1h.csv`
pub fn candle_filename(instrument_name: &str, interval: &str) -> String {
    format!("{}_{}.csv", instrument_name, interval)
}

// =============================================================================
// Order history CSV
// =============================================================================

/// Write order history to a CSV file, oldest first
pub fn save_order_history_csv(path: impl AsRef<Path>, orders: &[Order]) -> Result<PathBuf> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut writer = csv::Writer::from_path(path)?;
    for order in orders {
        writer.serialize(order)?;
    }
    writer.flush()?;

    info!("saved {} orders to {}", orders.len(), path.display());
    Ok(path.to_path_buf())
}

/// Read order history from CSV with optional filters
pub fn read_order_history_csv(
    path: impl AsRef<Path>,
    filter_by_status: Option<&[OrderStatus]>,
    filter_by_instrument: Option<&str>,
) -> Result<Vec<Order>> {
    let mut reader = csv::Reader::from_path(path.as_ref())?;

    let mut orders = Vec::new();
    for result in reader.deserialize::<Order>() {
        let order = result?;
        if let Some(statuses) = filter_by_status {
            if !statuses.contains(&order.status) {
                continue;
            }
        }
        if let Some(instrument) = filter_by_instrument {
            if order.instrument_name != instrument {
                continue;
            }
        }
        orders.push(order);
    }

    Ok(orders)
}

/// Merge freshly downloaded orders with previously exported ones
///
/// Deduplicates by order id, preferring the fresh copy (its status and
/// cumulative fields are newer), and returns the result sorted by creation
/// time ascending.
pub fn merge_order_history(fresh: Vec<Order>, existing: Vec<Order>) -> Vec<Order> {
    let mut merged: Vec<Order> = Vec::with_capacity(fresh.len() + existing.len());
    let mut seen = std::collections::HashSet::new();

    for order in fresh.into_iter().chain(existing) {
        if seen.insert(order.order_id.clone()) {
            merged.push(order);
        }
    }

    merged.sort_by_key(|o| o.create_time);
    merged
}

/// Append `fresh` orders into the CSV at `path`, merging with any rows
/// already there. Returns the total row count after the merge.
pub fn export_order_history(path: impl AsRef<Path>, fresh: Vec<Order>) -> Result<usize> {
    let path = path.as_ref();

    let existing = if path.is_file() {
        read_order_history_csv(path, None, None)?
    } else {
        Vec::new()
    };
    if !existing.is_empty() {
        info!(
            "merging {} downloaded orders into {} existing rows",
            fresh.len(),
            existing.len()
        );
    }

    let merged = merge_order_history(fresh, existing);
    if merged.is_empty() {
        warn!("no orders to export; leaving {} untouched", path.display());
        return Ok(0);
    }

    save_order_history_csv(path, &merged)?;
    Ok(merged.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{OrderType, Side, TimeInForce};
    use approx::assert_relative_eq;

    fn temp_path(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("cryptocom-client-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir.join(name)
    }

    fn candle(time: i64, close: f64) -> Candle {
        Candle {
            open: close - 1.0,
            high: close + 1.0,
            low: close - 2.0,
            close,
            volume: 10.0,
            time,
        }
    }

    fn order(id: &str, create_time: i64, status: OrderStatus) -> Order {
        Order {
            order_id: id.to_string(),
            client_oid: format!("c-{}", id),
            instrument_name: "CRO_USD".to_string(),
            side: Side::Buy,
            order_type: OrderType::Limit,
            time_in_force: TimeInForce::GoodTillCancel,
            status,
            quantity: 100.0,
            order_value: 14.0,
            avg_price: 0.14,
            cumulative_quantity: 0.0,
            cumulative_value: 0.0,
            cumulative_fee: 0.0,
            fee_instrument_name: "CRO".to_string(),
            create_time,
            update_time: create_time,
        }
    }

    #[test]
    fn test_candles_survive_save_and_load() {
        let path = temp_path("candles_roundtrip.csv");
        let candles = vec![candle(1_704_067_200_000, 100.0), candle(1_704_067_260_000, 101.5)];

        save_candles_csv(&path, &candles).unwrap();
        let loaded = load_candles_csv(&path).unwrap();

        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].time, 1_704_067_200_000);
        assert_relative_eq!(loaded[1].close, 101.5);
    }

    #[test]
    fn test_malformed_candle_row_fails_load() {
        let path = temp_path("candles_malformed.csv");
        std::fs::write(
            &path,
            "datetime,open,high,low,close,volume\nnot-a-date,1,2,0,1,5\n",
        )
        .unwrap();

        assert!(load_candles_csv(&path).is_err());
    }

    #[test]
    fn test_candle_filename_convention() {
        assert_eq!(candle_filename("BTC_USD", "1h"), "BTC_USD_1h.csv");
    }

    #[test]
    fn test_merge_prefers_fresh_rows() {
        let fresh = vec![order("ord-1", 2_000, OrderStatus::Filled)];
        let existing = vec![
            order("ord-1", 2_000, OrderStatus::Active),
            order("ord-0", 1_000, OrderStatus::Filled),
        ];

        let merged = merge_order_history(fresh, existing);

        assert_eq!(merged.len(), 2);
        // sorted by creation time, with ord-1 taken from the fresh batch
        assert_eq!(merged[0].order_id, "ord-0");
        assert_eq!(merged[1].order_id, "ord-1");
        assert_eq!(merged[1].status, OrderStatus::Filled);
    }

    #[test]
    fn test_export_appends_and_deduplicates() {
        let path = temp_path("orders_export.csv");
        let _ = std::fs::remove_file(&path);

        let first = vec![
            order("ord-1", 1_000, OrderStatus::Filled),
            order("ord-2", 2_000, OrderStatus::Active),
        ];
        assert_eq!(export_order_history(&path, first).unwrap(), 2);

        // second export overlaps the first; ord-2 has since filled
        let second = vec![
            order("ord-2", 2_000, OrderStatus::Filled),
            order("ord-3", 3_000, OrderStatus::Filled),
        ];
        assert_eq!(export_order_history(&path, second).unwrap(), 3);

        let rows = read_order_history_csv(&path, None, None).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1].order_id, "ord-2");
        assert_eq!(rows[1].status, OrderStatus::Filled);
    }

    #[test]
    fn test_read_filters_by_status_and_instrument() {
        let path = temp_path("orders_filter.csv");
        let orders = vec![
            order("ord-1", 1_000, OrderStatus::Filled),
            order("ord-2", 2_000, OrderStatus::Canceled),
            order("ord-3", 3_000, OrderStatus::Filled),
        ];
        save_order_history_csv(&path, &orders).unwrap();

        let filled =
            read_order_history_csv(&path, Some(&[OrderStatus::Filled]), None).unwrap();
        assert_eq!(filled.len(), 2);

        let none =
            read_order_history_csv(&path, None, Some("BTC_USD")).unwrap();
        assert!(none.is_empty());
    }
}
