//! Raw stock payload → `NormalizedSnapshot`.
//!
//! Pure and deterministic: the same inputs always produce the same output.

use chrono::{DateTime, SecondsFormat, Utc};
use common::{
    CategoryEntries, Error, ImageIndex, NormalizedSnapshot, RawStockResponse, StockItem, TimerSet,
    Weather, ZenEvent,
};
use serde_json::Value;

/// Build the served snapshot from the stock payload plus optional timer and
/// image enrichment. Missing timers fall back to [`TimerSet::default`].
pub fn normalize(
    raw: &RawStockResponse,
    timers: Option<TimerSet>,
    images: &ImageIndex,
) -> Result<NormalizedSnapshot, Error> {
    let record = raw.first_record()?;

    let timestamp = record
        .timestamp
        .ok_or_else(|| Error::Data("stock record has no timestamp".into()))?;
    let last_updated = epoch_secs_to_iso(timestamp)?;

    let mut event_stock = in_stock(record.event.as_ref());
    event_stock.extend(in_stock(record.honeyevent.as_ref()));

    let mut merchants_stock = in_stock(record.traveling.as_ref());
    merchants_stock.extend(in_stock(record.seasonpass.as_ref()));

    Ok(NormalizedSnapshot {
        seeds_stock: in_stock(record.seeds.as_ref()),
        gear_stock: in_stock(record.gear.as_ref()),
        egg_stock: in_stock(record.eggs.as_ref()),
        cosmetics_stock: in_stock(record.cosmetic.as_ref()),
        event_stock,
        merchants_stock,
        restock_timers: timers.unwrap_or_default(),
        weather: record.weather.as_ref().map(|w| Weather {
            kind: w.kind.clone(),
            duration_seconds: w.duration.filter(|d| d.is_finite()).map(|d| d.round() as i64),
        }),
        zen_event: ZenEvent::unavailable(),
        image_data: images.clone(),
        last_updated,
    })
}

/// Named entries with a strictly positive quantity, in source order.
fn in_stock(entries: Option<&CategoryEntries>) -> Vec<StockItem> {
    let Some(entries) = entries else {
        return Vec::new();
    };

    let pairs: Vec<(&str, &Value)> = match entries {
        CategoryEntries::Map(map) => map.iter().map(|(k, v)| (k.as_str(), v)).collect(),
        CategoryEntries::List(list) => list
            .iter()
            .map(|e| (e.name.as_str(), &e.quantity))
            .collect(),
    };

    pairs
        .into_iter()
        .filter(|(name, _)| !name.is_empty())
        .filter_map(|(name, qty)| {
            let value = coerce_quantity(qty)?;
            (value > 0).then(|| StockItem {
                name: name.to_string(),
                value,
            })
        })
        .collect()
}

/// Integer quantity from a JSON number or numeric string.
///
/// Numbers truncate toward zero. Strings are read like a lenient integer
/// parse: optional leading whitespace and sign, then the leading digits
/// (`"12 left"` → 12). Anything else has no quantity.
pub fn coerce_quantity(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::String(s) => parse_leading_int(s),
        _ => None,
    }
}

fn parse_leading_int(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let (negative, rest) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let digits_len = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits_len == 0 {
        return None;
    }
    let magnitude: i64 = rest[..digits_len].parse().ok()?;
    Some(if negative { -magnitude } else { magnitude })
}

fn epoch_secs_to_iso(secs: f64) -> Result<String, Error> {
    if !secs.is_finite() {
        return Err(Error::Data(format!("invalid stock timestamp: {secs}")));
    }
    let millis = (secs * 1000.0).round() as i64;
    DateTime::<Utc>::from_timestamp_millis(millis)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
        .ok_or_else(|| Error::Data(format!("stock timestamp out of range: {secs}")))
}
