//! Domain types shared across the scraper.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::Error;

// ── Primary stock API types ───────────────────────────────────────────

/// Envelope returned by the stock API.
#[derive(Debug, Clone, Deserialize)]
pub struct RawStockResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub data: Vec<RawStockData>,
}

impl RawStockResponse {
    /// The record to normalize. Fails when the API reports failure or sent
    /// no records.
    pub fn first_record(&self) -> Result<&RawStockData, Error> {
        if !self.success {
            return Err(Error::Data("API reported success=false".into()));
        }
        self.data
            .first()
            .ok_or_else(|| Error::Data("API returned an empty data array".into()))
    }
}

/// One category-keyed stock record. Only the first record is used.
///
/// Every field is optional and tolerant: a section with an unexpected shape
/// reads as absent instead of failing the whole payload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawStockData {
    /// Epoch seconds of the upstream observation. Numeric strings are accepted.
    #[serde(default, deserialize_with = "lenient_number")]
    pub timestamp: Option<f64>,
    #[serde(default, deserialize_with = "lenient_category")]
    pub seeds: Option<CategoryEntries>,
    #[serde(default, deserialize_with = "lenient_category")]
    pub gear: Option<CategoryEntries>,
    #[serde(default, deserialize_with = "lenient_category")]
    pub eggs: Option<CategoryEntries>,
    #[serde(default, deserialize_with = "lenient_category")]
    pub cosmetic: Option<CategoryEntries>,
    #[serde(default, deserialize_with = "lenient_category")]
    pub event: Option<CategoryEntries>,
    #[serde(default, deserialize_with = "lenient_category")]
    pub honeyevent: Option<CategoryEntries>,
    #[serde(default, deserialize_with = "lenient_category")]
    pub traveling: Option<CategoryEntries>,
    #[serde(default, deserialize_with = "lenient_category")]
    pub seasonpass: Option<CategoryEntries>,
    #[serde(default, deserialize_with = "lenient_weather")]
    pub weather: Option<RawWeather>,
}

/// A category is either `{name: qty}` or `[{name, quantity}]` depending on
/// the upstream section. Quantities may arrive as numbers or strings.
#[derive(Debug, Clone)]
pub enum CategoryEntries {
    Map(Map<String, Value>),
    List(Vec<NamedQuantity>),
}

impl CategoryEntries {
    /// Objects and arrays are categories; anything else (`false`, `null`,
    /// numbers, strings) is treated as a missing section. List elements
    /// that are not objects are dropped.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self::Map(map)),
            Value::Array(items) => Some(Self::List(
                items
                    .into_iter()
                    .filter_map(|item| serde_json::from_value(item).ok())
                    .collect(),
            )),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NamedQuantity {
    /// Empty when the upstream entry carries no usable name.
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default)]
    pub quantity: Value,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawWeather {
    #[serde(rename = "type", default, deserialize_with = "lenient_optional_string")]
    pub kind: Option<String>,
    /// Seconds remaining.
    #[serde(default, deserialize_with = "lenient_number")]
    pub duration: Option<f64>,
}

/// A JSON number, or a string holding one.
fn number_from_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|f| f.is_finite())
}

fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(number_from_value(&value))
}

fn lenient_category<'de, D>(deserializer: D) -> Result<Option<CategoryEntries>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(CategoryEntries::from_value(value))
}

fn lenient_weather<'de, D>(deserializer: D) -> Result<Option<RawWeather>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        value @ Value::Object(_) => Ok(Some(
            serde_json::from_value(value).unwrap_or_default(),
        )),
        _ => Ok(None),
    }
}

fn lenient_optional_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    lenient_optional_string(deserializer).map(Option::unwrap_or_default)
}

// ── Normalized output ─────────────────────────────────────────────────

/// Item name to opaque image metadata, in upstream order.
pub type ImageIndex = Map<String, Value>;

/// A single in-stock item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StockItem {
    pub name: String,
    pub value: i64,
}

/// Restock intervals in milliseconds, keyed by category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimerSet {
    pub seeds: u64,
    pub gears: u64,
    pub eggs: u64,
    pub cosmetics: u64,
    pub event: u64,
}

impl TimerSet {
    pub const DEFAULT_SEEDS_MS: u64 = 300_000;
    pub const DEFAULT_GEARS_MS: u64 = 300_000;
    pub const DEFAULT_EGGS_MS: u64 = 1_800_000;
    pub const DEFAULT_COSMETICS_MS: u64 = 10_800_000;
    pub const DEFAULT_EVENT_MS: u64 = 300_000;
}

impl Default for TimerSet {
    fn default() -> Self {
        Self {
            seeds: Self::DEFAULT_SEEDS_MS,
            gears: Self::DEFAULT_GEARS_MS,
            eggs: Self::DEFAULT_EGGS_MS,
            cosmetics: Self::DEFAULT_COSMETICS_MS,
            event: Self::DEFAULT_EVENT_MS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Weather {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    #[serde(rename = "durationSeconds")]
    pub duration_seconds: Option<i64>,
}

/// Zen event status. The stock API does not expose it, so it is always
/// emitted inactive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ZenEvent {
    pub active: bool,
    pub time_remaining: Option<i64>,
}

impl ZenEvent {
    pub fn unavailable() -> Self {
        Self {
            active: false,
            time_remaining: None,
        }
    }
}

/// The unified view served to clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedSnapshot {
    pub seeds_stock: Vec<StockItem>,
    pub gear_stock: Vec<StockItem>,
    pub egg_stock: Vec<StockItem>,
    pub cosmetics_stock: Vec<StockItem>,
    pub event_stock: Vec<StockItem>,
    pub merchants_stock: Vec<StockItem>,
    pub restock_timers: TimerSet,
    pub weather: Option<Weather>,
    pub zen_event: ZenEvent,
    pub image_data: ImageIndex,
    /// ISO-8601 time of the upstream observation.
    pub last_updated: String,
}

impl NormalizedSnapshot {
    /// Items across every category list.
    pub fn total_items(&self) -> usize {
        self.seeds_stock.len()
            + self.gear_stock.len()
            + self.egg_stock.len()
            + self.cosmetics_stock.len()
            + self.event_stock.len()
            + self.merchants_stock.len()
    }
}
