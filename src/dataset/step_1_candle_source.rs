// External crates
use chrono::{DateTime, Duration, Months, Utc};
use log::{debug, info};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

// Local modules
use crate::config::BinanceSettings;
use crate::constants::{
    BINANCE_API_KEY_HEADER, BINANCE_KLINES_ENDPOINT, CANDLE_COLUMNS, KLINES_PAGE_LIMIT,
};
use crate::error::{DatasetError, Result};

/// One exchange candle (kline)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Open time in epoch milliseconds
    pub open_time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub close_time: i64,
    pub quote_asset_volume: f64,
    pub number_of_trades: i64,
    pub taker_buy_base_asset_volume: f64,
    pub taker_buy_quote_asset_volume: f64,
}

/// Candle durations accepted by the exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KlineInterval {
    OneMinute,
    ThreeMinutes,
    FiveMinutes,
    FifteenMinutes,
    ThirtyMinutes,
    OneHour,
    TwoHours,
    FourHours,
    SixHours,
    EightHours,
    TwelveHours,
    OneDay,
    ThreeDays,
    OneWeek,
    OneMonth,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IntervalUnit {
    Minute,
    Hour,
    Day,
    Week,
    Month,
}

impl KlineInterval {
    pub const ALL: [KlineInterval; 15] = [
        KlineInterval::OneMinute,
        KlineInterval::ThreeMinutes,
        KlineInterval::FiveMinutes,
        KlineInterval::FifteenMinutes,
        KlineInterval::ThirtyMinutes,
        KlineInterval::OneHour,
        KlineInterval::TwoHours,
        KlineInterval::FourHours,
        KlineInterval::SixHours,
        KlineInterval::EightHours,
        KlineInterval::TwelveHours,
        KlineInterval::OneDay,
        KlineInterval::ThreeDays,
        KlineInterval::OneWeek,
        KlineInterval::OneMonth,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            KlineInterval::OneMinute => "1m",
            KlineInterval::ThreeMinutes => "3m",
            KlineInterval::FiveMinutes => "5m",
            KlineInterval::FifteenMinutes => "15m",
            KlineInterval::ThirtyMinutes => "30m",
            KlineInterval::OneHour => "1h",
            KlineInterval::TwoHours => "2h",
            KlineInterval::FourHours => "4h",
            KlineInterval::SixHours => "6h",
            KlineInterval::EightHours => "8h",
            KlineInterval::TwelveHours => "12h",
            KlineInterval::OneDay => "1d",
            KlineInterval::ThreeDays => "3d",
            KlineInterval::OneWeek => "1w",
            KlineInterval::OneMonth => "1M",
        }
    }

    fn split(&self) -> (u32, IntervalUnit) {
        match self {
            KlineInterval::OneMinute => (1, IntervalUnit::Minute),
            KlineInterval::ThreeMinutes => (3, IntervalUnit::Minute),
            KlineInterval::FiveMinutes => (5, IntervalUnit::Minute),
            KlineInterval::FifteenMinutes => (15, IntervalUnit::Minute),
            KlineInterval::ThirtyMinutes => (30, IntervalUnit::Minute),
            KlineInterval::OneHour => (1, IntervalUnit::Hour),
            KlineInterval::TwoHours => (2, IntervalUnit::Hour),
            KlineInterval::FourHours => (4, IntervalUnit::Hour),
            KlineInterval::SixHours => (6, IntervalUnit::Hour),
            KlineInterval::EightHours => (8, IntervalUnit::Hour),
            KlineInterval::TwelveHours => (12, IntervalUnit::Hour),
            KlineInterval::OneDay => (1, IntervalUnit::Day),
            KlineInterval::ThreeDays => (3, IntervalUnit::Day),
            KlineInterval::OneWeek => (1, IntervalUnit::Week),
            KlineInterval::OneMonth => (1, IntervalUnit::Month),
        }
    }
}

impl fmt::Display for KlineInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KlineInterval {
    type Err = DatasetError;

    fn from_str(s: &str) -> Result<Self> {
        KlineInterval::ALL
            .iter()
            .find(|interval| interval.as_str() == s)
            .copied()
            .ok_or_else(|| DatasetError::InvalidInterval(s.to_string()))
    }
}

/// Anything that can hand back an ordered candle history
pub trait CandleSource {
    /// Returns the candles of `symbol` opened in `[start_time, end_time]`
    /// (epoch milliseconds), ordered by `open_time` ascending.
    fn fetch(
        &self,
        symbol: &str,
        interval: KlineInterval,
        start_time: i64,
        end_time: i64,
    ) -> Result<Vec<Candle>>;
}

/// Blocking client for the public kline endpoint of the exchange
pub struct BinanceClient {
    http: reqwest::blocking::Client,
    base_url: String,
    api_key: Option<String>,
}

impl BinanceClient {
    pub fn new(settings: &BinanceSettings) -> Result<Self> {
        let http = reqwest::blocking::Client::builder().build()?;
        Ok(Self {
            http,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
        })
    }

    fn fetch_page(
        &self,
        symbol: &str,
        interval: KlineInterval,
        start_time: i64,
        end_time: i64,
    ) -> Result<Vec<Candle>> {
        let url = format!("{}{}", self.base_url, BINANCE_KLINES_ENDPOINT);
        let mut request = self.http.get(&url).query(&[
            ("symbol", symbol.to_string()),
            ("interval", interval.to_string()),
            ("startTime", start_time.to_string()),
            ("endTime", end_time.to_string()),
            ("limit", KLINES_PAGE_LIMIT.to_string()),
        ]);
        if let Some(key) = &self.api_key {
            request = request.header(BINANCE_API_KEY_HEADER, key);
        }

        let response = request.send()?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(DatasetError::Fetch(format!("HTTP {}: {}", status, body)));
        }

        let rows: Vec<Vec<Value>> = response.json()?;
        rows.iter().map(|row| parse_kline(row)).collect()
    }
}

impl CandleSource for BinanceClient {
    fn fetch(
        &self,
        symbol: &str,
        interval: KlineInterval,
        start_time: i64,
        end_time: i64,
    ) -> Result<Vec<Candle>> {
        info!(
            "Downloading {} {} candles from {} to {}",
            symbol, interval, start_time, end_time
        );

        let mut candles: Vec<Candle> = Vec::new();
        let mut cursor = start_time;

        while cursor <= end_time {
            let page = self.fetch_page(symbol, interval, cursor, end_time)?;
            let Some(last) = page.last() else {
                break;
            };
            cursor = last.open_time + 1;
            let full_page = page.len() == KLINES_PAGE_LIMIT;
            debug!("Received {} candles, next start {}", page.len(), cursor);
            candles.extend(page);
            if !full_page {
                break;
            }
        }

        info!("Downloaded {} candles", candles.len());
        Ok(candles)
    }
}

/// Parses one kline array as returned by the exchange.
///
/// Prices and volumes arrive as strings, times and trade counts as integers.
pub fn parse_kline(row: &[Value]) -> Result<Candle> {
    if row.len() < 11 {
        return Err(DatasetError::Fetch(format!(
            "kline has {} fields, expected at least 11",
            row.len()
        )));
    }

    Ok(Candle {
        open_time: integer_field(&row[0], "open_time")?,
        open: float_field(&row[1], "open")?,
        high: float_field(&row[2], "high")?,
        low: float_field(&row[3], "low")?,
        close: float_field(&row[4], "close")?,
        volume: float_field(&row[5], "volume")?,
        close_time: integer_field(&row[6], "close_time")?,
        quote_asset_volume: float_field(&row[7], "quote_asset_volume")?,
        number_of_trades: integer_field(&row[8], "number_of_trades")?,
        taker_buy_base_asset_volume: float_field(&row[9], "taker_buy_base_asset_volume")?,
        taker_buy_quote_asset_volume: float_field(&row[10], "taker_buy_quote_asset_volume")?,
    })
}

fn float_field(value: &Value, name: &str) -> Result<f64> {
    let parsed = match value {
        Value::String(s) => s.parse::<f64>().ok(),
        Value::Number(n) => n.as_f64(),
        _ => None,
    };
    parsed.ok_or_else(|| DatasetError::Fetch(format!("bad {} field: {}", name, value)))
}

fn integer_field(value: &Value, name: &str) -> Result<i64> {
    let parsed = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse::<i64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| DatasetError::Fetch(format!("bad {} field: {}", name, value)))
}

/// Start timestamp (ms) for downloading the latest `number_candles` candles.
///
/// One extra interval unit is added because the most recent candle is never
/// complete.
pub fn calculate_start_time(
    interval: KlineInterval,
    number_candles: usize,
    now: DateTime<Utc>,
) -> Result<i64> {
    let (coefficient, unit) = interval.split();
    let num_units = coefficient as i64 * number_candles as i64 + 1;

    let start = match unit {
        IntervalUnit::Minute => now.checked_sub_signed(Duration::minutes(num_units)),
        IntervalUnit::Hour => now.checked_sub_signed(Duration::hours(num_units)),
        IntervalUnit::Day => now.checked_sub_signed(Duration::days(num_units)),
        IntervalUnit::Week => now.checked_sub_signed(Duration::weeks(num_units)),
        IntervalUnit::Month => u32::try_from(num_units)
            .ok()
            .and_then(|months| now.checked_sub_months(Months::new(months))),
    };

    start
        .map(|t| t.timestamp_millis())
        .ok_or_else(|| DatasetError::invalid("number_candles", number_candles, "time span overflows"))
}

/// Downloads the latest `number_candles` complete candles.
///
/// The still-open candle at the end of the range is dropped.
pub fn download_latest_candles(
    source: &dyn CandleSource,
    symbol: &str,
    interval: KlineInterval,
    number_candles: usize,
    now: DateTime<Utc>,
) -> Result<Vec<Candle>> {
    let start_time = calculate_start_time(interval, number_candles + 1, now)?;
    let mut candles = source.fetch(symbol, interval, start_time, now.timestamp_millis())?;
    candles.pop();
    Ok(candles)
}

/// Builds the candle frame. `close_time` is left out as it only restates `open_time`.
pub fn candles_to_dataframe(candles: &[Candle]) -> Result<DataFrame> {
    let df = df!(
        "open_time" => candles.iter().map(|c| c.open_time).collect::<Vec<i64>>(),
        "open" => candles.iter().map(|c| c.open).collect::<Vec<f64>>(),
        "high" => candles.iter().map(|c| c.high).collect::<Vec<f64>>(),
        "low" => candles.iter().map(|c| c.low).collect::<Vec<f64>>(),
        "close" => candles.iter().map(|c| c.close).collect::<Vec<f64>>(),
        "volume" => candles.iter().map(|c| c.volume).collect::<Vec<f64>>(),
        "quote_asset_volume" => candles.iter().map(|c| c.quote_asset_volume).collect::<Vec<f64>>(),
        "number_of_trades" => candles.iter().map(|c| c.number_of_trades).collect::<Vec<i64>>(),
        "taker_buy_base_asset_volume" => candles
            .iter()
            .map(|c| c.taker_buy_base_asset_volume)
            .collect::<Vec<f64>>(),
        "taker_buy_quote_asset_volume" => candles
            .iter()
            .map(|c| c.taker_buy_quote_asset_volume)
            .collect::<Vec<f64>>(),
    )?;
    Ok(df)
}

/// Raw candle frame including `close_time`, as written by the download command
pub fn candles_to_raw_dataframe(candles: &[Candle]) -> Result<DataFrame> {
    let mut df = candles_to_dataframe(candles)?;
    let close_time = Series::new(
        "close_time".into(),
        candles.iter().map(|c| c.close_time).collect::<Vec<i64>>(),
    );
    df.with_column(close_time)?;
    Ok(df.select(CANDLE_COLUMNS)?)
}

/// File name used for a raw download
pub fn candles_file_name(
    symbol: &str,
    number_candles: usize,
    interval: KlineInterval,
    start_time: i64,
) -> String {
    format!(
        "candles({},{},{},{}).csv",
        symbol, number_candles, interval, start_time
    )
}
