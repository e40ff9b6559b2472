// External imports
use anyhow::Result;
use polars::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

// Local modules
use crate::dataset::step_1_candle_source::{Candle, CandleSource, KlineInterval};
use crate::error::Result as DatasetResult;

const ONE_MINUTE_MS: i64 = 60_000;

/// Generates `num_rows` one-minute candles following a seeded random walk
pub fn generate_test_candles(num_rows: usize, seed: u64) -> Vec<Candle> {
    let mut rng = StdRng::seed_from_u64(seed);
    let base_time = 1_700_000_000_000_i64;

    // Start with a base price around 30000
    let mut current_price: f64 = 30_000.0 + rng.random_range(0.0..1_000.0);
    let mut candles = Vec::with_capacity(num_rows);

    for i in 0..num_rows {
        // Random price movement between -1% and +1%
        let movement = rng.random_range(-0.01..0.01);
        let open = current_price;
        current_price *= 1.0 + movement;

        let high = current_price.max(open) * (1.0 + rng.random_range(0.0..0.005));
        let low = current_price.min(open) * (1.0 - rng.random_range(0.0..0.005));
        let volume = rng.random_range(10.0..1_000.0);
        let taker_share = rng.random_range(0.2..0.8);
        let open_time = base_time + i as i64 * ONE_MINUTE_MS;

        candles.push(Candle {
            open_time,
            open,
            high,
            low,
            close: current_price,
            volume,
            close_time: open_time + ONE_MINUTE_MS - 1,
            quote_asset_volume: volume * current_price,
            number_of_trades: rng.random_range(50..5_000),
            taker_buy_base_asset_volume: volume * taker_share,
            taker_buy_quote_asset_volume: volume * taker_share * current_price,
        });
    }

    candles
}

/// Generates a candle DataFrame with random data for testing
pub fn generate_test_dataframe(num_rows: usize, seed: u64) -> Result<DataFrame> {
    let candles = generate_test_candles(num_rows, seed);
    Ok(crate::dataset::step_1_candle_source::candles_to_dataframe(&candles)?)
}

/// Frame with only a `close` column
pub fn close_frame(close: &[f64]) -> Result<DataFrame> {
    Ok(df!("close" => close.to_vec())?)
}

/// Frame with a `close` feature and an explicit `up` column
pub fn labelled_frame(close: &[f64], up: &[f64]) -> Result<DataFrame> {
    Ok(df!(
        "close" => close.to_vec(),
        "up" => up.to_vec(),
    )?)
}

/// In-memory candle source returning the candles opened inside the requested range
pub struct FakeCandleSource {
    pub candles: Vec<Candle>,
}

impl CandleSource for FakeCandleSource {
    fn fetch(
        &self,
        _symbol: &str,
        _interval: KlineInterval,
        start_time: i64,
        end_time: i64,
    ) -> DatasetResult<Vec<Candle>> {
        Ok(self
            .candles
            .iter()
            .filter(|c| c.open_time >= start_time && c.open_time <= end_time)
            .cloned()
            .collect())
    }
}
