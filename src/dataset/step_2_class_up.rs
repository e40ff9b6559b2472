// External crates
use log::{debug, info};
use polars::prelude::*;
use std::path::Path;

// Local modules
use crate::constants::{CLOSE_COLUMN, UP_COLUMN};
use crate::error::{DatasetError, Result};
use crate::util::frame_utils::{float_column, with_float_column};

/// Adds the forward-looking class "up" to a copy of the dataset.
///
/// `up[i]` is `1.0` when any close price in
/// `[i + 1 + forecast_gap, i + 1 + forecast_gap + forecast_horizon)` strictly
/// exceeds `close[i] / (1 - fee / 100)^2`, the price that recovers a
/// percentage fee paid on both the buy and the sell. It is `0.0` when none
/// does, and `NaN` for the last `forecast_gap + forecast_horizon` rows, which
/// lack the future data to decide. A frame shorter than that is all `NaN`.
///
/// No rows are removed; use [`drop_unlabeled_rows`] for that. An existing
/// `up` column is overwritten.
///
/// # Arguments
///
/// * `df` - Candle frame with at least a `close` column
/// * `forecast_horizon` - Number of future rows scanned for a breakout, at least 1
/// * `trading_fee_percentage` - Fee charged on each trade, in `[0, 100)`
/// * `forecast_gap` - Rows skipped between the reference row and the horizon
pub fn add_class_up(
    df: &DataFrame,
    forecast_horizon: usize,
    trading_fee_percentage: f64,
    forecast_gap: usize,
) -> Result<DataFrame> {
    info!("Calculating the class 'up'");

    if forecast_horizon == 0 {
        return Err(DatasetError::invalid(
            "forecast_horizon",
            forecast_horizon,
            "must be a positive number of rows",
        ));
    }
    if !trading_fee_percentage.is_finite() || !(0.0..100.0).contains(&trading_fee_percentage) {
        return Err(DatasetError::invalid(
            "trading_fee_percentage",
            trading_fee_percentage,
            "must be a percentage in [0, 100)",
        ));
    }

    let close = float_column(df, CLOSE_COLUMN)?;
    let up = class_up_values(&close, forecast_horizon, trading_fee_percentage, forecast_gap);
    debug!(
        "Labelled {} of {} rows",
        up.iter().filter(|v| !v.is_nan()).count(),
        up.len()
    );

    with_float_column(df, UP_COLUMN, up)
}

/// Computes the "up" values for a close price series
pub fn class_up_values(
    close: &[f64],
    forecast_horizon: usize,
    trading_fee_percentage: f64,
    forecast_gap: usize,
) -> Vec<f64> {
    let lookahead = forecast_gap + forecast_horizon;
    let labelled_rows = close.len().saturating_sub(lookahead);
    let fee_factor = (1.0 - trading_fee_percentage / 100.0).powi(2);

    let mut up = Vec::with_capacity(close.len());
    for i in 0..labelled_rows {
        let profit_threshold = close[i] / fee_factor;
        let start = i + 1 + forecast_gap;
        let forecast_window = &close[start..start + forecast_horizon];
        let breakout = forecast_window.iter().any(|&price| price > profit_threshold);
        up.push(if breakout { 1.0 } else { 0.0 });
    }

    up.resize(close.len(), f64::NAN);
    up
}

/// Removes the rows whose "up" value could not be computed
pub fn drop_unlabeled_rows(df: &DataFrame) -> Result<DataFrame> {
    let up = float_column(df, UP_COLUMN)?;
    let keep: Vec<bool> = up.iter().map(|v| !v.is_nan()).collect();
    let mask = Series::new("mask".into(), keep);
    let result = df.filter(mask.bool()?)?;
    debug!("Dropped {} unlabelled rows", df.height() - result.height());
    Ok(result)
}

/// Output file name for a labelled dataset: `class(G+H,F)_<input name>`
pub fn class_up_file_name(
    input_path: &Path,
    forecast_gap: usize,
    forecast_horizon: usize,
    trading_fee_percentage: f64,
) -> String {
    let base_name = input_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!(
        "class({}+{},{})_{}",
        forecast_gap, forecast_horizon, trading_fee_percentage, base_name
    )
}
