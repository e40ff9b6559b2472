// External crates
use log::{debug, info};
use polars::prelude::*;
use rustalib::indicators::{moving_averages, oscillators};

// Local modules
use crate::constants::CLOSE_COLUMN;
use crate::error::Result;
use crate::util::frame_utils::{column_to_f64, float_column};

// Indicators keep the row count of their input and are NaN wherever the
// lookback is not yet filled.

fn trailing_window(window_size: usize) -> RollingOptionsFixedWindow {
    RollingOptionsFixedWindow {
        window_size,
        min_periods: window_size,
        ..Default::default()
    }
}

/// Runs a polars fixed-window aggregation over `values`; a window holding a
/// NaN yields NaN
fn rolling(
    values: &[f64],
    window: usize,
    aggregate: impl Fn(&Series, RollingOptionsFixedWindow) -> PolarsResult<Series>,
) -> Result<Vec<f64>> {
    if window == 0 {
        return Ok(vec![f64::NAN; values.len()]);
    }
    let series = Series::new("values".into(), values);
    let rolled = aggregate(&series, trailing_window(window))?;
    column_to_f64(&rolled.into_column())
}

/// Rolling mean over a full window
pub fn rolling_mean(values: &[f64], window: usize) -> Result<Vec<f64>> {
    rolling(values, window, |s, options| s.rolling_mean(options))
}

/// Rolling population standard deviation
fn rolling_std(values: &[f64], window: usize) -> Result<Vec<f64>> {
    rolling(values, window, |s, mut options| {
        options.fn_params = Some(RollingFnParams::Var(RollingVarParams { ddof: 0 }));
        s.rolling_std(options)
    })
}

fn rolling_sum(values: &[f64], window: usize) -> Result<Vec<f64>> {
    rolling(values, window, |s, options| s.rolling_sum(options))
}

fn rolling_max(values: &[f64], window: usize) -> Result<Vec<f64>> {
    rolling(values, window, |s, options| s.rolling_max(options))
}

fn rolling_min(values: &[f64], window: usize) -> Result<Vec<f64>> {
    rolling(values, window, |s, options| s.rolling_min(options))
}

/// Float copy of the close column, the input shape rustalib expects
fn close_frame(df: &DataFrame) -> Result<DataFrame> {
    let close = float_column(df, CLOSE_COLUMN)?;
    Ok(DataFrame::new(vec![
        Series::new(CLOSE_COLUMN.into(), close).into_column()
    ])?)
}

/// Pads a rustalib output with NaN at the front up to `height` rows
fn pad_front(series: &Series, height: usize) -> Result<Vec<f64>> {
    let values = column_to_f64(&series.clone().into_column())?;
    let mut padded = vec![f64::NAN; height.saturating_sub(values.len())];
    padded.extend(values);
    Ok(padded)
}

/// Exponential moving average computed by rustalib. Leading NaNs (from a
/// previous indicator) are skipped, so an EMA of an EMA starts once its input
/// is defined.
pub fn ema(values: &[f64], period: usize) -> Result<Vec<f64>> {
    let n = values.len();
    let Some(first) = values.iter().position(|v| !v.is_nan()) else {
        return Ok(vec![f64::NAN; n]);
    };
    if period == 0 || n - first < period {
        return Ok(vec![f64::NAN; n]);
    }

    let frame = DataFrame::new(vec![
        Series::new(CLOSE_COLUMN.into(), &values[first..]).into_column()
    ])?;
    let ema = moving_averages::calculate_ema(&frame, CLOSE_COLUMN, period)?;
    pad_front(&ema, n)
}

fn shift(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    (0..n)
        .map(|i| if i >= period { values[i - period] } else { f64::NAN })
        .collect()
}

/// Simple Moving Average of `column`
pub fn calculate_sma(df: &DataFrame, column: &str, period: usize) -> Result<Series> {
    let values = float_column(df, column)?;
    let sma = rolling_mean(&values, period)?;
    Ok(Series::new(format!("sma_{}", period).into(), sma))
}

/// Volume Adjusted Moving Average
pub fn calculate_vama(df: &DataFrame, period: usize) -> Result<Series> {
    let close = float_column(df, CLOSE_COLUMN)?;
    let volume = float_column(df, "volume")?;
    let volume_price: Vec<f64> = close.iter().zip(&volume).map(|(c, v)| c * v).collect();

    let weighted = rolling_sum(&volume_price, period)?;
    let total_volume = rolling_sum(&volume, period)?;
    let vama: Vec<f64> = weighted
        .iter()
        .zip(&total_volume)
        .map(|(w, v)| w / v)
        .collect();
    Ok(Series::new(format!("vama_{}", period).into(), vama))
}

/// Exponential Moving Average of the close price
pub fn calculate_ema(df: &DataFrame, period: usize) -> Result<Series> {
    let close = float_column(df, CLOSE_COLUMN)?;
    Ok(Series::new(format!("ema_{}", period).into(), ema(&close, period)?))
}

/// Double Exponential Moving Average
pub fn calculate_dema(df: &DataFrame, period: usize) -> Result<Series> {
    let close = float_column(df, CLOSE_COLUMN)?;
    let ema1 = ema(&close, period)?;
    let ema2 = ema(&ema1, period)?;
    let dema: Vec<f64> = ema1.iter().zip(&ema2).map(|(e1, e2)| 2.0 * e1 - e2).collect();
    Ok(Series::new(format!("dema_{}", period).into(), dema))
}

/// Triple Exponential Moving Average
pub fn calculate_tema(df: &DataFrame, period: usize) -> Result<Series> {
    let close = float_column(df, CLOSE_COLUMN)?;
    let ema1 = ema(&close, period)?;
    let ema2 = ema(&ema1, period)?;
    let ema3 = ema(&ema2, period)?;
    let tema: Vec<f64> = (0..close.len())
        .map(|i| 3.0 * ema1[i] - 3.0 * ema2[i] + ema3[i])
        .collect();
    Ok(Series::new(format!("tema_{}", period).into(), tema))
}

/// Momentum: close minus the close `period` rows earlier
pub fn calculate_mom(df: &DataFrame, period: usize) -> Result<Series> {
    let close = float_column(df, CLOSE_COLUMN)?;
    let previous = shift(&close, period);
    let mom: Vec<f64> = close.iter().zip(&previous).map(|(c, p)| c - p).collect();
    Ok(Series::new(format!("mom_{}", period).into(), mom))
}

/// Moving Average Convergence Divergence line and its signal line, from rustalib
pub fn calculate_macd(
    df: &DataFrame,
    fast_period: usize,
    slow_period: usize,
    signal_period: usize,
) -> Result<(Series, Series)> {
    let name = format!("macd_{}_{}_{}", fast_period, slow_period, signal_period);
    let signal_name = format!("{}_signal", name);
    let height = df.height();

    if fast_period == 0
        || slow_period == 0
        || signal_period == 0
        || height < slow_period.max(fast_period)
    {
        let undefined = vec![f64::NAN; height];
        return Ok((
            Series::new(name.into(), undefined.clone()),
            Series::new(signal_name.into(), undefined),
        ));
    }

    let (macd, signal) = oscillators::calculate_macd(
        &close_frame(df)?,
        fast_period,
        slow_period,
        signal_period,
        CLOSE_COLUMN,
    )?;
    Ok((
        Series::new(name.into(), pad_front(&macd, height)?),
        Series::new(signal_name.into(), pad_front(&signal, height)?),
    ))
}

/// %B: position of the close inside its Bollinger Bands, in percent
pub fn calculate_percent_b(
    df: &DataFrame,
    period: usize,
    stddev_upper: f64,
    stddev_lower: f64,
) -> Result<Series> {
    let close = float_column(df, CLOSE_COLUMN)?;
    let mean = rolling_mean(&close, period)?;
    let std = rolling_std(&close, period)?;

    let percent_b: Vec<f64> = (0..close.len())
        .map(|i| {
            let upper = mean[i] + stddev_upper * std[i];
            let lower = mean[i] - stddev_lower * std[i];
            (close[i] - lower) / (upper - lower) * 100.0
        })
        .collect();

    Ok(Series::new(
        format!("percent_b_{}_{}_{}", period, stddev_upper, stddev_lower).into(),
        percent_b,
    ))
}

/// Chaikin A/D oscillator: EMA(3) minus EMA(10) of the accumulation/distribution line
pub fn calculate_chaikin_oscillator(df: &DataFrame) -> Result<Series> {
    let high = float_column(df, "high")?;
    let low = float_column(df, "low")?;
    let close = float_column(df, CLOSE_COLUMN)?;
    let volume = float_column(df, "volume")?;

    let mut ad_line = Vec::with_capacity(close.len());
    let mut ad = 0.0;
    for i in 0..close.len() {
        let range = high[i] - low[i];
        if range > 0.0 {
            ad += ((close[i] - low[i]) - (high[i] - close[i])) / range * volume[i];
        }
        ad_line.push(ad);
    }

    let fast = ema(&ad_line, 3)?;
    let slow = ema(&ad_line, 10)?;
    let oscillator: Vec<f64> = fast.iter().zip(&slow).map(|(f, s)| f - s).collect();
    Ok(Series::new("chaikin_oscillator".into(), oscillator))
}

/// Rate of change in percent
pub fn calculate_roc(df: &DataFrame, period: usize) -> Result<Series> {
    let close = float_column(df, CLOSE_COLUMN)?;
    let previous = shift(&close, period);
    let roc: Vec<f64> = close
        .iter()
        .zip(&previous)
        .map(|(c, p)| (c / p - 1.0) * 100.0)
        .collect();
    Ok(Series::new(format!("roc_{}", period).into(), roc))
}

fn fast_stochastic(high: &[f64], low: &[f64], close: &[f64], period: usize) -> Result<Vec<f64>> {
    let highest = rolling_max(high, period)?;
    let lowest = rolling_min(low, period)?;
    Ok((0..close.len())
        .map(|i| {
            let range = highest[i] - lowest[i];
            if range.is_nan() {
                f64::NAN
            } else if range == 0.0 {
                0.0
            } else {
                (close[i] - lowest[i]) / range * 100.0
            }
        })
        .collect())
}

/// Slow stochastic %K, smoothing with simple moving averages
pub fn calculate_stochastic(df: &DataFrame, fastk_period: usize, slowk_period: usize) -> Result<Series> {
    let high = float_column(df, "high")?;
    let low = float_column(df, "low")?;
    let close = float_column(df, CLOSE_COLUMN)?;

    let fast_k = fast_stochastic(&high, &low, &close, fastk_period)?;
    let slow_k = rolling_mean(&fast_k, slowk_period)?;

    Ok(Series::new(
        format!("so_{}_{}", fastk_period, slowk_period).into(),
        slow_k,
    ))
}

/// One-period rate of change of a triple-smoothed EMA, in percent
pub fn calculate_trix(df: &DataFrame, period: usize) -> Result<Series> {
    let close = float_column(df, CLOSE_COLUMN)?;
    let triple = ema(&ema(&ema(&close, period)?, period)?, period)?;
    let previous = shift(&triple, 1);
    let trix: Vec<f64> = triple
        .iter()
        .zip(&previous)
        .map(|(t, p)| (t / p - 1.0) * 100.0)
        .collect();
    Ok(Series::new(format!("trix_{}", period).into(), trix))
}

/// Relative Strength Index computed by rustalib
pub fn calculate_rsi(df: &DataFrame, period: usize) -> Result<Series> {
    let name = format!("rsi_{}", period);
    let height = df.height();
    if period == 0 || height <= period {
        return Ok(Series::new(name.into(), vec![f64::NAN; height]));
    }

    let rsi = oscillators::calculate_rsi(&close_frame(df)?, period, CLOSE_COLUMN)?;
    Ok(Series::new(name.into(), pad_front(&rsi, height)?))
}

/// Williams %R, between -100 and 0
pub fn calculate_williams_percent_r(df: &DataFrame, period: usize) -> Result<Series> {
    let high = float_column(df, "high")?;
    let low = float_column(df, "low")?;
    let close = float_column(df, CLOSE_COLUMN)?;

    let highest = rolling_max(&high, period)?;
    let lowest = rolling_min(&low, period)?;
    let willr: Vec<f64> = (0..close.len())
        .map(|i| {
            let range = highest[i] - lowest[i];
            if range.is_nan() {
                f64::NAN
            } else if range == 0.0 {
                0.0
            } else {
                (highest[i] - close[i]) / range * -100.0
            }
        })
        .collect();
    Ok(Series::new(format!("williams_percent_r_{}", period).into(), willr))
}

/// `column` shifted forward by `period` rows
pub fn calculate_lagged_values(df: &DataFrame, column: &str, period: usize) -> Result<Series> {
    let values = float_column(df, column)?;
    Ok(Series::new(
        format!("{}_lagged_{}", column, period).into(),
        shift(&values, period),
    ))
}

/// Appends the given indicator columns, replacing any column with the same name
pub fn add_features(df: &DataFrame, features: Vec<Series>) -> Result<DataFrame> {
    let mut result = df.clone();
    for feature in features {
        result.with_column(feature)?;
    }
    Ok(result)
}

/// Adds the default indicator set used to build datasets
pub fn add_new_features(df: &DataFrame) -> Result<DataFrame> {
    info!("Adding technical indicators");

    let (macd, _signal) = calculate_macd(df, 12, 26, 9)?;
    let features = vec![
        // Moving averages
        calculate_sma(df, CLOSE_COLUMN, 5)?,
        calculate_sma(df, CLOSE_COLUMN, 10)?,
        calculate_vama(df, 9)?,
        calculate_tema(df, 9)?,
        calculate_ema(df, 9)?,
        calculate_dema(df, 9)?,
        // Momentum and oscillators
        calculate_mom(df, 10)?,
        macd,
        calculate_percent_b(df, 5, 2.0, 2.0)?,
        calculate_chaikin_oscillator(df)?,
        calculate_roc(df, 10)?,
        calculate_stochastic(df, 5, 3)?,
        calculate_trix(df, 30)?,
        calculate_rsi(df, 14)?,
        calculate_williams_percent_r(df, 14)?,
        // Lagged values
        calculate_lagged_values(df, CLOSE_COLUMN, 1)?,
        calculate_lagged_values(df, CLOSE_COLUMN, 2)?,
        calculate_lagged_values(df, CLOSE_COLUMN, 3)?,
    ];

    let result = add_features(df, features)?;
    debug!("Columns after adding features: {:?}", result.get_column_names());
    Ok(result)
}
