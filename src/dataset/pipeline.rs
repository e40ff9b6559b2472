//! End-to-end dataset creation: candles in, split windowed datasets out.

// External crates
use log::info;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// Local modules
use crate::constants::{
    CLOSE_COLUMN, DEFAULT_FORECAST_GAP, DEFAULT_STRIDE, DEFAULT_WINDOW_SIZE, HAMPEL_N_SIGMAS,
    HAMPEL_WINDOW_SIZE, SAVGOL_POLYNOMIAL_DEGREE, SAVGOL_WINDOW_SIZE, TRAINING_SPLIT_RATIO,
    UP_COLUMN, VALIDATION_SPLIT_RATIO,
};
use crate::dataset::step_1_candle_source::{candles_to_dataframe, CandleSource, KlineInterval};
use crate::dataset::step_2_class_up::add_class_up;
use crate::dataset::step_3_feature_creation::add_new_features;
use crate::dataset::step_4_preprocessing::{
    apply_hampel_filter, apply_robust_scaler, apply_savgol_filter, apply_standard_scaler,
    drop_missing_rows, ScalerParams,
};
use crate::dataset::step_5_sliding_windows::{transform_into_sliding_windows, WindowedDataset};
use crate::dataset::step_7_persistence::{write_scaler_params, write_windowed_dataset};
use crate::error::Result;

/// Parameters of one dataset build
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetConfig {
    pub forecast_horizon: usize,
    pub forecast_gap: usize,
    pub trading_fee_percentage: f64,
    pub window_size: usize,
    pub stride: usize,
    pub training_size: f64,
    pub validation_size: f64,
    pub hampel_window_size: usize,
    pub hampel_n_sigmas: f64,
    pub savgol_window_size: usize,
    pub savgol_polynomial_degree: usize,
}

impl DatasetConfig {
    pub fn new(forecast_horizon: usize, trading_fee_percentage: f64) -> Self {
        Self {
            forecast_horizon,
            forecast_gap: DEFAULT_FORECAST_GAP,
            trading_fee_percentage,
            window_size: DEFAULT_WINDOW_SIZE,
            stride: DEFAULT_STRIDE,
            training_size: TRAINING_SPLIT_RATIO,
            validation_size: VALIDATION_SPLIT_RATIO,
            hampel_window_size: HAMPEL_WINDOW_SIZE,
            hampel_n_sigmas: HAMPEL_N_SIGMAS,
            savgol_window_size: SAVGOL_WINDOW_SIZE,
            savgol_polynomial_degree: SAVGOL_POLYNOMIAL_DEGREE,
        }
    }
}

/// Train/validation/test windows of one build and the scalers fitted on the way
#[derive(Debug, Clone)]
pub struct SplitDataset {
    pub train: WindowedDataset,
    pub validation: WindowedDataset,
    pub test: WindowedDataset,
    pub scalers: Vec<ScalerParams>,
}

/// Labels, augments, cleans and scales a candle frame.
///
/// Rows without a label or with an undefined indicator are dropped before the
/// filters run, so the result has no missing values.
pub fn prepare_features(df: &DataFrame, config: &DatasetConfig) -> Result<(DataFrame, Vec<ScalerParams>)> {
    let labelled = add_class_up(
        df,
        config.forecast_horizon,
        config.trading_fee_percentage,
        config.forecast_gap,
    )?;
    let augmented = add_new_features(&labelled)?;
    let complete = drop_missing_rows(&augmented)?;

    let filtered = apply_hampel_filter(
        &complete,
        CLOSE_COLUMN,
        config.hampel_window_size,
        config.hampel_n_sigmas,
    )?;
    let smoothed = apply_savgol_filter(
        &filtered,
        CLOSE_COLUMN,
        config.savgol_window_size,
        config.savgol_polynomial_degree,
    )?;

    let (standardized, standard_params) = apply_standard_scaler(&smoothed, &[UP_COLUMN])?;
    let (scaled, robust_params) = apply_robust_scaler(&standardized, &[UP_COLUMN])?;

    Ok((scaled, vec![standard_params, robust_params]))
}

/// Runs the whole pipeline on an already downloaded candle frame
pub fn build_dataset(df: &DataFrame, config: &DatasetConfig) -> Result<SplitDataset> {
    let (prepared, scalers) = prepare_features(df, config)?;
    let windows = transform_into_sliding_windows(&prepared, config.window_size, config.stride)?;
    let (train, validation, test) =
        windows.split_train_val_test(config.training_size, config.validation_size)?;

    Ok(SplitDataset {
        train,
        validation,
        test,
        scalers,
    })
}

/// Downloads candles and builds one dataset per forecast horizon in `horizons`.
///
/// Returns the directory written for each horizon, holding `train.bin`,
/// `validation.bin`, `test.bin` and `scalers.json`.
#[allow(clippy::too_many_arguments)]
pub fn create_dataset(
    source: &dyn CandleSource,
    symbol: &str,
    interval: KlineInterval,
    start_time: i64,
    end_time: i64,
    horizons: &[usize],
    base_config: &DatasetConfig,
    output_directory: &Path,
) -> Result<Vec<PathBuf>> {
    info!("Creating datasets for {} {}", symbol, interval);

    let candles = source.fetch(symbol, interval, start_time, end_time)?;
    let df = candles_to_dataframe(&candles)?;

    let mut written = Vec::with_capacity(horizons.len());
    for &forecast_horizon in horizons {
        let config = DatasetConfig {
            forecast_horizon,
            ..base_config.clone()
        };
        let dataset = build_dataset(&df, &config)?;

        let directory = output_directory.join(dataset_directory_name(symbol, interval, &config));
        write_windowed_dataset(&dataset.train, directory.join("train.bin"))?;
        write_windowed_dataset(&dataset.validation, directory.join("validation.bin"))?;
        write_windowed_dataset(&dataset.test, directory.join("test.bin"))?;
        write_scaler_params(&dataset.scalers, directory.join("scalers.json"))?;

        info!("Dataset for horizon {} written to {}", forecast_horizon, directory.display());
        written.push(directory);
    }

    Ok(written)
}

/// Directory name of one build, encoding the parameters that shape it
pub fn dataset_directory_name(symbol: &str, interval: KlineInterval, config: &DatasetConfig) -> String {
    format!(
        "dataset({},{},{}+{},{},{},{})",
        symbol,
        interval,
        config.forecast_gap,
        config.forecast_horizon,
        config.trading_fee_percentage,
        config.window_size,
        config.stride
    )
}
