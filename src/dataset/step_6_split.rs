// External crates
use log::info;
use polars::prelude::*;

// Local modules
use crate::dataset::step_5_sliding_windows::WindowedDataset;
use crate::error::{DatasetError, Result};

/// Row boundaries `(train_end, val_end)` of a chronological split
///
/// The training part gets `floor(n * training_size)` rows, the validation part
/// `floor(n * validation_size)` and the test part whatever is left.
pub fn split_boundaries(
    n_samples: usize,
    training_size: f64,
    validation_size: f64,
) -> Result<(usize, usize)> {
    if !(0.0..=1.0).contains(&training_size) {
        return Err(DatasetError::invalid(
            "training_size",
            training_size,
            "must be between 0.0 and 1.0",
        ));
    }
    if !(0.0..=1.0).contains(&validation_size) {
        return Err(DatasetError::invalid(
            "validation_size",
            validation_size,
            "must be between 0.0 and 1.0",
        ));
    }
    if training_size + validation_size > 1.0 + 1e-9 {
        return Err(DatasetError::invalid(
            "validation_size",
            validation_size,
            "training and validation sizes add up to more than 1.0",
        ));
    }

    let train_end = (n_samples as f64 * training_size) as usize;
    let val_end = (train_end + (n_samples as f64 * validation_size) as usize).min(n_samples);
    Ok((train_end, val_end))
}

/// Splits the rows into training, validation and test sets, keeping time order
pub fn split_train_val_test(
    df: &DataFrame,
    training_size: f64,
    validation_size: f64,
) -> Result<(DataFrame, DataFrame, DataFrame)> {
    info!("Splitting the dataset into training, validation and test sets");

    let n_samples = df.height();
    let (train_end, val_end) = split_boundaries(n_samples, training_size, validation_size)?;

    let train_df = df.slice(0, train_end);
    let val_df = df.slice(train_end as i64, val_end - train_end);
    let test_df = df.slice(val_end as i64, n_samples - val_end);

    Ok((train_df, val_df, test_df))
}

impl WindowedDataset {
    /// Splits the windows into training, validation and test sets, keeping time order
    pub fn split_train_val_test(
        &self,
        training_size: f64,
        validation_size: f64,
    ) -> Result<(WindowedDataset, WindowedDataset, WindowedDataset)> {
        let n_samples = self.len();
        let (train_end, val_end) = split_boundaries(n_samples, training_size, validation_size)?;

        info!(
            "Split {} windows into {} training, {} validation and {} test",
            n_samples,
            train_end,
            val_end - train_end,
            n_samples - val_end
        );

        Ok((
            self.slice(0, train_end),
            self.slice(train_end, val_end),
            self.slice(val_end, n_samples),
        ))
    }
}
