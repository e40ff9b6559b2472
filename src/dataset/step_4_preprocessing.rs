// External crates
use log::{debug, info};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// Local modules
use crate::error::{DatasetError, Result};
use crate::util::frame_utils::{column_names, column_to_f64, float_column, with_float_column};

/// Drops every row holding a null in any column or a `NaN` in a numeric column
pub fn drop_missing_rows(df: &DataFrame) -> Result<DataFrame> {
    let without_nulls = df.drop_nulls::<String>(None)?;

    let mut keep = vec![true; without_nulls.height()];
    for column in without_nulls.get_columns() {
        let values = match column_to_f64(column) {
            Ok(values) => values,
            Err(DatasetError::NonNumericColumn(_)) => continue,
            Err(e) => return Err(e),
        };
        for (row, value) in values.iter().enumerate() {
            if value.is_nan() {
                keep[row] = false;
            }
        }
    }

    let mask = Series::new("mask".into(), keep);
    let result = without_nulls.filter(mask.bool()?)?;
    info!(
        "Dropped {} rows with missing values, {} left",
        df.height() - result.height(),
        result.height()
    );
    Ok(result)
}

/// Values as a float array, `NaN` turned into nulls so that polars skips them
fn to_nullable(name: &str, values: &[f64]) -> Float64Chunked {
    Float64Chunked::from_iter_options(
        name.into(),
        values.iter().map(|v| if v.is_nan() { None } else { Some(*v) }),
    )
}

fn centred_window(window_size: usize) -> RollingOptionsFixedWindow {
    RollingOptionsFixedWindow {
        window_size,
        min_periods: window_size,
        center: true,
        ..Default::default()
    }
}

/// Median absolute deviation of one window, as a one-value series
fn window_mad(window: &Series) -> Series {
    let mad = window.f64().ok().and_then(|values| {
        let median = values.median()?;
        values.apply_values(|v| (v - median).abs()).median()
    });
    Series::new(window.name().clone(), vec![mad])
}

/// Hampel filter on one column.
///
/// Each value is compared with the median of the centred window around it;
/// when it deviates by more than `n_sigmas` times the window's median absolute
/// deviation it is replaced by that median. Rows whose window is incomplete
/// (edges, or a `NaN` inside) keep their value.
///
/// # Arguments
///
/// * `df` - Input DataFrame
/// * `column` - Column to filter
/// * `window_size` - Size of the centred window, odd
/// * `n_sigmas` - Threshold in units of the median absolute deviation
pub fn apply_hampel_filter(
    df: &DataFrame,
    column: &str,
    window_size: usize,
    n_sigmas: f64,
) -> Result<DataFrame> {
    info!("Applying Hampel filter to {}", column);

    if window_size % 2 == 0 {
        return Err(DatasetError::invalid("window_size", window_size, "must be odd"));
    }
    if n_sigmas.is_nan() || n_sigmas < 0.0 {
        return Err(DatasetError::invalid("n_sigmas", n_sigmas, "must be non-negative"));
    }

    let values = float_column(df, column)?;
    let series = to_nullable(column, &values).into_series();

    let medians = DataFrame::new(vec![series.clone().into_column()])?
        .lazy()
        .select([col(column).rolling_median(centred_window(window_size))])
        .collect()?;
    let medians = float_column(&medians, column)?;
    let mads = column_to_f64(
        &series
            .rolling_map(&window_mad, centred_window(window_size))?
            .into_column(),
    )?;

    let mut filtered = values.clone();
    let mut replaced = 0;
    for (i, value) in values.iter().enumerate() {
        // NaN thresholds never compare true, so incomplete windows are skipped
        if (value - medians[i]).abs() > n_sigmas * mads[i] {
            filtered[i] = medians[i];
            replaced += 1;
        }
    }

    debug!("Hampel filter replaced {} values in {}", replaced, column);
    with_float_column(df, column, filtered)
}

/// Savitzky-Golay smoothing coefficients for a centred window
fn savgol_coefficients(window_size: usize, polynomial_degree: usize) -> Result<Vec<f64>> {
    let half = (window_size / 2) as f64;
    let terms = polynomial_degree + 1;
    // Positions scaled to [-1, 1]
    let positions: Vec<f64> = (0..window_size)
        .map(|j| if half > 0.0 { (j as f64 - half) / half } else { 0.0 })
        .collect();

    // Normal equations (A^T A) x = e0
    let mut matrix = vec![vec![0.0; terms + 1]; terms];
    for (row, matrix_row) in matrix.iter_mut().enumerate() {
        for col in 0..terms {
            matrix_row[col] = positions.iter().map(|t| t.powi((row + col) as i32)).sum();
        }
        matrix_row[terms] = if row == 0 { 1.0 } else { 0.0 };
    }

    // Gaussian elimination with partial pivoting
    for pivot in 0..terms {
        let best = (pivot..terms)
            .max_by(|&a, &b| matrix[a][pivot].abs().total_cmp(&matrix[b][pivot].abs()))
            .unwrap_or(pivot);
        matrix.swap(pivot, best);
        let divisor = matrix[pivot][pivot];
        if divisor.abs() < f64::EPSILON {
            return Err(DatasetError::invalid(
                "polynomial_degree",
                polynomial_degree,
                "too high for the window size",
            ));
        }
        for col in pivot..=terms {
            matrix[pivot][col] /= divisor;
        }
        for row in 0..terms {
            if row != pivot {
                let factor = matrix[row][pivot];
                if factor != 0.0 {
                    for col in pivot..=terms {
                        let pivot_value = matrix[pivot][col];
                        matrix[row][col] -= factor * pivot_value;
                    }
                }
            }
        }
    }
    let solution: Vec<f64> = matrix.iter().map(|row| row[terms]).collect();

    Ok(positions
        .iter()
        .map(|t| {
            solution
                .iter()
                .enumerate()
                .map(|(k, x)| x * t.powi(k as i32))
                .sum()
        })
        .collect())
}

/// Savitzky-Golay smoothing of one column, padding the edges with the nearest value
pub fn apply_savgol_filter(
    df: &DataFrame,
    column: &str,
    window_size: usize,
    polynomial_degree: usize,
) -> Result<DataFrame> {
    info!("Applying Savitzky-Golay filter to {}", column);

    if window_size % 2 == 0 {
        return Err(DatasetError::invalid("window_size", window_size, "must be odd"));
    }
    if polynomial_degree >= window_size {
        return Err(DatasetError::invalid(
            "polynomial_degree",
            polynomial_degree,
            "must be less than the window size",
        ));
    }

    let values = float_column(df, column)?;
    let n = values.len();
    if n == 0 {
        return Ok(df.clone());
    }

    let coefficients = savgol_coefficients(window_size, polynomial_degree)?;
    let half = (window_size / 2) as isize;
    let last = n as isize - 1;

    let smoothed: Vec<f64> = (0..n as isize)
        .map(|i| {
            coefficients
                .iter()
                .enumerate()
                .map(|(j, c)| {
                    let index = (i + j as isize - half).clamp(0, last) as usize;
                    c * values[index]
                })
                .sum()
        })
        .collect();

    with_float_column(df, column, smoothed)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalingMethod {
    Standard,
    Robust,
}

/// Centre and scale applied to one column: `scaled = (value - center) / scale`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColumnScaling {
    pub center: f64,
    pub scale: f64,
}

/// Parameters fitted by a scaler, kept to undo the scaling later
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalerParams {
    pub method: ScalingMethod,
    pub columns: BTreeMap<String, ColumnScaling>,
}

impl ScalerParams {
    /// Maps a scaled value of `column` back to its original unit
    pub fn inverse_transform(&self, column: &str, value: f64) -> Option<f64> {
        self.columns
            .get(column)
            .map(|scaling| value * scaling.scale + scaling.center)
    }
}

fn fit_column(name: &str, values: &[f64], method: ScalingMethod) -> Result<ColumnScaling> {
    let values = to_nullable(name, values);

    let (center, spread) = match method {
        ScalingMethod::Standard => (values.mean(), values.std(0)),
        ScalingMethod::Robust => {
            let lower = values.quantile(0.25, QuantileMethod::Linear)?;
            let upper = values.quantile(0.75, QuantileMethod::Linear)?;
            let iqr = lower.zip(upper).map(|(lower, upper)| upper - lower);
            (values.median(), iqr)
        }
    };

    // Constant columns are only centred
    let scale = match spread {
        Some(spread) if spread.abs() >= f64::EPSILON && !spread.is_nan() => spread,
        _ => 1.0,
    };
    Ok(ColumnScaling {
        center: center.unwrap_or(0.0),
        scale,
    })
}

fn apply_scaler(
    df: &DataFrame,
    exclude_columns: &[&str],
    method: ScalingMethod,
) -> Result<(DataFrame, ScalerParams)> {
    let mut result = df.clone();
    let mut columns = BTreeMap::new();

    for name in column_names(df) {
        if exclude_columns.contains(&name.as_str()) {
            continue;
        }
        let values = match float_column(df, &name) {
            Ok(values) => values,
            Err(DatasetError::NonNumericColumn(_)) => continue,
            Err(e) => return Err(e),
        };

        let scaling = fit_column(&name, &values, method)?;
        let scaled: Vec<f64> = values
            .iter()
            .map(|v| (v - scaling.center) / scaling.scale)
            .collect();
        result.with_column(Series::new(name.as_str().into(), scaled))?;
        columns.insert(name, scaling);
    }

    debug!("Scaled {} columns with {:?} scaler", columns.len(), method);
    Ok((result, ScalerParams { method, columns }))
}

/// Standardizes every numeric column not excluded to zero mean and unit
/// (population) standard deviation
pub fn apply_standard_scaler(
    df: &DataFrame,
    exclude_columns: &[&str],
) -> Result<(DataFrame, ScalerParams)> {
    info!("Applying standard scaler");
    apply_scaler(df, exclude_columns, ScalingMethod::Standard)
}

/// Centres every numeric column not excluded on its median and divides by
/// its interquartile range
pub fn apply_robust_scaler(
    df: &DataFrame,
    exclude_columns: &[&str],
) -> Result<(DataFrame, ScalerParams)> {
    info!("Applying robust scaler");
    apply_scaler(df, exclude_columns, ScalingMethod::Robust)
}
