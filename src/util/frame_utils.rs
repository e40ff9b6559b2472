// External crates
use polars::prelude::*;

// Local modules
use crate::error::{DatasetError, Result};

/// Resolves a column by name and returns its values as `f64`.
///
/// Integer columns are cast, nulls become `NaN`. A missing column is reported
/// as [`DatasetError::MissingColumn`]; a column that cannot be cast (strings,
/// for instance) as [`DatasetError::NonNumericColumn`].
pub fn float_column(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let column = df
        .column(name)
        .map_err(|_| DatasetError::MissingColumn(name.to_string()))?;
    column_to_f64(column)
}

/// Same as [`float_column`] for a column already in hand
pub fn column_to_f64(column: &Column) -> Result<Vec<f64>> {
    let name = column.name().to_string();
    let castable = matches!(
        column.dtype(),
        DataType::Float64
            | DataType::Float32
            | DataType::Int64
            | DataType::Int32
            | DataType::UInt64
            | DataType::UInt32
            | DataType::Boolean
    );
    if !castable {
        return Err(DatasetError::NonNumericColumn(name));
    }
    let casted = column
        .cast(&DataType::Float64)
        .map_err(|_| DatasetError::NonNumericColumn(name.clone()))?;
    let values = casted
        .f64()
        .map_err(|_| DatasetError::NonNumericColumn(name))?
        .iter()
        .map(|v| v.unwrap_or(f64::NAN))
        .collect();
    Ok(values)
}

/// Returns a copy of `df` with `name` set to `values`, appended if absent
pub fn with_float_column(df: &DataFrame, name: &str, values: Vec<f64>) -> Result<DataFrame> {
    let mut result = df.clone();
    result.with_column(Series::new(name.into(), values))?;
    Ok(result)
}

/// Counts null and `NaN` cells in the given columns
pub fn check_for_nans(df: &DataFrame, columns: &[&str]) -> Result<usize> {
    let mut nan_count = 0;

    for &col in columns {
        let values = float_column(df, col)?;
        nan_count += values.iter().filter(|v| v.is_nan()).count();
    }

    Ok(nan_count)
}

/// Names of all columns, in frame order
pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect()
}
