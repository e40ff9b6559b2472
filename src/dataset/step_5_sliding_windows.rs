// External crates
use log::{info, warn};
use ndarray::{s, Array1, Array2, Array3, Axis};
use polars::prelude::*;
use std::path::Path;

// Local modules
use crate::constants::UP_COLUMN;
use crate::error::{DatasetError, Result};
use crate::util::frame_utils::{column_names, float_column};

/// One model input: `window_size` consecutive rows of features and the "up"
/// value of the last of them
#[derive(Debug, Clone, PartialEq)]
pub struct Window {
    /// Shape `(window_size, num_features)`
    pub values: Array2<f64>,
    pub label: f64,
}

/// Windows, their labels and the names of the feature columns
#[derive(Debug, Clone, PartialEq)]
pub struct WindowedDataset {
    /// Shape `(num_windows, window_size, num_features)`
    pub windows: Array3<f64>,
    /// Shape `(num_windows,)`, index-aligned with `windows`
    pub labels: Array1<f64>,
    /// Feature column names in window column order
    pub columns: Vec<String>,
}

impl WindowedDataset {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn window_size(&self) -> usize {
        self.windows.shape()[1]
    }

    pub fn num_features(&self) -> usize {
        self.windows.shape()[2]
    }

    /// Copy of the windows in `[start, end)`
    pub fn slice(&self, start: usize, end: usize) -> WindowedDataset {
        WindowedDataset {
            windows: self.windows.slice(s![start..end, .., ..]).to_owned(),
            labels: self.labels.slice(s![start..end]).to_owned(),
            columns: self.columns.clone(),
        }
    }

    /// Window `index` with its label
    pub fn get(&self, index: usize) -> Option<Window> {
        if index >= self.len() {
            return None;
        }
        Some(Window {
            values: self.windows.index_axis(Axis(0), index).to_owned(),
            label: self.labels[index],
        })
    }
}

/// Feature matrix and label vector pulled out of a labelled frame
struct LabelledMatrix {
    features: Array2<f64>,
    labels: Vec<f64>,
    columns: Vec<String>,
}

fn labelled_matrix(df: &DataFrame) -> Result<LabelledMatrix> {
    let labels = float_column(df, UP_COLUMN)?;
    let columns: Vec<String> = column_names(df)
        .into_iter()
        .filter(|name| name != UP_COLUMN)
        .collect();
    if columns.is_empty() {
        return Err(DatasetError::NoFeatureColumns);
    }

    let n_rows = df.height();
    let mut features = Array2::<f64>::zeros((n_rows, columns.len()));
    for (col_idx, name) in columns.iter().enumerate() {
        let values = float_column(df, name)?;
        for (row_idx, value) in values.into_iter().enumerate() {
            features[[row_idx, col_idx]] = value;
        }
    }

    Ok(LabelledMatrix {
        features,
        labels,
        columns,
    })
}

fn validate_window_params(window_size: usize, stride: usize) -> Result<()> {
    if window_size == 0 {
        return Err(DatasetError::invalid("window_size", window_size, "must be positive"));
    }
    if stride == 0 {
        return Err(DatasetError::invalid("stride", stride, "must be positive"));
    }
    Ok(())
}

/// Number of full windows that fit in `n_rows`
pub fn window_count(n_rows: usize, window_size: usize, stride: usize) -> usize {
    if window_size == 0 || stride == 0 || n_rows < window_size {
        0
    } else {
        (n_rows - window_size) / stride + 1
    }
}

/// Lazily produced windows, in start-index order
pub struct SlidingWindows {
    matrix: LabelledMatrix,
    window_size: usize,
    stride: usize,
    next_start: usize,
}

impl SlidingWindows {
    /// Prepares the windows of `df` without materializing them
    pub fn new(df: &DataFrame, window_size: usize, stride: usize) -> Result<Self> {
        validate_window_params(window_size, stride)?;
        Ok(Self {
            matrix: labelled_matrix(df)?,
            window_size,
            stride,
            next_start: 0,
        })
    }

    /// Feature column names, `up` excluded
    pub fn columns(&self) -> &[String] {
        &self.matrix.columns
    }

    pub fn num_features(&self) -> usize {
        self.matrix.columns.len()
    }
}

impl Iterator for SlidingWindows {
    type Item = Window;

    fn next(&mut self) -> Option<Window> {
        let start = self.next_start;
        let end = start + self.window_size;
        if end > self.matrix.labels.len() {
            return None;
        }
        self.next_start += self.stride;

        Some(Window {
            values: self.matrix.features.slice(s![start..end, ..]).to_owned(),
            label: self.matrix.labels[end - 1],
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n_rows = self.matrix.labels.len();
        let remaining = if self.next_start + self.window_size > n_rows {
            0
        } else {
            (n_rows - self.next_start - self.window_size) / self.stride + 1
        };
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for SlidingWindows {}

/// Transforms a dataset with class "up" into sliding windows.
///
/// Windows start at rows `0, stride, 2 * stride, ...` as long as a full
/// window fits; each holds every column except `up`, and is paired with the
/// `up` value of its last row. Overlapping windows (`stride < window_size`)
/// are all kept. A frame shorter than `window_size` yields an empty dataset.
///
/// # Arguments
///
/// * `df` - Labelled frame with an `up` column and at least one feature column
/// * `window_size` - Rows per window
/// * `stride` - Rows between consecutive window starts
pub fn transform_into_sliding_windows(
    df: &DataFrame,
    window_size: usize,
    stride: usize,
) -> Result<WindowedDataset> {
    info!("Transforming the dataset into sliding windows");

    let windows = SlidingWindows::new(df, window_size, stride)?;
    let columns = windows.columns().to_vec();
    let num_features = windows.num_features();
    let num_windows = windows.len();

    let mut data = Array3::<f64>::zeros((num_windows, window_size, num_features));
    let mut labels = Array1::<f64>::zeros(num_windows);
    for (index, window) in windows.enumerate() {
        data.index_axis_mut(Axis(0), index).assign(&window.values);
        labels[index] = window.label;
    }

    if num_windows == 0 {
        warn!(
            "{} rows are not enough for a window of {} rows",
            df.height(),
            window_size
        );
    } else {
        info!(
            "Created {} windows of shape ({}, {})",
            num_windows, window_size, num_features
        );
    }

    Ok(WindowedDataset {
        windows: data,
        labels,
        columns,
    })
}

/// Output file name for a windowed dataset: `windows(W,S)_<input stem>.bin`
pub fn windows_file_name(input_path: &Path, window_size: usize, stride: usize) -> String {
    let stem = input_path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("windows({},{})_{}.bin", window_size, stride, stem)
}
