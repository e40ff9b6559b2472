// External crates
use log::{debug, info};
use polars::prelude::*;
use std::fs::{self, File};
use std::path::Path;

// Local modules
use crate::error::Result;

/// Reads a CSV file with a header row into a DataFrame with standardized column names
///
/// Column names are lower-cased and common abbreviations of the OHLCV fields
/// are mapped onto their canonical names, so files written by other tools can
/// be fed to the pipeline unchanged.
///
/// # Arguments
///
/// * `file_path` - Path to the CSV file
///
/// # Returns
///
/// Returns the DataFrame in file row order
pub fn read_csv<P: AsRef<Path>>(file_path: P) -> Result<DataFrame> {
    let path = file_path.as_ref();
    info!("Loading data from: {}", path.display());

    let mut df = CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;

    let mut renames = Vec::new();
    for column_name in df.get_column_names() {
        let lower = column_name.to_lowercase();
        let standard_name = match lower.as_str() {
            "o" | "op" | "openprice" | "open_price" => "open",
            "h" | "highprice" | "high_price" => "high",
            "l" | "lowprice" | "low_price" => "low",
            "c" | "cl" | "closeprice" | "close_price" => "close",
            "vol" | "v" | "volumes" => "volume",
            other => other,
        };
        if column_name.as_str() != standard_name {
            renames.push((column_name.to_string(), standard_name.to_string()));
        }
    }

    if !renames.is_empty() {
        debug!("Renaming columns: {:?}", renames);
        for (old_name, new_name) in renames {
            df.rename(&old_name, new_name.into())?;
        }
    }

    Ok(df)
}

/// Writes a DataFrame to CSV with a header row, creating parent directories
pub fn write_csv<P: AsRef<Path>>(df: &DataFrame, file_path: P) -> Result<()> {
    let path = file_path.as_ref();
    ensure_parent_dir(path)?;

    let mut file = File::create(path)?;
    let mut df = df.clone();
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(&mut df)?;

    info!("Wrote {} rows to {}", df.height(), path.display());
    Ok(())
}

pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
