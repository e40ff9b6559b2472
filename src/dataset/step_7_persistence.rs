// External crates
use bincode::{Decode, Encode};
use log::info;
use ndarray::{Array1, Array3};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

// Local modules
use crate::constants::{
    ARCHIVE_FORMAT_VERSION, COLUMNS_ATTRIBUTE, LABELS_ARRAY_NAME, WINDOWS_ARRAY_NAME,
};
use crate::dataset::step_4_preprocessing::ScalerParams;
use crate::dataset::step_5_sliding_windows::WindowedDataset;
use crate::error::{DatasetError, Result};
use crate::util::file_utils::ensure_parent_dir;

/// A named, row-major `f64` array with string-list attributes
#[derive(Debug, Clone, PartialEq, Encode, Decode)]
pub struct NamedArray {
    pub name: String,
    pub shape: Vec<u64>,
    pub data: Vec<f64>,
    pub attributes: BTreeMap<String, Vec<String>>,
}

/// Binary container of named arrays
#[derive(Debug, Clone, PartialEq, Encode, Decode)]
pub struct ArrayArchive {
    pub format_version: u32,
    pub arrays: Vec<NamedArray>,
}

impl ArrayArchive {
    pub fn get(&self, name: &str) -> Option<&NamedArray> {
        self.arrays.iter().find(|array| array.name == name)
    }

    fn require(&self, name: &str) -> Result<&NamedArray> {
        self.get(name)
            .ok_or_else(|| DatasetError::InvalidArchive(format!("array '{}' is missing", name)))
    }

    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        ensure_parent_dir(path)?;
        let mut writer = BufWriter::new(File::create(path)?);
        bincode::encode_into_std_write(self, &mut writer, bincode::config::standard())?;
        writer.flush()?;
        Ok(())
    }

    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut reader = BufReader::new(File::open(path.as_ref())?);
        let archive: ArrayArchive =
            bincode::decode_from_std_read(&mut reader, bincode::config::standard())?;
        if archive.format_version != ARCHIVE_FORMAT_VERSION {
            return Err(DatasetError::InvalidArchive(format!(
                "unsupported format version {}",
                archive.format_version
            )));
        }
        Ok(archive)
    }
}

impl From<&WindowedDataset> for ArrayArchive {
    fn from(dataset: &WindowedDataset) -> Self {
        let windows = NamedArray {
            name: WINDOWS_ARRAY_NAME.to_string(),
            shape: dataset.windows.shape().iter().map(|&d| d as u64).collect(),
            data: dataset.windows.iter().copied().collect(),
            attributes: BTreeMap::from([(COLUMNS_ATTRIBUTE.to_string(), dataset.columns.clone())]),
        };
        let labels = NamedArray {
            name: LABELS_ARRAY_NAME.to_string(),
            shape: vec![dataset.labels.len() as u64],
            data: dataset.labels.to_vec(),
            attributes: BTreeMap::new(),
        };
        ArrayArchive {
            format_version: ARCHIVE_FORMAT_VERSION,
            arrays: vec![windows, labels],
        }
    }
}

impl TryFrom<&ArrayArchive> for WindowedDataset {
    type Error = DatasetError;

    fn try_from(archive: &ArrayArchive) -> Result<Self> {
        let windows = archive.require(WINDOWS_ARRAY_NAME)?;
        let labels = archive.require(LABELS_ARRAY_NAME)?;

        let shape: Vec<usize> = windows.shape.iter().map(|&d| d as usize).collect();
        let &[num_windows, window_size, num_features] = shape.as_slice() else {
            return Err(DatasetError::InvalidArchive(format!(
                "windows array has {} dimensions, expected 3",
                shape.len()
            )));
        };
        let windows_array = Array3::from_shape_vec(
            (num_windows, window_size, num_features),
            windows.data.clone(),
        )
        .map_err(|e| DatasetError::InvalidArchive(e.to_string()))?;

        if labels.data.len() != num_windows {
            return Err(DatasetError::InvalidArchive(format!(
                "{} labels for {} windows",
                labels.data.len(),
                num_windows
            )));
        }

        let columns = windows
            .attributes
            .get(COLUMNS_ATTRIBUTE)
            .cloned()
            .unwrap_or_default();

        Ok(WindowedDataset {
            windows: windows_array,
            labels: Array1::from(labels.data.clone()),
            columns,
        })
    }
}

/// Writes windows under `x` (with the column names attached) and labels under `up`
pub fn write_windowed_dataset<P: AsRef<Path>>(dataset: &WindowedDataset, path: P) -> Result<()> {
    ArrayArchive::from(dataset).write(path.as_ref())?;
    info!(
        "Wrote {} windows to {}",
        dataset.len(),
        path.as_ref().display()
    );
    Ok(())
}

pub fn read_windowed_dataset<P: AsRef<Path>>(path: P) -> Result<WindowedDataset> {
    let archive = ArrayArchive::read(path)?;
    WindowedDataset::try_from(&archive)
}

/// Saves fitted scaler parameters as pretty-printed JSON
pub fn write_scaler_params<P: AsRef<Path>>(params: &[ScalerParams], path: P) -> Result<()> {
    let path = path.as_ref();
    ensure_parent_dir(path)?;
    let json = serde_json::to_string_pretty(params)?;
    std::fs::write(path, json)?;
    Ok(())
}

pub fn read_scaler_params<P: AsRef<Path>>(path: P) -> Result<Vec<ScalerParams>> {
    let json = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&json)?)
}
