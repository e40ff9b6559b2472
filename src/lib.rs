pub mod config;
pub mod constants;
pub mod dataset;
pub mod error;
#[cfg(test)]
pub mod test;
pub mod util {
    pub mod file_utils;
    pub mod frame_utils;
    #[cfg(test)]
    pub mod test_utils;
}

/// Build information generated by `built`
pub mod build_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub use dataset::step_2_class_up::add_class_up;
pub use dataset::step_5_sliding_windows::{transform_into_sliding_windows, WindowedDataset};
pub use error::{DatasetError, Result};
